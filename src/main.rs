use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::Instant;

use leafview::config::LibraryPrefs;
use leafview::library::{Library, LibraryView, SortField, SortOrder};
use leafview::loader::DocumentLoader;
use leafview::text::TextDocument;
use leafview::{
    save_bitmap_png, Config, ContainerSize, DisplayMode, MupdfEngine, SlotContent, ViewFragment,
    Viewer, ZoomMode,
};

const USAGE: &str = "Usage: leafview <document | #fragment> [--mode single|double|scroll] \
[--page N] [--zoom fit-page|fit-width|<scale>] [--size WxH] [--next N] [--out DIR]
       leafview --library <catalog.json> [--view list|grid] [--sort date|title|pages|size] \
[--order asc|desc]";

enum ZoomArg {
    Mode(ZoomMode),
    Scale(f64),
}

struct Args {
    target: String,
    mode: Option<DisplayMode>,
    page: Option<u32>,
    zoom: Option<ZoomArg>,
    size: Option<(f64, f64)>,
    next: u32,
    out: Option<PathBuf>,
}

fn parse_args(raw: &[String]) -> Result<Args> {
    let mut iter = raw.iter();
    let Some(target) = iter.next() else {
        bail!("missing document");
    };
    let mut args = Args {
        target: target.clone(),
        mode: None,
        page: None,
        zoom: None,
        size: None,
        next: 0,
        out: None,
    };

    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .with_context(|| format!("{} needs a value", flag))?;
        match flag.as_str() {
            "--mode" => {
                args.mode = Some(
                    DisplayMode::parse(value)
                        .with_context(|| format!("unknown display mode {}", value))?,
                )
            }
            "--page" => args.page = Some(value.parse().context("--page expects a number")?),
            "--zoom" => {
                args.zoom = Some(match ZoomMode::parse(value) {
                    Some(mode) => ZoomArg::Mode(mode),
                    None => ZoomArg::Scale(
                        value
                            .parse()
                            .with_context(|| format!("unknown zoom {}", value))?,
                    ),
                })
            }
            "--size" => {
                let (w, h) = value.split_once('x').context("--size expects WxH")?;
                args.size = Some((w.parse()?, h.parse()?));
            }
            "--next" => args.next = value.parse().context("--next expects a number")?,
            "--out" => args.out = Some(PathBuf::from(value)),
            other => bail!("unknown option {}", other),
        }
    }
    Ok(args)
}

fn print_text(path: &str) -> Result<()> {
    let doc = TextDocument::fetch(path, None)?;
    if let Some(title) = &doc.title {
        println!("{}\n", title);
    }
    println!("{}", doc.body);
    if let Some(date) = &doc.date {
        println!("\n{}", date);
    }
    Ok(())
}

/// Apply `--view`, `--sort` and `--order` on top of the remembered prefs.
fn parse_library_args(raw: &[String], mut prefs: LibraryPrefs) -> Result<LibraryPrefs> {
    let mut iter = raw.iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .with_context(|| format!("{} needs a value", flag))?;
        match flag.as_str() {
            "--view" => {
                prefs.view =
                    LibraryView::parse(value).with_context(|| format!("unknown view {}", value))?
            }
            "--sort" => {
                prefs.sort_field = SortField::parse(value)
                    .with_context(|| format!("unknown sort field {}", value))?
            }
            "--order" => {
                prefs.sort_order = SortOrder::parse(value)
                    .with_context(|| format!("unknown sort order {}", value))?
            }
            other => bail!("unknown option {}", other),
        }
    }
    Ok(prefs)
}

fn print_library(catalog: &str, flags: &[String]) -> Result<()> {
    let mut config = Config::load();
    let prefs = parse_library_args(flags, config.library)?;
    if prefs != config.library {
        config.library = prefs;
        config.save();
        log::info!("Saved library preferences");
    }

    let mut library = Library::load(std::path::Path::new(catalog))?;
    let mut loader = DocumentLoader::new(Box::new(MupdfEngine));
    library.enrich(&mut loader);

    for entry in library.sorted(prefs.sort_field, prefs.sort_order) {
        let date = entry.date.as_deref().unwrap_or("-");
        match prefs.view {
            LibraryView::List => {
                let pages = entry
                    .pages
                    .map(|p| format!("{} pp", p))
                    .unwrap_or_else(|| "-".into());
                println!("{:<12} {:<32} {:>10} {:>8}", entry.id, entry.title, date, pages);
            }
            LibraryView::Grid => println!("[{}] {}", entry.title, date),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let raw: Vec<String> = std::env::args().collect();
    if raw.len() < 2 {
        eprintln!("{}", USAGE);
        std::process::exit(1);
    }
    if raw[1] == "--library" {
        let Some(catalog) = raw.get(2) else {
            eprintln!("{}", USAGE);
            std::process::exit(1);
        };
        return print_library(catalog, &raw[3..]);
    }

    let args = match parse_args(&raw[1..]) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            std::process::exit(1);
        }
    };

    if args.target.ends_with(".txt") {
        return print_text(&args.target);
    }

    let config = Config::load();
    let mut viewer = Viewer::new(Box::new(MupdfEngine), config);
    let now = Instant::now();

    if let Some((width, height)) = args.size {
        viewer.set_container(ContainerSize::new(width, height));
    }
    match args.zoom {
        Some(ZoomArg::Mode(mode)) => {
            viewer.set_zoom_mode(mode, now);
        }
        Some(ZoomArg::Scale(scale)) => {
            viewer.set_scale(scale, now);
        }
        None => {}
    }

    if args.target.starts_with('#') {
        let fragment = ViewFragment::parse(&args.target)
            .with_context(|| format!("no document in fragment {}", args.target))?;
        viewer.open_fragment(&fragment, now)?;
    } else {
        if let Some(mode) = args.mode {
            viewer.set_display_mode(mode, now);
        }
        viewer.open_at(&args.target, args.page.unwrap_or(1), now)?;
    }

    for _ in 0..args.next {
        if !viewer.next_page(now) {
            break;
        }
    }
    viewer.process_all_renders();

    let pagination = viewer.pagination();
    println!(
        "Page {}/{} | {} | Zoom: {}% ({}) | prev: {} next: {}",
        pagination.page,
        pagination.page_count,
        viewer.state().display_mode(),
        (viewer.state().scale() * 100.0).round(),
        viewer.state().zoom_mode(),
        if pagination.can_previous { "on" } else { "off" },
        if pagination.can_next { "on" } else { "off" },
    );
    if let Some(fragment) = viewer.fragment() {
        println!("{}", fragment.encode());
    }

    if let Some(out) = &args.out {
        std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
        for (_, slot) in viewer.slots() {
            match &slot.content {
                SlotContent::Ready(bitmap) => {
                    save_bitmap_png(bitmap, &out.join(format!("page-{:04}.png", slot.page)))?;
                }
                SlotContent::Failed(reason) => {
                    eprintln!("Page {}: {}", slot.page, reason);
                }
                SlotContent::Empty | SlotContent::Pending => {}
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_library_flags_override_remembered_prefs() {
        let remembered = LibraryPrefs {
            sort_order: SortOrder::Asc,
            ..LibraryPrefs::default()
        };
        let prefs =
            parse_library_args(&args(&["--view", "grid", "--sort", "title"]), remembered).unwrap();
        assert_eq!(prefs.view, LibraryView::Grid);
        assert_eq!(prefs.sort_field, SortField::Title);
        assert_eq!(prefs.sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_library_flags_reject_unknown_values() {
        let prefs = LibraryPrefs::default();
        assert!(parse_library_args(&args(&["--order", "sideways"]), prefs).is_err());
        assert!(parse_library_args(&args(&["--view"]), prefs).is_err());
    }
}
