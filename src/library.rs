use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::loader::DocumentLoader;
use crate::text::parse_date;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryView {
    #[default]
    List,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Date,
    Title,
    Pages,
    Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl LibraryView {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "list" => Some(Self::List),
            "grid" => Some(Self::Grid),
            _ => None,
        }
    }
}

impl SortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "date" => Some(Self::Date),
            "title" => Some(Self::Title),
            "pages" => Some(Self::Pages),
            "size" => Some(Self::Size),
            _ => None,
        }
    }
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Pdf,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub id: String,
    pub title: String,
    pub path: String,
    pub kind: EntryKind,
    /// `D/M/YYYY`.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(skip)]
    pub pages: Option<u32>,
    #[serde(skip)]
    pub bytes: Option<u64>,
}

impl LibraryEntry {
    fn date_key(&self) -> Option<(u32, u32, u32)> {
        self.date.as_deref().and_then(parse_date)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Library {
    entries: Vec<LibraryEntry>,
}

impl Library {
    pub fn new(entries: Vec<LibraryEntry>) -> Self {
        Self { entries }
    }

    /// Read a JSON array of entries.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        let entries: Vec<LibraryEntry> = serde_json::from_str(&contents)
            .with_context(|| format!("parsing catalog {}", path.display()))?;
        log::info!("Loaded {} catalog entries from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    pub fn find(&self, id: &str) -> Option<&LibraryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Fill page counts and sizes for PDF entries. Entries whose metadata
    /// cannot be read keep `None`.
    pub fn enrich(&mut self, loader: &mut DocumentLoader) {
        for entry in self.entries.iter_mut().filter(|e| e.kind == EntryKind::Pdf) {
            if let Some(metadata) = loader.metadata(&entry.path) {
                entry.pages = Some(metadata.page_count);
                entry.bytes = metadata.byte_size;
            }
        }
    }

    /// Entries ordered by `field`. Entries missing the field go last in
    /// either order; ties fall back to title.
    pub fn sorted(&self, field: SortField, order: SortOrder) -> Vec<&LibraryEntry> {
        let mut sorted: Vec<&LibraryEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| {
            let primary = match field {
                SortField::Date => compare_present(a.date_key(), b.date_key(), order),
                SortField::Pages => compare_present(a.pages, b.pages, order),
                SortField::Size => compare_present(a.bytes, b.bytes, order),
                SortField::Title => directed(compare_titles(a, b), order),
            };
            primary.then_with(|| compare_titles(a, b))
        });
        sorted
    }
}

fn compare_titles(a: &LibraryEntry, b: &LibraryEntry) -> Ordering {
    a.title.to_lowercase().cmp(&b.title.to_lowercase())
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn compare_present<T: Ord>(a: Option<T>, b: Option<T>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(&b), order),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
