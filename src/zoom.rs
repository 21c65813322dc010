use serde::{Deserialize, Serialize};

use crate::engine::PageSize;

/// Bounds on any automatically fitted scale.
pub const MIN_FIT_SCALE: f64 = 0.1;
pub const MAX_FIT_SCALE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    #[default]
    Single,
    Double,
    Scroll,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 3] = [Self::Single, Self::Double, Self::Scroll];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Scroll => "scroll",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == s)
    }
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoomMode {
    Manual,
    #[default]
    FitPage,
    FitWidth,
}

impl ZoomMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::FitPage => "fit-page",
            Self::FitWidth => "fit-width",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [Self::Manual, Self::FitPage, Self::FitWidth]
            .into_iter()
            .find(|mode| mode.as_str() == s)
    }
}

impl std::fmt::Display for ZoomMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Space available to the viewer pane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerSize {
    pub width: f64,
    pub height: f64,
}

impl ContainerSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Subtracted from each container axis before fitting.
    pub padding: f64,
    /// Horizontal space between the two pages of a spread.
    pub spread_gap: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            padding: 64.0,
            spread_gap: 16.0,
        }
    }
}

/// Scale for the current zoom mode. `page` is the natural (scale 1.0) size
/// of the page being fitted; `manual_scale` is returned untouched in manual
/// mode.
pub fn compute_scale(
    page: PageSize,
    display_mode: DisplayMode,
    zoom_mode: ZoomMode,
    container: ContainerSize,
    manual_scale: f64,
    options: FitOptions,
) -> f64 {
    if zoom_mode == ZoomMode::Manual {
        return manual_scale;
    }
    if !page.is_valid() {
        return manual_scale.clamp(MIN_FIT_SCALE, MAX_FIT_SCALE);
    }

    let available_width = container.width - options.padding;
    let available_height = container.height - options.padding;

    let content_width = match display_mode {
        DisplayMode::Double => 2.0 * page.width + options.spread_gap,
        DisplayMode::Single | DisplayMode::Scroll => page.width,
    };

    let width_ratio = available_width / content_width;
    let scale = match zoom_mode {
        ZoomMode::FitWidth => width_ratio,
        _ => width_ratio.min(available_height / page.height),
    };

    if scale.is_nan() {
        return MIN_FIT_SCALE;
    }
    scale.clamp(MIN_FIT_SCALE, MAX_FIT_SCALE)
}

/// Step a manual scale up (`direction > 0`) or down, staying in `[min, max]`.
/// A fitted `current` outside the range never steps the opposite way: zooming
/// in from above `max` (or out from below `min`) leaves it unchanged.
pub fn step_scale(current: f64, direction: i32, step: f64, min: f64, max: f64) -> f64 {
    let next = if direction >= 0 {
        current + step
    } else {
        current - step
    };
    // Keep repeated steps on clean thousandths.
    let next = ((next * 1000.0).round() / 1000.0).clamp(min, max);
    if direction >= 0 {
        next.max(current)
    } else {
        next.min(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: PageSize = PageSize {
        width: 368.0,
        height: 500.0,
    };

    #[test]
    fn test_fit_width_uses_padded_width() {
        let scale = compute_scale(
            PAGE,
            DisplayMode::Single,
            ZoomMode::FitWidth,
            ContainerSize::new(800.0, 300.0),
            1.0,
            FitOptions::default(),
        );
        assert_eq!(scale, 2.0);
    }

    #[test]
    fn test_fit_page_takes_smaller_ratio() {
        let scale = compute_scale(
            PAGE,
            DisplayMode::Scroll,
            ZoomMode::FitPage,
            ContainerSize::new(800.0, 564.0),
            1.0,
            FitOptions::default(),
        );
        assert_eq!(scale, 1.0);
    }

    #[test]
    fn test_double_mode_fits_spread() {
        let options = FitOptions::default();
        let scale = compute_scale(
            PAGE,
            DisplayMode::Double,
            ZoomMode::FitWidth,
            ContainerSize::new(816.0, 1000.0),
            1.0,
            options,
        );
        assert_eq!(scale, 752.0 / (2.0 * 368.0 + 16.0));
    }

    #[test]
    fn test_manual_passes_through_unclamped() {
        let scale = compute_scale(
            PAGE,
            DisplayMode::Single,
            ZoomMode::Manual,
            ContainerSize::new(10.0, 10.0),
            7.5,
            FitOptions::default(),
        );
        assert_eq!(scale, 7.5);
    }

    #[test]
    fn test_fit_is_clamped() {
        let tiny = compute_scale(
            PAGE,
            DisplayMode::Single,
            ZoomMode::FitPage,
            ContainerSize::new(40.0, 40.0),
            1.0,
            FitOptions::default(),
        );
        assert_eq!(tiny, MIN_FIT_SCALE);

        let huge = compute_scale(
            PageSize::new(10.0, 10.0),
            DisplayMode::Single,
            ZoomMode::FitPage,
            ContainerSize::new(4000.0, 4000.0),
            1.0,
            FitOptions::default(),
        );
        assert_eq!(huge, MAX_FIT_SCALE);
    }

    #[test]
    fn test_step_scale_bounds() {
        let mut scale = 2.5;
        for _ in 0..10 {
            scale = step_scale(scale, 1, 0.25, 0.25, 3.0);
        }
        assert_eq!(scale, 3.0);

        for _ in 0..20 {
            scale = step_scale(scale, -1, 0.25, 0.25, 3.0);
        }
        assert_eq!(scale, 0.25);
    }

    #[test]
    fn test_step_never_reverses_from_fitted_scale() {
        assert_eq!(step_scale(5.0, 1, 0.25, 0.25, 3.0), 5.0);
        assert_eq!(step_scale(5.0, -1, 0.25, 0.25, 3.0), 3.0);
        assert_eq!(step_scale(0.1, -1, 0.25, 0.25, 3.0), 0.1);
        assert_eq!(step_scale(0.1, 1, 0.25, 0.25, 3.0), 0.35);
    }

    #[test]
    fn test_mode_names_round_trip() {
        for mode in DisplayMode::ALL {
            assert_eq!(DisplayMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(ZoomMode::parse("fit-width"), Some(ZoomMode::FitWidth));
        assert_eq!(DisplayMode::parse("triple"), None);
    }
}
