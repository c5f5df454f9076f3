//! Initial placement of new windows.

use crate::config::WindowConfig;
use crate::objects::{WinSize, Window};
use crate::tabs::Bounds;

pub const MIN_WINDOW_WIDTH: i32 = 400;
pub const MIN_WINDOW_HEIGHT: i32 = 300;

const MAX_DEFAULT_WIDTH: i32 = 2000;
const MAX_DEFAULT_HEIGHT: i32 = 1200;
const WORK_AREA_MARGIN: i32 = 100;

/// Parses `"WIDTHxHEIGHT"` (`x` or `X`, digits only).
#[must_use]
pub fn parse_dimensions(value: &str) -> Option<(i32, i32)> {
    let (width, height) = value.split_once(['x', 'X'])?;
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(width) || !digits(height) {
        return None;
    }
    Some((width.parse().ok()?, height.parse().ok()?))
}

/// Picks the bounds a window opens with.
///
/// The stored size wins. Missing dimensions come from the configured
/// `dimensions`, then from the primary work area minus the window position
/// and a margin, capped at 2000x1200.
#[must_use]
pub fn initial_bounds(window: &Window, config: &WindowConfig, work_area: WinSize) -> Bounds {
    let mut width = window.winsize.width;
    let mut height = window.winsize.height;

    let configured = config.dimensions.as_deref().filter(|_| width <= 0 || height <= 0);
    if let Some(dimensions) = configured {
        match parse_dimensions(dimensions) {
            Some((w, h)) => {
                if width <= 0 && w > 0 {
                    width = w;
                }
                if height <= 0 && h > 0 {
                    height = h;
                }
            }
            None => tracing::warn!(%dimensions, "window: invalid dimensions, expected WIDTHxHEIGHT"),
        }
    }

    if width <= 0 {
        width = (work_area.width - window.pos.x - WORK_AREA_MARGIN).min(MAX_DEFAULT_WIDTH);
    }
    if height <= 0 {
        height = (work_area.height - window.pos.y - WORK_AREA_MARGIN).min(MAX_DEFAULT_HEIGHT);
    }

    Bounds::new(
        window.pos.x,
        window.pos.y,
        width.max(MIN_WINDOW_WIDTH),
        height.max(MIN_WINDOW_HEIGHT),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Point;

    fn window(x: i32, y: i32, width: i32, height: i32) -> Window {
        Window { pos: Point { x, y }, winsize: WinSize { width, height }, ..Window::default() }
    }

    const WORK_AREA: WinSize = WinSize { width: 2560, height: 1440 };

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1400x900"), Some((1400, 900)));
        assert_eq!(parse_dimensions("800X600"), Some((800, 600)));
        assert_eq!(parse_dimensions("800 x 600"), None);
        assert_eq!(parse_dimensions("x600"), None);
        assert_eq!(parse_dimensions("-5x600"), None);
        assert_eq!(parse_dimensions("big"), None);
    }

    #[test]
    fn test_stored_size_wins() {
        let config = WindowConfig { dimensions: Some("1000x700".into()), ..WindowConfig::default() };
        let bounds = initial_bounds(&window(10, 20, 1200, 800), &config, WORK_AREA);
        assert_eq!(bounds, Bounds::new(10, 20, 1200, 800));
    }

    #[test]
    fn test_configured_dimensions_fill_missing_size() {
        let config = WindowConfig { dimensions: Some("1000x700".into()), ..WindowConfig::default() };
        let bounds = initial_bounds(&window(0, 0, 0, 0), &config, WORK_AREA);
        assert_eq!(bounds, Bounds::new(0, 0, 1000, 700));

        let partial = initial_bounds(&window(0, 0, 1300, 0), &config, WORK_AREA);
        assert_eq!(partial, Bounds::new(0, 0, 1300, 700));
    }

    #[test]
    fn test_work_area_fallback_is_capped() {
        let config = WindowConfig::default();
        let bounds = initial_bounds(&window(100, 100, 0, 0), &config, WORK_AREA);
        assert_eq!(bounds, Bounds::new(100, 100, 2000, 1200));

        let small = WinSize { width: 1280, height: 800 };
        let bounds = initial_bounds(&window(100, 100, 0, 0), &config, small);
        assert_eq!(bounds, Bounds::new(100, 100, 1080, 600));
    }

    #[test]
    fn test_minimum_size() {
        let config = WindowConfig { dimensions: Some("100x100".into()), ..WindowConfig::default() };
        let bounds = initial_bounds(&window(0, 0, 0, 0), &config, WORK_AREA);
        assert_eq!((bounds.width, bounds.height), (MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT));
    }
}
