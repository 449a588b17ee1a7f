//! Selection geometry: pure rectangle math in CSS and device pixels.
//!
//! Nothing in here touches the page or a raster. The selection machine calls
//! these on every pointer move; the capture orchestrator calls them once per
//! capture to get the device-pixel crop.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A pointer position in viewport (CSS pixel) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerPoint {
    pub x: f64,
    pub y: f64,
}

impl PointerPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A normalized rectangle: left/top are the minimum bounds, sizes are ≥ 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectionRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl SelectionRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Zero-area rectangles are dropped instead of captured.
    pub fn is_committable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Round every field to whole pixels. Only meaningful after
    /// [`scale_to_device_pixels`].
    pub fn to_pixel_rect(&self) -> PixelRect {
        PixelRect {
            x: self.left.round() as i64,
            y: self.top.round() as i64,
            width: self.width.round().max(0.0) as u32,
            height: self.height.round().max(0.0) as u32,
        }
    }
}

/// A rectangle in whole device pixels. `x`/`y` may be negative when an
/// aspect-locked drag pushes the box past the top of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Fixed width:height ratio enforced while dragging.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AspectConstraint {
    #[default]
    Unconstrained,
    Ratio { w: f64, h: f64 },
}

impl AspectConstraint {
    /// Parse `"auto"` or `"w:h"`. Anything malformed, non-finite or
    /// non-positive falls back to [`AspectConstraint::Unconstrained`].
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("auto") {
            return Self::Unconstrained;
        }

        let parsed = text.split_once(':').and_then(|(w, h)| {
            let w: f64 = w.trim().parse().ok()?;
            let h: f64 = h.trim().parse().ok()?;
            let valid = |v: f64| v.is_finite() && v > 0.0;
            (valid(w) && valid(h)).then_some(Self::Ratio { w, h })
        });

        parsed.unwrap_or_else(|| {
            log::debug!("[GEOMETRY] Ignoring invalid aspect ratio {:?}", text);
            Self::Unconstrained
        })
    }

    /// Width divided by height, or `None` when unconstrained.
    pub fn ratio(&self) -> Option<f64> {
        match *self {
            Self::Unconstrained => None,
            Self::Ratio { w, h } => Some(w / h),
        }
    }
}

impl FromStr for AspectConstraint {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for AspectConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconstrained => f.write_str("auto"),
            Self::Ratio { w, h } => write!(f, "{}:{}", w, h),
        }
    }
}

impl Serialize for AspectConstraint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AspectConstraint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::parse(&text))
    }
}

/// Bounding box of two pointer positions, independent of drag direction.
pub fn normalize_rect(p0: PointerPoint, p1: PointerPoint) -> SelectionRect {
    SelectionRect {
        left: p0.x.min(p1.x),
        top: p0.y.min(p1.y),
        width: (p1.x - p0.x).abs(),
        height: (p1.y - p0.y).abs(),
    }
}

/// Lock the height to `width / ratio`.
///
/// When the pointer is above the anchor the box grows upward from the
/// anchor. Only the vertical direction is corrected: `left` and `width`
/// come straight from [`normalize_rect`].
pub fn apply_aspect_constraint(
    rect: SelectionRect,
    constraint: AspectConstraint,
    anchor: PointerPoint,
    current: PointerPoint,
) -> SelectionRect {
    let Some(ratio) = constraint.ratio() else {
        return rect;
    };

    let height = rect.width / ratio;
    let top = if current.y < anchor.y {
        anchor.y - height
    } else {
        rect.top
    };

    SelectionRect {
        top,
        height,
        ..rect
    }
}

/// Convert CSS pixels to device pixels. Used right before cropping, never
/// for on-screen drawing.
pub fn scale_to_device_pixels(rect: SelectionRect, pixel_ratio: f64) -> SelectionRect {
    SelectionRect {
        left: rect.left * pixel_ratio,
        top: rect.top * pixel_ratio,
        width: rect.width * pixel_ratio,
        height: rect.height * pixel_ratio,
    }
}

/// Full drag computation: normalize, then apply the constraint.
pub fn selection_rect(
    anchor: PointerPoint,
    current: PointerPoint,
    constraint: AspectConstraint,
) -> SelectionRect {
    apply_aspect_constraint(normalize_rect(anchor, current), constraint, anchor, current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> PointerPoint {
        PointerPoint::new(x, y)
    }

    #[test]
    fn normalize_forward_drag() {
        let r = normalize_rect(pt(100.0, 100.0), pt(300.0, 250.0));
        assert_eq!(r, SelectionRect::new(100.0, 100.0, 200.0, 150.0));
    }

    #[test]
    fn normalize_is_order_independent() {
        let pairs = [
            (pt(100.0, 100.0), pt(300.0, 250.0)),
            (pt(-5.5, 40.0), pt(12.25, -3.0)),
            (pt(7.0, 7.0), pt(7.0, 7.0)),
            (pt(0.0, 900.0), pt(1600.0, 0.0)),
        ];
        for (a, b) in pairs {
            let forward = normalize_rect(a, b);
            let reverse = normalize_rect(b, a);
            assert_eq!(forward, reverse);
            assert!(forward.width >= 0.0);
            assert!(forward.height >= 0.0);
        }
    }

    #[test]
    fn upward_drag_with_16_9() {
        let r = selection_rect(pt(100.0, 200.0), pt(300.0, 150.0), AspectConstraint::parse("16:9"));
        assert_eq!(r.left, 100.0);
        assert_eq!(r.width, 200.0);
        assert!((r.height - 112.5).abs() < 1e-9);
        assert!((r.top - 87.5).abs() < 1e-9);
    }

    #[test]
    fn constrained_height_follows_width() {
        for (w, h) in [(16.0, 9.0), (4.0, 3.0), (1.0, 1.0), (3.0, 7.0)] {
            let c = AspectConstraint::Ratio { w, h };
            for width in [1.0, 37.5, 200.0, 1919.0] {
                let rect = SelectionRect::new(0.0, 0.0, width, 5.0);
                let out = apply_aspect_constraint(rect, c, pt(0.0, 0.0), pt(width, 5.0));
                assert!((out.height - width / (w / h)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn downward_constrained_keeps_top() {
        let r = selection_rect(pt(10.0, 10.0), pt(110.0, 500.0), AspectConstraint::parse("1:1"));
        assert_eq!(r, SelectionRect::new(10.0, 10.0, 100.0, 100.0));
    }

    #[test]
    fn leftward_upward_drag_leaves_left_uncorrected() {
        let r = selection_rect(pt(300.0, 200.0), pt(100.0, 150.0), AspectConstraint::parse("4:3"));
        assert_eq!(r.left, 100.0);
        assert_eq!(r.width, 200.0);
        assert!((r.height - 150.0).abs() < 1e-9);
        assert!((r.top - 50.0).abs() < 1e-9);
    }

    #[test]
    fn unconstrained_passes_through() {
        let rect = SelectionRect::new(1.0, 2.0, 3.0, 4.0);
        let out = apply_aspect_constraint(
            rect,
            AspectConstraint::Unconstrained,
            pt(1.0, 6.0),
            pt(4.0, 2.0),
        );
        assert_eq!(out, rect);
    }

    #[test]
    fn parse_rejects_bad_ratios() {
        for bad in ["0:9", "16:0", "-4:3", "inf:1", "NaN:2", "16x9", "16:", "abc", "1:2:3"] {
            assert_eq!(AspectConstraint::parse(bad), AspectConstraint::Unconstrained, "{bad}");
        }
        assert_eq!(AspectConstraint::parse("auto"), AspectConstraint::Unconstrained);
        assert_eq!(
            AspectConstraint::parse(" 4 : 3 "),
            AspectConstraint::Ratio { w: 4.0, h: 3.0 }
        );
    }

    #[test]
    fn constraint_serializes_as_string() {
        let json = serde_json::to_string(&AspectConstraint::parse("16:9")).unwrap();
        assert_eq!(json, "\"16:9\"");
        let back: AspectConstraint = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(back, AspectConstraint::Unconstrained);
    }

    #[test]
    fn scale_and_round_to_device_pixels() {
        let rect = SelectionRect::new(10.5, 20.0, 100.25, 50.0);
        let scaled = scale_to_device_pixels(rect, 2.0);
        assert_eq!(scaled, SelectionRect::new(21.0, 40.0, 200.5, 100.0));
        let px = SelectionRect::new(10.0, 20.0, 33.3, 16.7).to_pixel_rect();
        assert_eq!(px, PixelRect { x: 10, y: 20, width: 33, height: 17 });
    }

    #[test]
    fn zero_area_is_not_committable() {
        assert!(!SelectionRect::new(5.0, 5.0, 0.0, 10.0).is_committable());
        assert!(!SelectionRect::new(5.0, 5.0, 10.0, 0.0).is_committable());
        assert!(SelectionRect::new(5.0, 5.0, 0.5, 0.5).is_committable());
    }
}
