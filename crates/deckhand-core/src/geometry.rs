//! Axis-aligned bounding boxes in slide-local coordinates.

use serde::{Deserialize, Serialize};

/// Position and size of a shape, in slide-local points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Anything that occupies a rectangle on a slide.
pub trait Bounds {
    fn bounds(&self) -> Geometry;
}

impl Bounds for Geometry {
    fn bounds(&self) -> Geometry {
        *self
    }
}

/// Returns `true` unless `a` and `b` are disjoint along some axis.
///
/// Edges that touch exactly count as overlapping, and zero-area boxes are not
/// special-cased. Downstream consumers depend on this inclusive boundary.
pub fn overlaps(a: &impl Bounds, b: &impl Bounds) -> bool {
    let a = a.bounds();
    let b = b.bounds();
    !(a.right() < b.left || b.right() < a.left || a.bottom() < b.top || b.bottom() < a.top)
}
