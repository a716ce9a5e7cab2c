//! Target positions for popup menu items, relative to the pivot.

use std::f64::consts::PI;

/// Viewports narrower than this (CSS px) use the compact layouts.
pub const NARROW_BREAKPOINT: f64 = 768.0;

/// Total angle covered by the arc layout.
pub const ARC_SPREAD: f64 = PI * 0.9;

/// Arc radius as a fraction of the shorter viewport edge.
pub const ARC_RADIUS_FACTOR: f64 = 0.2;

/// Horizontal factor of the lower two items in the triangle layout.
pub const TRIANGLE_SIDE_FACTOR: f64 = 0.85;

pub const DEFAULT_SPACING: f64 = 110.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_narrow(&self) -> bool {
        self.width < NARROW_BREAKPOINT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    Arc,
    Triangle,
    Row,
}

/// Offset of one item from the pivot, in CSS pixels (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Slot {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub kind: LayoutKind,
    pub slots: Vec<Slot>,
}

pub fn layout_kind(count: usize, viewport: Viewport) -> LayoutKind {
    match (viewport.is_narrow(), count) {
        (false, _) => LayoutKind::Arc,
        (true, 3) => LayoutKind::Triangle,
        (true, _) => LayoutKind::Row,
    }
}

/// Compute every slot for `count` items. Pure in `(count, viewport, spacing)`.
pub fn compute(count: usize, viewport: Viewport, spacing: f64) -> Layout {
    let kind = layout_kind(count, viewport);
    let slots = match kind {
        LayoutKind::Arc => arc(count, viewport),
        LayoutKind::Triangle => triangle(spacing),
        LayoutKind::Row => row(count, spacing),
    };
    Layout { kind, slots }
}

/// Angle of item `index` on the arc, centred on 0.
pub fn arc_angle(index: usize, count: usize) -> f64 {
    if count < 2 {
        return 0.0;
    }
    let step = ARC_SPREAD / (count - 1) as f64;
    -ARC_SPREAD / 2.0 + step * index as f64
}

/// Radius of item `index`; grows slightly with index so neighbours don't overlap.
pub fn arc_radius(index: usize, viewport: Viewport) -> f64 {
    let base = viewport.width.min(viewport.height) * ARC_RADIUS_FACTOR;
    base * (0.95 + index as f64 * 0.02)
}

fn arc(count: usize, viewport: Viewport) -> Vec<Slot> {
    (0..count)
        .map(|i| {
            let angle = arc_angle(i, count);
            let radius = arc_radius(i, viewport);
            Slot {
                x: angle.cos() * radius,
                y: angle.sin() * radius,
            }
        })
        .collect()
}

fn triangle(spacing: f64) -> Vec<Slot> {
    let side = spacing * TRIANGLE_SIDE_FACTOR;
    vec![
        Slot { x: 0.0, y: -spacing },
        Slot { x: -side, y: spacing * 0.5 },
        Slot { x: side, y: spacing * 0.5 },
    ]
}

fn row(count: usize, spacing: f64) -> Vec<Slot> {
    let centre = (count as f64 - 1.0) / 2.0;
    (0..count)
        .map(|i| Slot {
            x: (i as f64 - centre) * spacing,
            y: 0.0,
        })
        .collect()
}
