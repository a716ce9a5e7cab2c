//! Backing-store sizing for the drawable surface.

/// Pixel size of the surface's backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

/// Treat missing or nonsensical ratios the way browsers report "unknown".
pub fn normalized_dpr(dpr: f64) -> f64 {
    if dpr.is_finite() && dpr > 0.0 {
        dpr
    } else {
        1.0
    }
}

/// `floor(css * dpr)` per axis, clamped to `max`.
#[must_use]
pub fn target_size(css_width: f64, css_height: f64, dpr: f64, max: u32) -> PixelSize {
    let dpr = normalized_dpr(dpr);
    let axis = |css: f64| {
        let px = (css.max(0.0) * dpr).floor();
        if px.is_finite() {
            (px as u64).min(u64::from(max)) as u32
        } else {
            max
        }
    };
    PixelSize {
        width: axis(css_width),
        height: axis(css_height),
    }
}

/// Surface dimensions and the device-pixel-ratio they were computed with.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceState {
    /// `None` until the first resize, so that one always reallocates.
    size: Option<PixelSize>,
    dpr: f64,
    max_size: u32,
    reallocations: u32,
}

impl SurfaceState {
    pub fn new(max_size: u32) -> Self {
        Self {
            size: None,
            dpr: 1.0,
            max_size: max_size.max(1),
            reallocations: 0,
        }
    }

    pub fn size(&self) -> PixelSize {
        self.size.unwrap_or_default()
    }

    /// Whether there is anything to draw into.
    pub fn is_drawable(&self) -> bool {
        self.size.is_some_and(|s| s.width > 0 && s.height > 0)
    }

    pub fn dpr(&self) -> f64 {
        self.dpr
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// How many times the backing store actually changed size.
    pub fn reallocations(&self) -> u32 {
        self.reallocations
    }

    /// Recompute the target size. Returns the new size only when it differs
    /// from the current one, i.e. when the caller must reallocate.
    pub fn resize(&mut self, css_width: f64, css_height: f64, dpr: f64) -> Option<PixelSize> {
        self.dpr = normalized_dpr(dpr);
        let next = target_size(css_width, css_height, self.dpr, self.max_size);
        if self.size == Some(next) {
            return None;
        }
        self.size = Some(next);
        self.reallocations += 1;
        Some(next)
    }

    /// Whether the ratio moved since the last resize.
    pub fn dpr_drifted(&self, dpr: f64) -> bool {
        normalized_dpr(dpr) != self.dpr
    }

    /// Forget the current size so the next [`resize`](Self::resize) reallocates.
    pub fn invalidate(&mut self) {
        self.size = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floors_and_clamps() {
        assert_eq!(
            target_size(300.7, 150.2, 2.0, 4096),
            PixelSize { width: 601, height: 300 }
        );
        assert_eq!(
            target_size(5000.0, 10.0, 2.0, 4096),
            PixelSize { width: 4096, height: 20 }
        );
    }

    #[test]
    fn bad_ratio_falls_back_to_one() {
        assert_eq!(normalized_dpr(f64::NAN), 1.0);
        assert_eq!(normalized_dpr(0.0), 1.0);
        assert_eq!(target_size(100.0, 50.0, -1.0, 4096), PixelSize { width: 100, height: 50 });
    }

    #[test]
    fn same_size_twice_reallocates_once() {
        let mut s = SurfaceState::new(8192);
        assert!(s.resize(800.0, 600.0, 1.5).is_some());
        assert!(s.resize(800.0, 600.0, 1.5).is_none());
        assert_eq!(s.reallocations(), 1);
        assert_eq!(s.size(), PixelSize { width: 1200, height: 900 });
    }

    #[test]
    fn first_resize_reallocates_even_when_empty() {
        let mut s = SurfaceState::new(8192);
        assert!(!s.is_drawable());
        assert_eq!(s.resize(0.0, 0.0, 1.0), Some(PixelSize::default()));
        assert!(!s.is_drawable());
        assert!(s.resize(0.0, 0.0, 1.0).is_none());
        assert!(s.resize(0.0, 40.0, 1.0).is_some());
        assert!(!s.is_drawable());
        assert!(s.resize(10.0, 40.0, 1.0).is_some());
        assert!(s.is_drawable());
    }

    #[test]
    fn drift_is_measured_against_last_resize() {
        let mut s = SurfaceState::new(8192);
        s.resize(10.0, 10.0, 2.0);
        assert!(!s.dpr_drifted(2.0));
        assert!(s.dpr_drifted(1.25));
    }

    #[test]
    fn invalidate_forces_reallocation() {
        let mut s = SurfaceState::new(8192);
        s.resize(10.0, 10.0, 1.0);
        s.invalidate();
        assert!(s.resize(10.0, 10.0, 1.0).is_some());
        assert_eq!(s.reallocations(), 2);
    }
}
