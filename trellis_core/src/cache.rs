// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-cache sizing and the global pixel-area budget.
//!
//! Each caching node renders into an offscreen bitmap whose resolution is
//! derived from the node's box, its total scale, and the viewport zoom. The
//! [`CacheBudget`] bounds the sum of all bitmap areas:
//!
//! 1. Every node's natural size is first capped to
//!    [`max_side`](CacheConfig::max_side), keeping its aspect ratio.
//! 2. If the capped sizes still sum to more than
//!    [`max_total_area`](CacheConfig::max_total_area), every cache is scaled
//!    by `sqrt(budget / requested)` per side and floored. Summed areas then
//!    never exceed the budget.
//!
//! Degradation lowers resolution. It never crops and is not an error.
//!
//! The bitmaps themselves are owned by the rendering collaborator; this module
//! only tracks sizes, keys, and the area counters.

use crate::numeric;

/// Default area budget, 2048 × 1024 pixels.
pub const DEFAULT_MAX_TOTAL_AREA: u64 = 2_097_152;

/// Configuration for render-cache sizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Upper bound on the summed area of all cache bitmaps, in px².
    pub max_total_area: u64,
    /// Upper bound on either side of a single bitmap, in px.
    pub max_side: u32,
    /// Extra pixels added to each side to absorb anti-aliasing bleed.
    pub aliasing_margin: u32,
}

impl CacheConfig {
    /// The default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_total_area: DEFAULT_MAX_TOTAL_AREA,
            max_side: 4096,
            aliasing_margin: 2,
        }
    }

    /// A configuration with the given area budget and no margin or side cap.
    #[must_use]
    pub const fn with_budget(max_total_area: u64) -> Self {
        Self {
            max_total_area,
            max_side: u32::MAX,
            aliasing_margin: 0,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Pixel dimensions of a cache bitmap plus the zoom it was rendered at.
///
/// The zoom maps node-local units to bitmap pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CacheSize {
    /// Bitmap width in pixels.
    pub width: u32,
    /// Bitmap height in pixels.
    pub height: u32,
    /// Horizontal local-to-pixel factor.
    pub zoom_x: f64,
    /// Vertical local-to-pixel factor.
    pub zoom_y: f64,
}

impl CacheSize {
    /// Bitmap area in px².
    #[inline]
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if the bitmap would hold no pixels.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Transform from node-local coordinates (centered box) into bitmap
    /// pixels, used when painting into the cache.
    #[must_use]
    pub fn paint_transform(&self) -> kurbo::Affine {
        kurbo::Affine::new([
            self.zoom_x,
            0.0,
            0.0,
            self.zoom_y,
            f64::from(self.width) / 2.0,
            f64::from(self.height) / 2.0,
        ])
    }

    /// Transform from bitmap pixels to absolute space, given the node's
    /// absolute matrix. Used when blitting the cache.
    #[must_use]
    pub fn blit_transform(&self, absolute: kurbo::Affine) -> kurbo::Affine {
        let to_local = kurbo::Affine::new([
            1.0 / self.zoom_x,
            0.0,
            0.0,
            1.0 / self.zoom_y,
            -f64::from(self.width) / (2.0 * self.zoom_x),
            -f64::from(self.height) / (2.0 * self.zoom_y),
        ]);
        absolute * to_local
    }
}

/// Identity of a cache's rendered content.
///
/// Two equal keys mean a bitmap rendered for one is valid for the other.
/// Zoom factors are quantized with the same grid
/// [`CacheBudget::natural_size`] snaps to, so the pixel size and the key
/// always agree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Bitmap width in pixels.
    pub width: u32,
    /// Bitmap height in pixels.
    pub height: u32,
    /// Quantized horizontal zoom.
    pub zoom_x: i64,
    /// Quantized vertical zoom.
    pub zoom_y: i64,
    /// Content revision, bumped on every cache-affecting change.
    pub revision: u64,
}

impl CacheKey {
    const ZOOM_QUANTUM: f64 = 1e6;

    /// Rounds `zoom` onto the key's quantization grid.
    #[must_use]
    pub fn snap_zoom(zoom: f64) -> f64 {
        numeric::round(zoom * Self::ZOOM_QUANTUM) / Self::ZOOM_QUANTUM
    }

    /// Builds a key for `size` at content `revision`.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "zoom factors are small; the rounded value fits in i64"
    )]
    pub fn new(size: &CacheSize, revision: u64) -> Self {
        Self {
            width: size.width,
            height: size.height,
            zoom_x: numeric::round(size.zoom_x * Self::ZOOM_QUANTUM) as i64,
            zoom_y: numeric::round(size.zoom_y * Self::ZOOM_QUANTUM) as i64,
            revision,
        }
    }
}

/// Snapshot of the budget counters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CacheStats {
    /// Configured area budget.
    pub max_total_area: u64,
    /// Summed (side-capped) natural area requested at the last plan.
    pub requested_area: u64,
    /// Summed area of committed bitmaps.
    pub allocated_area: u64,
    /// Per-side factor applied at the last plan (`1.0` when within budget).
    pub side_factor: f64,
}

/// The shared pixel-area counter.
///
/// Owned by the [`Scene`](crate::scene::Scene) and reset through
/// [`Scene::reset_cache_budget`](crate::scene::Scene::reset_cache_budget).
#[derive(Clone, Debug)]
pub struct CacheBudget {
    config: CacheConfig,
    requested_area: u64,
    allocated_area: u64,
    side_factor: f64,
}

impl CacheBudget {
    /// Creates an empty budget.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            requested_area: 0,
            allocated_area: 0,
            side_factor: 1.0,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            max_total_area: self.config.max_total_area,
            requested_area: self.requested_area,
            allocated_area: self.allocated_area,
            side_factor: self.side_factor,
        }
    }

    /// Clears all counters.
    pub fn reset(&mut self) {
        self.requested_area = 0;
        self.allocated_area = 0;
        self.side_factor = 1.0;
    }

    /// Natural bitmap size for a box of `width × height` local units drawn
    /// at the given zoom, before any capping.
    ///
    /// Zoom factors are first snapped with [`CacheKey::snap_zoom`]; a scale
    /// recovered from a rotated matrix is then exact again.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "pixel sizes are clamped to u32 before the cast"
    )]
    pub fn natural_size(&self, width: f64, height: f64, zoom_x: f64, zoom_y: f64) -> CacheSize {
        let margin = f64::from(self.config.aliasing_margin);
        let zoom_x = CacheKey::snap_zoom(zoom_x);
        let zoom_y = CacheKey::snap_zoom(zoom_y);
        let px = |extent: f64, zoom: f64| -> u32 {
            let v = extent * zoom;
            if v <= 0.0 || !v.is_finite() {
                0
            } else {
                (numeric::ceil(v) + margin).min(f64::from(u32::MAX)) as u32
            }
        };
        CacheSize {
            width: px(width, zoom_x),
            height: px(height, zoom_y),
            zoom_x,
            zoom_y,
        }
    }

    /// Caps `size` to the per-side limit, preserving the aspect ratio.
    #[must_use]
    pub fn cap_side(&self, size: CacheSize) -> CacheSize {
        let max = self.config.max_side;
        if size.width <= max && size.height <= max {
            return size;
        }
        let factor = (f64::from(max) / f64::from(size.width))
            .min(f64::from(max) / f64::from(size.height));
        scale_size(size, factor)
    }

    /// Records the summed requested area for this plan and returns the per-side
    /// factor every cache must be scaled by.
    pub fn plan(&mut self, requested_area: u64) -> f64 {
        self.requested_area = requested_area;
        self.side_factor = if requested_area <= self.config.max_total_area || requested_area == 0
        {
            1.0
        } else {
            let ratio = self.config.max_total_area as f64 / requested_area as f64;
            numeric::sqrt(ratio)
        };
        self.side_factor
    }

    /// Applies the current per-side factor to a capped size.
    #[must_use]
    pub fn fit(&self, capped: CacheSize) -> CacheSize {
        if self.side_factor >= 1.0 {
            capped
        } else {
            scale_size(capped, self.side_factor)
        }
    }

    /// Swaps the accounting for one bitmap from `previous` to `next`.
    ///
    /// Both sides of the exchange happen here so that no caller can release
    /// without allocating or the reverse.
    pub fn commit(&mut self, previous: Option<&CacheSize>, next: &CacheSize) {
        if let Some(previous) = previous {
            self.allocated_area = self.allocated_area.saturating_sub(previous.area());
        }
        self.allocated_area += next.area();
    }

    /// Returns the area of a released bitmap to the pool.
    pub fn release(&mut self, previous: &CacheSize) {
        self.allocated_area = self.allocated_area.saturating_sub(previous.area());
    }
}

impl Default for CacheBudget {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Scales both sides of `size` by `factor`, flooring, and adjusts the zoom so
/// the whole box still fits.
#[expect(
    clippy::cast_possible_truncation,
    reason = "factor <= 1, so the result fits in the original u32"
)]
fn scale_size(size: CacheSize, factor: f64) -> CacheSize {
    let width = numeric::floor(f64::from(size.width) * factor) as u32;
    let height = numeric::floor(f64::from(size.height) * factor) as u32;
    let ratio = |new: u32, old: u32| {
        if old == 0 {
            1.0
        } else {
            f64::from(new) / f64::from(old)
        }
    };
    CacheSize {
        width,
        height,
        zoom_x: size.zoom_x * ratio(width, size.width),
        zoom_y: size.zoom_y * ratio(height, size.height),
    }
}

/// Per-node cache bookkeeping.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CacheEntry {
    /// Node opted into caching.
    pub(crate) enabled: bool,
    /// Declared cache-affecting properties.
    pub(crate) properties: crate::props::PropertySet,
    /// Bitmap content matches the current key.
    pub(crate) valid: bool,
    /// Bumped on every cache-affecting change.
    pub(crate) revision: u64,
    /// Size chosen by the most recent plan.
    pub(crate) target: Option<CacheSize>,
    /// Key of the committed bitmap.
    pub(crate) key: Option<CacheKey>,
    /// Size of the committed bitmap (counted against the budget).
    pub(crate) allocated: Option<CacheSize>,
    /// Frame index at which the bitmap was last made valid.
    pub(crate) valid_since: Option<u64>,
}

impl CacheEntry {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            properties: crate::props::PropertySet::DEFAULT_CACHE,
            valid: false,
            revision: 0,
            target: None,
            key: None,
            allocated: None,
            valid_since: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(width: u32, height: u32) -> CacheSize {
        CacheSize {
            width,
            height,
            zoom_x: 1.0,
            zoom_y: 1.0,
        }
    }

    #[test]
    fn within_budget_is_untouched() {
        let mut budget = CacheBudget::new(CacheConfig::with_budget(10_000));
        assert_eq!(budget.plan(8_000), 1.0);
        assert_eq!(budget.fit(size(100, 80)), size(100, 80));
    }

    #[test]
    fn over_budget_scales_every_cache_proportionally() {
        let mut budget = CacheBudget::new(CacheConfig::with_budget(10_000));
        let a = size(100, 80);
        let b = size(80, 100);
        budget.plan(a.area() + b.area());
        let fa = budget.fit(a);
        let fb = budget.fit(b);
        assert!(fa.area() + fb.area() <= 10_000, "{fa:?} {fb:?}");
        // Aspect ratio survives within a pixel of rounding.
        let aspect = f64::from(fa.width) / f64::from(fa.height);
        assert!((aspect - 1.25).abs() < 0.02, "aspect {aspect}");
        assert!(fa.zoom_x < 1.0 && fa.zoom_y < 1.0);
    }

    #[test]
    fn side_cap_keeps_aspect() {
        let budget = CacheBudget::new(CacheConfig {
            max_side: 1000,
            ..CacheConfig::with_budget(u64::MAX)
        });
        let capped = budget.cap_side(size(4000, 1000));
        assert_eq!(capped.width, 1000);
        assert_eq!(capped.height, 250);
        assert_eq!(capped.zoom_x, 0.25);
    }

    #[test]
    fn natural_size_adds_margin() {
        let budget = CacheBudget::default();
        let s = budget.natural_size(10.2, 5.0, 2.0, 1.0);
        assert_eq!(s.width, 21 + 2);
        assert_eq!(s.height, 5 + 2);
        assert!(budget.natural_size(0.0, 5.0, 1.0, 1.0).is_empty());
    }

    #[test]
    fn commit_and_release_pair_up() {
        let mut budget = CacheBudget::default();
        budget.commit(None, &size(10, 10));
        budget.commit(Some(&size(10, 10)), &size(20, 10));
        assert_eq!(budget.stats().allocated_area, 200);
        budget.release(&size(20, 10));
        assert_eq!(budget.stats().allocated_area, 0);
    }

    #[test]
    fn key_ignores_zoom_noise() {
        let a = CacheSize {
            zoom_x: 2.0,
            ..size(10, 10)
        };
        let b = CacheSize {
            zoom_x: 2.000_000_000_000_1,
            ..size(10, 10)
        };
        assert_eq!(CacheKey::new(&a, 3), CacheKey::new(&b, 3));
        assert_ne!(CacheKey::new(&a, 3), CacheKey::new(&a, 4));
    }

    #[test]
    fn natural_size_absorbs_scale_noise() {
        let budget = CacheBudget::default();
        let exact = budget.natural_size(50.0, 50.0, 1.0, 1.0);
        let noisy = budget.natural_size(50.0, 50.0, 1.0 + f64::EPSILON, 1.0 - f64::EPSILON);
        assert_eq!(exact.width, noisy.width);
        assert_eq!(exact.height, noisy.height);
        assert_eq!(noisy.zoom_x, 1.0);
        assert_eq!(CacheKey::new(&exact, 1), CacheKey::new(&noisy, 1));
    }

    #[test]
    fn paint_and_blit_transforms_are_inverse_at_identity() {
        let s = CacheSize {
            width: 40,
            height: 20,
            zoom_x: 2.0,
            zoom_y: 2.0,
        };
        let round = s.blit_transform(kurbo::Affine::IDENTITY) * s.paint_transform();
        let p = round * kurbo::Point::new(3.0, -4.0);
        assert!((p.x - 3.0).abs() < 1e-12 && (p.y + 4.0).abs() < 1e-12);
    }
}
