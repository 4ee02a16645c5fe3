//! Augmentation
//!
//! `deterministic` applies the exact transforms it is given, so a preview
//! matches the stored output. `ml_training` draws random affine transforms,
//! flips and brightness changes from a policy and yields several variants.

use super::geometry::{self, Fill, Interpolation, MAX_EDGE};
use super::raster::Raster;
use rand::Rng;
use sdk::StepError;
use serde::{Deserialize, Serialize};

const DEFAULT_VARIANTS: i64 = 6;

/// Rotation and shear ranges, degrees
const MAX_DEGREES: f64 = 360.0;
/// Upper bound for sampled zoom and brightness factors
const MAX_FACTOR: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ZoomRange {
    /// `z` means `[1 - z, 1 + z]`
    Scalar(f64),
    Pair([f64; 2]),
}

impl ZoomRange {
    /// Sampling interval within `[0, MAX_FACTOR]`
    fn bounds(&self) -> (f64, f64) {
        let (lo, hi) = match *self {
            ZoomRange::Scalar(z) => (1.0 - z.abs(), 1.0 + z.abs()),
            ZoomRange::Pair([lo, hi]) => (lo.min(hi), lo.max(hi)),
        };
        (lo.clamp(0.0, MAX_FACTOR), hi.clamp(0.0, MAX_FACTOR))
    }

    fn is_active(&self) -> bool {
        match self {
            ZoomRange::Scalar(z) => *z != 0.0,
            ZoomRange::Pair(_) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentParams {
    pub mode: String,

    // deterministic
    pub rotation: f64,
    pub zoom: f64,
    pub h_shift: f64,
    pub v_shift: f64,
    pub h_flip: bool,
    pub v_flip: bool,

    // ml_training
    pub rotation_range: Option<f64>,
    pub zoom_range: Option<ZoomRange>,
    pub width_shift_range: Option<f64>,
    pub height_shift_range: Option<f64>,
    pub shear_range: Option<f64>,
    pub brightness_range: Option<[f64; 2]>,
    pub horizontal_flip: bool,
    pub vertical_flip: bool,
    pub fill_mode: String,
    pub cval: f64,
    pub num_variants: Option<i64>,
}

impl Default for AugmentParams {
    fn default() -> Self {
        Self {
            mode: "deterministic".to_string(),
            rotation: 0.0,
            zoom: 1.0,
            h_shift: 0.0,
            v_shift: 0.0,
            h_flip: false,
            v_flip: false,
            rotation_range: None,
            zoom_range: None,
            width_shift_range: None,
            height_shift_range: None,
            shear_range: None,
            brightness_range: None,
            horizontal_flip: false,
            vertical_flip: false,
            fill_mode: "nearest".to_string(),
            cval: 0.0,
            num_variants: None,
        }
    }
}

fn nonzero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

impl AugmentParams {
    pub fn is_ml_training(&self) -> bool {
        self.mode.eq_ignore_ascii_case("ml_training")
    }

    /// Whether any random policy parameter is set; `fill_mode` and `cval` do not count
    pub fn has_policy(&self) -> bool {
        nonzero(self.rotation_range).is_some()
            || self.zoom_range.as_ref().is_some_and(ZoomRange::is_active)
            || nonzero(self.width_shift_range).is_some()
            || nonzero(self.height_shift_range).is_some()
            || nonzero(self.shear_range).is_some()
            || self.brightness_range.is_some()
            || self.horizontal_flip
            || self.vertical_flip
    }

    /// Copy with every range finite and sampleable. Shifts past a full
    /// extent clear the whole image, so they are capped at one extent.
    pub fn bounded(&self) -> Self {
        let degrees = |r: Option<f64>| r.map(|r| r.abs().min(MAX_DEGREES));
        let pixels = |r: Option<f64>| r.map(|r| r.abs().min(MAX_EDGE as f64));
        Self {
            h_shift: self.h_shift.clamp(-1.0, 1.0),
            v_shift: self.v_shift.clamp(-1.0, 1.0),
            rotation_range: degrees(self.rotation_range),
            shear_range: degrees(self.shear_range),
            width_shift_range: pixels(self.width_shift_range),
            height_shift_range: pixels(self.height_shift_range),
            brightness_range: self
                .brightness_range
                .map(|range| range.map(|b| b.clamp(0.0, MAX_FACTOR))),
            ..self.clone()
        }
    }

    /// Requested variant count clamped to `1..=max`
    pub fn variant_count(&self, max: usize) -> usize {
        self.num_variants
            .unwrap_or(DEFAULT_VARIANTS)
            .clamp(1, max.max(1) as i64) as usize
    }
}

/// Fixed transforms: rotation, zoom, shift, then flips. A zoom whose target
/// size is out of range is a step error.
pub fn augment_deterministic(raster: &Raster, params: &AugmentParams) -> Result<Raster, StepError> {
    let params = &params.bounded();
    let mut img = raster.clone();
    let (w, h) = (img.width() as f64, img.height() as f64);

    if params.rotation != 0.0 {
        let m = geometry::rotation_matrix(w / 2.0, h / 2.0, params.rotation);
        img = geometry::warp_affine(&img, &m, Fill::Constant(0.0));
    }

    if params.zoom > 0.0 && params.zoom != 1.0 {
        let zw = ((img.width() as f64 * params.zoom).round() as i64).max(1);
        let zh = ((img.height() as f64 * params.zoom).round() as i64).max(1);
        let (zw, zh) = geometry::check_size(zw, zh)?;
        img = geometry::resize(&img, zw, zh, Interpolation::Linear);
    }

    if params.h_shift != 0.0 || params.v_shift != 0.0 {
        let (w, h) = (img.width() as f64, img.height() as f64);
        let m = [
            [1.0, 0.0, params.h_shift * w],
            [0.0, 1.0, params.v_shift * h],
        ];
        img = geometry::warp_affine(&img, &m, Fill::Constant(0.0));
    }

    if params.h_flip {
        img = geometry::flip_horizontal(&img);
    }
    if params.v_flip {
        img = geometry::flip_vertical(&img);
    }
    Ok(img)
}

type Matrix = [[f64; 3]; 3];

fn matmul(a: &Matrix, b: &Matrix) -> Matrix {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

fn symmetric(rng: &mut impl Rng, range: f64) -> f64 {
    let range = range.abs();
    if range == 0.0 {
        0.0
    } else {
        rng.gen_range(-range..=range)
    }
}

fn between(rng: &mut impl Rng, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

/// Shift in pixels; ranges below 1 are fractions of `extent`
fn shift(rng: &mut impl Rng, range: Option<f64>, extent: usize) -> f64 {
    match nonzero(range) {
        Some(r) => {
            let offset = symmetric(rng, r);
            if r.abs() < 1.0 {
                offset * extent as f64
            } else {
                offset
            }
        }
        None => 0.0,
    }
}

/// One random variant. Transforms are composed in `(row, col)` space about
/// the image centre and map output coordinates to source coordinates.
fn random_variant(raster: &Raster, params: &AugmentParams, fill: Fill, rng: &mut impl Rng) -> Raster {
    let (w, h) = (raster.width(), raster.height());

    let theta = symmetric(rng, params.rotation_range.unwrap_or(0.0)).to_radians();
    let tx = shift(rng, params.height_shift_range, h);
    let ty = shift(rng, params.width_shift_range, w);
    let shear = symmetric(rng, params.shear_range.unwrap_or(0.0)).to_radians();
    let (zx, zy) = match params.zoom_range.filter(ZoomRange::is_active) {
        Some(range) => {
            let (lo, hi) = range.bounds();
            (between(rng, lo, hi), between(rng, lo, hi))
        }
        None => (1.0, 1.0),
    };

    let (sin, cos) = theta.sin_cos();
    let rotation = [[cos, -sin, 0.0], [sin, cos, 0.0], [0.0, 0.0, 1.0]];
    let translation = [[1.0, 0.0, tx], [0.0, 1.0, ty], [0.0, 0.0, 1.0]];
    let shearing = [[1.0, -shear.sin(), 0.0], [0.0, shear.cos(), 0.0], [0.0, 0.0, 1.0]];
    let zooming = [[zx, 0.0, 0.0], [0.0, zy, 0.0], [0.0, 0.0, 1.0]];

    let transform = matmul(&matmul(&matmul(&rotation, &translation), &shearing), &zooming);
    let (o_r, o_c) = (h as f64 / 2.0 + 0.5, w as f64 / 2.0 + 0.5);
    let offset = [[1.0, 0.0, o_r], [0.0, 1.0, o_c], [0.0, 0.0, 1.0]];
    let reset = [[1.0, 0.0, -o_r], [0.0, 1.0, -o_c], [0.0, 0.0, 1.0]];
    let m = matmul(&matmul(&offset, &transform), &reset);

    let mut img = geometry::warp(raster, w, h, fill, |x, y| {
        let row = m[0][0] * y + m[0][1] * x + m[0][2];
        let col = m[1][0] * y + m[1][1] * x + m[1][2];
        (col, row)
    });

    if params.horizontal_flip && rng.gen_bool(0.5) {
        img = geometry::flip_horizontal(&img);
    }
    if params.vertical_flip && rng.gen_bool(0.5) {
        img = geometry::flip_vertical(&img);
    }
    if let Some([lo, hi]) = params.brightness_range {
        let factor = between(rng, lo.min(hi), lo.max(hi)) as f32;
        img = img.map_samples(|v| (v * factor).clamp(0.0, 255.0));
    }
    img
}

/// Random variants labelled `ml_aug_<n>`; without a policy the input labelled `original`
pub fn augment_ml_training(
    raster: &Raster,
    params: &AugmentParams,
    max_variants: usize,
    rng: &mut impl Rng,
) -> Vec<(Raster, String)> {
    if !params.has_policy() {
        return vec![(raster.clone(), "original".to_string())];
    }
    let params = &params.bounded();

    let fill = Fill::parse(&params.fill_mode, params.cval as f32);
    (0..params.variant_count(max_variants))
        .map(|i| {
            (
                random_variant(raster, params, fill, rng),
                format!("ml_aug_{}", i + 1),
            )
        })
        .collect()
}

/// Either mode; deterministic yields a single `deterministic` result
pub fn augment(
    raster: &Raster,
    params: &AugmentParams,
    max_variants: usize,
    rng: &mut impl Rng,
) -> Result<Vec<(Raster, String)>, StepError> {
    if params.is_ml_training() {
        Ok(augment_ml_training(raster, params, max_variants, rng))
    } else {
        Ok(vec![(
            augment_deterministic(raster, params)?,
            "deterministic".to_string(),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::raster::Depth;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample() -> Raster {
        Raster::from_fn(8, 6, Depth::U8, |x, y, c| ((x * 30 + y * 7 + c) % 256) as f32)
    }

    fn params(value: serde_json::Value) -> AugmentParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_noop_deterministic_is_identical() {
        let raster = sample();
        let p = params(serde_json::json!({"rotation": 0, "zoom": 1.0}));
        assert_eq!(augment_deterministic(&raster, &p).unwrap(), raster);
    }

    #[test]
    fn test_deterministic_zoom_rounds_dimensions() {
        let p = params(serde_json::json!({"zoom": 1.5}));
        let out = augment_deterministic(&sample(), &p).unwrap();
        assert_eq!((out.width(), out.height()), (12, 9));
    }

    #[test]
    fn test_deterministic_rotation_moves_pixel() {
        // 4x4 about (2, 2): a quarter turn sends (x, y) to (y, 4 - x)
        let raster = Raster::from_fn(4, 4, Depth::U8, |x, y, _| if (x, y) == (3, 1) { 200.0 } else { 0.0 });
        let p = params(serde_json::json!({"rotation": 90}));
        let out = augment_deterministic(&raster, &p).unwrap();
        assert_eq!(out.get(1, 1, 0), 200.0);
        assert_eq!(out.get(3, 1, 0), 0.0);
        assert_eq!(out.data().iter().filter(|&&v| v != 0.0).count(), 3);
    }

    #[test]
    fn test_oversized_zoom_is_an_error() {
        let p = params(serde_json::json!({"zoom": 1e12}));
        assert_eq!(
            augment_deterministic(&sample(), &p),
            Err(StepError::InvalidSize {
                width: 8_000_000_000_000,
                height: 6_000_000_000_000
            })
        );
        let mut rng = StdRng::seed_from_u64(5);
        assert!(augment(&sample(), &p, 20, &mut rng).is_err());
    }

    #[test]
    fn test_full_extent_shift_clears_image() {
        let p = params(serde_json::json!({"h_shift": -1e308, "v_shift": 1e308}));
        let out = augment_deterministic(&sample(), &p).unwrap();
        assert!(out.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_extreme_policy_ranges_are_bounded() {
        let p = params(serde_json::json!({
            "mode": "ml_training",
            "rotation_range": 1e308,
            "zoom_range": [-1e308, 1e308],
            "shear_range": -1e308,
            "width_shift_range": 1e308,
            "brightness_range": [-1e308, 1e308],
            "num_variants": 2
        }));
        let bounded = p.bounded();
        assert_eq!(bounded.rotation_range, Some(360.0));
        assert_eq!(bounded.shear_range, Some(360.0));
        assert_eq!(bounded.brightness_range, Some([0.0, 10.0]));
        assert_eq!(p.zoom_range.map(|z| z.bounds()), Some((0.0, 10.0)));

        let out = augment(&sample(), &p, 20, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(out.len(), 2);
        for (variant, _) in &out {
            assert_eq!((variant.width(), variant.height()), (8, 6));
        }
    }

    #[test]
    fn test_deterministic_shift_fills_with_zero() {
        let p = params(serde_json::json!({"h_shift": 0.25}));
        let out = augment_deterministic(&sample(), &p).unwrap();
        // 8 px wide, shifted right by 2
        assert_eq!(out.get(0, 0, 0), 0.0);
        assert_eq!(out.get(1, 3, 1), 0.0);
        assert_eq!(out.get(2, 3, 1), sample().get(0, 3, 1));
    }

    #[test]
    fn test_deterministic_flip() {
        let raster = sample();
        let p = params(serde_json::json!({"h_flip": true}));
        assert_eq!(augment_deterministic(&raster, &p).unwrap(), geometry::flip_horizontal(&raster));
    }

    #[test]
    fn test_ml_training_without_policy_returns_original() {
        let p = params(serde_json::json!({"mode": "ml_training", "fill_mode": "reflect"}));
        let mut rng = StdRng::seed_from_u64(7);
        let out = augment(&sample(), &p, 20, &mut rng).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1, "original");
        assert_eq!(out[0].0, sample());
    }

    #[test]
    fn test_ml_training_labels_and_count() {
        let p = params(serde_json::json!({
            "mode": "ml_training",
            "rotation_range": 15,
            "zoom_range": 0.1,
            "horizontal_flip": true,
            "num_variants": 4
        }));
        let mut rng = StdRng::seed_from_u64(42);
        let out = augment(&sample(), &p, 20, &mut rng).unwrap();
        let labels: Vec<&str> = out.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(labels, vec!["ml_aug_1", "ml_aug_2", "ml_aug_3", "ml_aug_4"]);
        for (variant, _) in &out {
            assert_eq!((variant.width(), variant.height()), (8, 6));
        }
    }

    #[test]
    fn test_ml_training_is_reproducible_with_seed() {
        let p = params(serde_json::json!({"mode": "ml_training", "rotation_range": 30, "shear_range": 10}));
        let a = augment(&sample(), &p, 20, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = augment(&sample(), &p, 20, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_variant_count_is_clamped() {
        let mut p = AugmentParams::default();
        assert_eq!(p.variant_count(20), 6);
        p.num_variants = Some(0);
        assert_eq!(p.variant_count(20), 1);
        p.num_variants = Some(500);
        assert_eq!(p.variant_count(20), 20);
    }

    #[test]
    fn test_zoom_range_forms() {
        let scalar = params(serde_json::json!({"zoom_range": 0.2}));
        assert_eq!(scalar.zoom_range.map(|z| z.bounds()), Some((0.8, 1.2)));
        let pair = params(serde_json::json!({"zoom_range": [1.3, 0.9]}));
        assert_eq!(pair.zoom_range.map(|z| z.bounds()), Some((0.9, 1.3)));
    }

    #[test]
    fn test_brightness_scales_and_clamps() {
        let p = params(serde_json::json!({"mode": "ml_training", "brightness_range": [2.0, 2.0]}));
        let flat = Raster::filled(2, 2, Depth::U8, 200.0);
        let out = augment(&flat, &p, 20, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(out.len(), 6);
        assert!(out[0].0.data().iter().all(|&v| v == 255.0));
    }
}
