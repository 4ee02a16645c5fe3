//! Image operation library

use super::augment::AugmentParams;
use super::filters;
use super::geometry::{self, Interpolation};
use super::raster::{Depth, Raster};
use crate::executor::Operation;
use sdk::StepError;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ImageOp {
    Resize {
        width: Option<i64>,
        height: Option<i64>,
        #[serde(default = "default_interp")]
        interp: String,
    },
    Denoise {
        #[serde(default = "default_denoise")]
        method: String,
        #[serde(default = "default_ksize")]
        ksize: i64,
    },
    Normalize {
        #[serde(default = "default_normalize")]
        method: String,
    },
    Augment(AugmentParams),
}

fn default_interp() -> String {
    "area".to_string()
}

fn default_denoise() -> String {
    "gaussian".to_string()
}

fn default_ksize() -> i64 {
    5
}

fn default_normalize() -> String {
    "minmax".to_string()
}

impl Operation for ImageOp {
    const VOCABULARY: &'static [&'static str] = &["resize", "denoise", "normalize", "augment"];
}

impl ImageOp {
    pub fn name(&self) -> &'static str {
        match self {
            ImageOp::Resize { .. } => "resize",
            ImageOp::Denoise { .. } => "denoise",
            ImageOp::Normalize { .. } => "normalize",
            ImageOp::Augment(_) => "augment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeMethod {
    MinMax,
    ZScore,
}

impl NormalizeMethod {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "minmax" => Some(NormalizeMethod::MinMax),
            "zscore" => Some(NormalizeMethod::ZScore),
            _ => None,
        }
    }
}

/// Resize to an exact, validated target
pub fn resize(raster: &Raster, width: i64, height: i64, interp: &str) -> Result<Raster, StepError> {
    let (w, h) = geometry::check_size(width, height)?;
    Ok(geometry::resize(raster, w, h, Interpolation::parse(interp)))
}

/// Resize with both dimensions required
pub fn resize_required(
    raster: &Raster,
    width: Option<i64>,
    height: Option<i64>,
    interp: &str,
) -> Result<Raster, StepError> {
    match (width, height) {
        (Some(w), Some(h)) => resize(raster, w, h, interp),
        _ => Err(StepError::InvalidParams {
            op: "resize".to_string(),
            reason: "both width and height are required".to_string(),
        }),
    }
}

/// Own `[min, max]` onto `[0, 255]` as an 8-bit raster
pub fn normalize_minmax(raster: &Raster) -> Raster {
    let (lo, hi) = raster.min_max().unwrap_or((0.0, 0.0));
    let range = if hi > lo { hi - lo } else { 1.0 };
    raster
        .clone()
        .with_depth(Depth::F32)
        .map_samples(|v| (v - lo) / range * 255.0)
        .with_depth(Depth::U8)
}

/// `(x - mean) / std` over all samples as a float raster
pub fn normalize_zscore(raster: &Raster) -> Raster {
    let (mean, std) = raster.mean_std();
    let std = if std > 0.0 { std } else { 1.0 };
    raster
        .clone()
        .with_depth(Depth::F32)
        .map_samples(|v| ((f64::from(v) - mean) / std) as f32)
}

/// Unknown methods return the input unchanged
pub fn normalize(raster: &Raster, method: &str) -> Raster {
    match NormalizeMethod::parse(method) {
        Some(NormalizeMethod::MinMax) => normalize_minmax(raster),
        Some(NormalizeMethod::ZScore) => normalize_zscore(raster),
        None => raster.clone(),
    }
}

pub fn denoise(raster: &Raster, method: &str, ksize: i64) -> Result<Raster, StepError> {
    filters::denoise(raster, method, ksize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::parse_op;
    use sdk::OpSpec;

    fn ramp() -> Raster {
        Raster::from_fn(4, 2, Depth::U8, |x, y, _| (50 + x * 20 + y * 10) as f32)
    }

    #[test]
    fn test_parse_defaults() {
        let op: ImageOp = parse_op(&OpSpec::new("denoise")).unwrap();
        assert_eq!(
            op,
            ImageOp::Denoise {
                method: "gaussian".to_string(),
                ksize: 5
            }
        );

        let op: ImageOp = parse_op(&OpSpec::new("resize").with("width", 10)).unwrap();
        assert_eq!(
            op,
            ImageOp::Resize {
                width: Some(10),
                height: None,
                interp: "area".to_string()
            }
        );
    }

    #[test]
    fn test_parse_augment_params_inline() {
        let spec = OpSpec::new("augment")
            .with("mode", "ml_training")
            .with("rotation_range", 15)
            .with("num_variants", 3);
        let ImageOp::Augment(params) = parse_op::<ImageOp>(&spec).unwrap() else {
            panic!("expected augment");
        };
        assert!(params.is_ml_training());
        assert_eq!(params.rotation_range, Some(15.0));
        assert_eq!(params.num_variants, Some(3));
        assert_eq!(params.fill_mode, "nearest");
    }

    #[test]
    fn test_minmax_spans_full_range() {
        let out = normalize(&ramp(), "minmax");
        assert_eq!(out.depth(), Depth::U8);
        assert_eq!(out.min_max(), Some((0.0, 255.0)));
    }

    #[test]
    fn test_minmax_constant_image_is_zero() {
        let flat = Raster::filled(3, 3, Depth::U8, 90.0);
        let out = normalize_minmax(&flat);
        assert!(out.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_zscore_is_float_with_zero_mean() {
        let out = normalize(&ramp(), "zscore");
        assert_eq!(out.depth(), Depth::F32);
        let (mean, std) = out.mean_std();
        assert!(mean.abs() < 1e-5);
        assert!((std - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_unknown_normalize_is_identity() {
        assert_eq!(normalize(&ramp(), "l2"), ramp());
    }

    #[test]
    fn test_resize_validation() {
        assert!(resize(&ramp(), 0, 5, "area").is_err());
        assert!(resize_required(&ramp(), Some(4), None, "area").is_err());
        let out = resize_required(&ramp(), Some(8), Some(4), "INTER_NEAREST").unwrap();
        assert_eq!((out.width(), out.height()), (8, 4));
    }
}
