//! Denoising filters
//!
//! Gaussian blur is `imageops::blur`; median and bilateral have no
//! `imageops` counterpart and are computed here.

use super::raster::Raster;
use image::imageops;
use sdk::StepError;

/// Largest accepted kernel size for any method
pub const MAX_KSIZE: i64 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenoiseMethod {
    Gaussian,
    Median,
    Bilateral,
}

impl DenoiseMethod {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "gaussian" => Some(DenoiseMethod::Gaussian),
            "median" => Some(DenoiseMethod::Median),
            "bilateral" => Some(DenoiseMethod::Bilateral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DenoiseMethod::Gaussian => "gaussian",
            DenoiseMethod::Median => "median",
            DenoiseMethod::Bilateral => "bilateral",
        }
    }
}

/// gfedcb | abcdefgh | gfedcba
fn reflect101(i: i64, n: usize) -> usize {
    let n = n as i64;
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let m = i.rem_euclid(period);
    (if m < n { m } else { period - m }) as usize
}

fn replicate(i: i64, n: usize) -> usize {
    i.clamp(0, n as i64 - 1) as usize
}

fn invalid(method: DenoiseMethod, ksize: i64) -> StepError {
    StepError::InvalidKernel {
        method: method.as_str().to_string(),
        ksize,
    }
}

fn check_upper(method: DenoiseMethod, ksize: i64) -> Result<(), StepError> {
    if ksize > MAX_KSIZE {
        return Err(invalid(method, ksize));
    }
    Ok(())
}

/// Standard deviation derived from the kernel size
pub fn gaussian_sigma(ksize: i64) -> f32 {
    (0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8) as f32
}

/// Gaussian blur; `ksize` must be odd
pub fn gaussian_blur(raster: &Raster, ksize: i64) -> Result<Raster, StepError> {
    if ksize < 1 || ksize % 2 == 0 {
        return Err(invalid(DenoiseMethod::Gaussian, ksize));
    }
    check_upper(DenoiseMethod::Gaussian, ksize)?;
    if ksize == 1 || raster.width() == 0 || raster.height() == 0 {
        return Ok(raster.clone());
    }

    let sigma = gaussian_sigma(ksize);
    Ok(raster.through_imageops(|img| imageops::blur(img, sigma)))
}

/// Per-channel median over a square window with replicated borders
pub fn median_blur(raster: &Raster, ksize: i64) -> Result<Raster, StepError> {
    if ksize <= 1 {
        return Ok(raster.clone());
    }
    if ksize % 2 == 0 {
        return Err(invalid(DenoiseMethod::Median, ksize));
    }
    check_upper(DenoiseMethod::Median, ksize)?;

    let radius = ksize / 2;
    let (w, h) = (raster.width(), raster.height());
    let mut window = Vec::with_capacity((ksize * ksize) as usize);

    Ok(Raster::from_fn(w, h, raster.depth(), |x, y, c| {
        window.clear();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let sx = replicate(x as i64 + dx, w);
                let sy = replicate(y as i64 + dy, h);
                window.push(raster.get(sx, sy, c));
            }
        }
        window.sort_by(|a, b| a.total_cmp(b));
        window[window.len() / 2]
    }))
}

/// Edge-preserving bilateral filter with diameter `ksize`
pub fn bilateral_filter(raster: &Raster, ksize: i64) -> Result<Raster, StepError> {
    if ksize <= 0 {
        return Err(invalid(DenoiseMethod::Bilateral, ksize));
    }
    check_upper(DenoiseMethod::Bilateral, ksize)?;

    let sigma = 2.0 * ksize as f64;
    let radius = ksize / 2;
    let colour_coeff = -0.5 / (sigma * sigma);
    let space_coeff = -0.5 / (sigma * sigma);

    // Circular window offsets with their spatial weights
    let offsets: Vec<(i64, i64, f64)> = (-radius..=radius)
        .flat_map(|dy| (-radius..=radius).map(move |dx| (dx, dy)))
        .filter_map(|(dx, dy)| {
            let r2 = (dx * dx + dy * dy) as f64;
            (r2.sqrt() <= radius as f64).then(|| (dx, dy, (r2 * space_coeff).exp()))
        })
        .collect();

    let (w, h, channels) = (raster.width(), raster.height(), raster.channels());
    let mut out = Vec::with_capacity(w * h * channels);

    for y in 0..h {
        for x in 0..w {
            let centre: Vec<f32> = (0..channels).map(|c| raster.get(x, y, c)).collect();
            let mut sums = vec![0f64; channels];
            let mut norm = 0f64;

            for &(dx, dy, space_weight) in &offsets {
                let sx = reflect101(x as i64 + dx, w);
                let sy = reflect101(y as i64 + dy, h);
                let distance: f64 = (0..channels)
                    .map(|c| f64::from((raster.get(sx, sy, c) - centre[c]).abs()))
                    .sum();
                let weight = space_weight * (distance * distance * colour_coeff).exp();
                for (c, sum) in sums.iter_mut().enumerate() {
                    *sum += weight * f64::from(raster.get(sx, sy, c));
                }
                norm += weight;
            }

            out.extend(sums.into_iter().map(|s| (s / norm) as f32));
        }
    }

    Raster::new(w, h, raster.depth(), out)
}

/// Dispatch on method name; unknown methods return the input unchanged
pub fn denoise(raster: &Raster, method: &str, ksize: i64) -> Result<Raster, StepError> {
    match DenoiseMethod::parse(method) {
        Some(DenoiseMethod::Gaussian) => gaussian_blur(raster, ksize),
        Some(DenoiseMethod::Median) => median_blur(raster, ksize),
        Some(DenoiseMethod::Bilateral) => bilateral_filter(raster, ksize),
        None => Ok(raster.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::raster::Depth;

    fn speckled() -> Raster {
        Raster::from_fn(5, 5, Depth::U8, |x, y, _| if (x, y) == (2, 2) { 255.0 } else { 10.0 })
    }

    #[test]
    fn test_reflect101() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(-2, 5), 2);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(2, 5), 2);
        assert_eq!(reflect101(-3, 1), 0);
    }

    #[test]
    fn test_gaussian_sigma() {
        assert!((gaussian_sigma(3) - 0.8).abs() < 1e-6);
        assert!((gaussian_sigma(5) - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_gaussian_spreads_speckle() {
        let blurred = gaussian_blur(&speckled(), 5).unwrap();
        let centre = blurred.get(2, 2, 0);
        assert!(centre < 255.0 && centre > 10.0);
        assert!(blurred.get(1, 2, 0) > 10.0);
    }

    #[test]
    fn test_oversized_kernels_are_rejected() {
        let raster = Raster::filled(4, 4, Depth::U8, 10.0);
        for method in ["gaussian", "median", "bilateral"] {
            for ksize in [MAX_KSIZE + 2, 1_000_000_001, i64::MAX] {
                assert_eq!(
                    denoise(&raster, method, ksize),
                    Err(StepError::InvalidKernel {
                        method: method.to_string(),
                        ksize
                    })
                );
            }
        }
        assert!(median_blur(&raster, MAX_KSIZE).is_ok());
    }

    #[test]
    fn test_gaussian_requires_odd_kernel() {
        assert_eq!(
            gaussian_blur(&speckled(), 4),
            Err(StepError::InvalidKernel {
                method: "gaussian".to_string(),
                ksize: 4
            })
        );
        assert!(gaussian_blur(&speckled(), 0).is_err());
    }

    #[test]
    fn test_gaussian_preserves_flat_image() {
        let flat = Raster::filled(4, 3, Depth::U8, 80.0);
        assert_eq!(gaussian_blur(&flat, 5).unwrap(), flat);
    }

    #[test]
    fn test_median_removes_speckle() {
        let cleaned = median_blur(&speckled(), 3).unwrap();
        assert_eq!(cleaned.get(2, 2, 0), 10.0);
        assert!(median_blur(&speckled(), 4).is_err());
        assert_eq!(median_blur(&speckled(), 1).unwrap(), speckled());
    }

    #[test]
    fn test_bilateral_keeps_flat_image() {
        let flat = Raster::filled(4, 4, Depth::U8, 42.0);
        assert_eq!(bilateral_filter(&flat, 5).unwrap(), flat);
        assert!(bilateral_filter(&flat, 0).is_err());
    }

    #[test]
    fn test_unknown_method_is_identity() {
        assert_eq!(denoise(&speckled(), "wavelet", 5).unwrap(), speckled());
    }
}
