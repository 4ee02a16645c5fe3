//! Raster model
//!
//! An `image::Rgb32FImage` plus a depth tag. The depth decides what the
//! samples mean: `U8` rasters hold integral values in `[0, 255]` and are
//! re-quantized after every op, `F32` rasters hold free floating point values
//! (z-scored images).

use image::{DynamicImage, ImageBuffer, Rgb, Rgb32FImage, RgbImage};
use sdk::StepError;
use serde::Serialize;

/// Decoded inputs are always RGB
pub const CHANNELS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    U8,
    F32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pixels: Rgb32FImage,
    depth: Depth,
}

/// Round half away from zero, clamp to the 8-bit range
pub fn quantize(value: f32) -> f32 {
    value.round().clamp(0.0, 255.0)
}

impl Raster {
    /// Raster over interleaved RGB samples
    pub fn new(width: usize, height: usize, depth: Depth, data: Vec<f32>) -> Result<Self, StepError> {
        let len = data.len();
        let pixels = ImageBuffer::from_raw(width as u32, height as u32, data).ok_or_else(|| {
            StepError::Failed(format!(
                "raster buffer holds {} samples, expected {}x{}x{}",
                len, height, width, CHANNELS
            ))
        })?;
        Ok(Self::from_image(pixels, depth))
    }

    /// Wrap an `image` buffer; `U8` quantizes
    pub fn from_image(pixels: Rgb32FImage, depth: Depth) -> Self {
        Self { pixels, depth }.quantized()
    }

    /// Uniform raster
    pub fn filled(width: usize, height: usize, depth: Depth, value: f32) -> Self {
        Self::from_image(
            ImageBuffer::from_pixel(width as u32, height as u32, Rgb([value; CHANNELS])),
            depth,
        )
    }

    pub fn from_rgb8(img: &RgbImage) -> Self {
        let pixels = ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
            Rgb(img.get_pixel(x, y).0.map(f32::from))
        });
        Self {
            pixels,
            depth: Depth::U8,
        }
    }

    /// Any decoded image, converted to 8-bit RGB
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        Self::from_rgb8(&img.to_rgb8())
    }

    pub fn width(&self) -> usize {
        self.pixels.width() as usize
    }

    pub fn height(&self) -> usize {
        self.pixels.height() as usize
    }

    pub fn channels(&self) -> usize {
        CHANNELS
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }

    pub fn pixels(&self) -> &Rgb32FImage {
        &self.pixels
    }

    /// Interleaved samples, row-major
    pub fn data(&self) -> &[f32] {
        self.pixels.as_raw()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, c: usize) -> f32 {
        self.pixels.get_pixel(x as u32, y as u32).0[c]
    }

    /// Raster built per sample
    pub fn from_fn(
        width: usize,
        height: usize,
        depth: Depth,
        mut f: impl FnMut(usize, usize, usize) -> f32,
    ) -> Self {
        let pixels = ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            Rgb([f(x, y, 0), f(x, y, 1), f(x, y, 2)])
        });
        Self::from_image(pixels, depth)
    }

    /// Same geometry and depth, new samples
    pub fn map_samples(&self, f: impl Fn(f32) -> f32) -> Self {
        let mut pixels = self.pixels.clone();
        for v in pixels.iter_mut() {
            *v = f(*v);
        }
        Self::from_image(pixels, self.depth)
    }

    /// Re-tag the depth; `U8` quantizes
    pub fn with_depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self.quantized()
    }

    fn quantized(mut self) -> Self {
        if self.depth == Depth::U8 {
            for v in self.pixels.iter_mut() {
                *v = quantize(*v);
            }
        }
        self
    }

    /// Sample interval mapped onto `[0, 1]` for `imageops`, which clamps
    /// float buffers to that range
    fn unit_interval(&self) -> (f32, f32) {
        match (self.depth, self.min_max()) {
            (Depth::U8, _) => (0.0, 255.0),
            (Depth::F32, Some((lo, hi))) if hi > lo => (lo, hi - lo),
            (Depth::F32, Some((lo, _))) => (lo, 1.0),
            (Depth::F32, None) => (0.0, 1.0),
        }
    }

    /// Run an `imageops` transform on the unit-scaled buffer and scale back
    pub fn through_imageops(&self, op: impl FnOnce(&Rgb32FImage) -> Rgb32FImage) -> Self {
        let (offset, span) = self.unit_interval();
        let mut unit = self.pixels.clone();
        for v in unit.iter_mut() {
            *v = (*v - offset) / span;
        }
        let mut out = op(&unit);
        for v in out.iter_mut() {
            *v = *v * span + offset;
        }
        Self::from_image(out, self.depth)
    }

    /// Minimum and maximum sample; `None` for an empty raster
    pub fn min_max(&self) -> Option<(f32, f32)> {
        let first = *self.data().first()?;
        Some(
            self.data()
                .iter()
                .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        )
    }

    /// Mean and population standard deviation over all samples
    pub fn mean_std(&self) -> (f64, f64) {
        let data = self.data();
        if data.is_empty() {
            return (0.0, 0.0);
        }
        let n = data.len() as f64;
        let mean = data.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
        let var = data.iter().map(|&v| (f64::from(v) - mean).powi(2)).sum::<f64>() / n;
        (mean, var.sqrt())
    }

    /// Per-channel mean and population standard deviation
    pub fn channel_stats(&self) -> (Vec<f64>, Vec<f64>) {
        let pixels = (self.width() * self.height()) as f64;
        if pixels == 0.0 {
            return (vec![0.0; CHANNELS], vec![0.0; CHANNELS]);
        }

        let mut means = Vec::with_capacity(CHANNELS);
        let mut stds = Vec::with_capacity(CHANNELS);
        for c in 0..CHANNELS {
            let samples: Vec<f64> = self.pixels.pixels().map(|p| f64::from(p.0[c])).collect();
            let mean = samples.iter().sum::<f64>() / pixels;
            let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / pixels;
            means.push(mean);
            stds.push(var.sqrt());
        }
        (means, stds)
    }

    /// 8-bit RGB view; `F32` rasters are min-max stretched to `[0, 255]`
    pub fn to_rgb8(&self) -> RgbImage {
        let (lo, scale) = match (self.depth, self.min_max()) {
            (Depth::F32, Some((lo, hi))) if hi > lo => (lo, 255.0 / (hi - lo)),
            (Depth::F32, Some((lo, _))) => (lo, 0.0),
            _ => (0.0, 1.0),
        };
        ImageBuffer::from_fn(self.pixels.width(), self.pixels.height(), |x, y| {
            Rgb(self.pixels.get_pixel(x, y).0.map(|s| quantize((s - lo) * scale) as u8))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8_rasters_are_quantized() {
        let raster = Raster::new(1, 1, Depth::U8, vec![-3.0, 127.5, 300.0]).unwrap();
        assert_eq!(raster.data(), &[0.0, 128.0, 255.0]);

        let raster = Raster::new(1, 1, Depth::F32, vec![-3.0, 127.5, 300.0]).unwrap();
        assert_eq!(raster.data(), &[-3.0, 127.5, 300.0]);
    }

    #[test]
    fn test_buffer_length_is_checked() {
        assert!(Raster::new(2, 2, Depth::U8, vec![0.0; 5]).is_err());
    }

    #[test]
    fn test_channel_stats() {
        let raster = Raster::new(2, 1, Depth::U8, vec![10.0, 0.0, 100.0, 30.0, 0.0, 200.0]).unwrap();
        let (means, stds) = raster.channel_stats();
        assert_eq!(means, vec![20.0, 0.0, 150.0]);
        assert_eq!(stds, vec![10.0, 0.0, 50.0]);
    }

    #[test]
    fn test_f32_rgb_view_is_stretched() {
        let raster = Raster::new(2, 1, Depth::F32, vec![-1.0, -1.0, -1.0, 1.0, 1.0, 1.0]).unwrap();
        let rgb = raster.to_rgb8();
        assert_eq!(rgb.as_raw(), &vec![0, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn test_rgb8_round_trip() {
        let img = RgbImage::from_raw(1, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let raster = Raster::from_rgb8(&img);
        assert_eq!(raster.get(0, 1, 2), 6.0);
        assert_eq!(raster.to_rgb8(), img);
    }

    #[test]
    fn test_imageops_keep_float_samples_outside_unit_range() {
        let raster = Raster::new(2, 1, Depth::F32, vec![-4.0, 0.0, 9.0, 2.0, 6.0, -1.0]).unwrap();
        let same = raster.through_imageops(|img| img.clone());
        for (a, b) in same.data().iter().zip(raster.data()) {
            assert!((a - b).abs() < 1e-4);
        }
    }
}
