//! Geometric transforms
//!
//! Resampling and flips go through `image::imageops`. Area shrinking is a
//! separable box-coverage filter, since `FilterType` has no box kernel. Warps
//! map every output pixel back to a source position and sample it
//! bilinearly, with the out-of-bounds policy given by [`Fill`].

use super::raster::Raster;
use image::imageops::{self, FilterType};
use sdk::StepError;

/// Largest accepted output edge
pub const MAX_EDGE: i64 = 16_384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Nearest,
    Linear,
    Cubic,
    Lanczos,
    Area,
}

impl Interpolation {
    /// Case-insensitive, `INTER_` prefix optional, unknown names are `Area`
    pub fn parse(name: &str) -> Self {
        let lower = name.trim().to_lowercase();
        match lower.strip_prefix("inter_").unwrap_or(&lower) {
            "nearest" => Interpolation::Nearest,
            "linear" | "bilinear" => Interpolation::Linear,
            "cubic" | "bicubic" => Interpolation::Cubic,
            "lanczos" | "lanczos3" | "lanczos4" => Interpolation::Lanczos,
            _ => Interpolation::Area,
        }
    }

    /// `imageops` kernel; `Area` enlarges linearly
    pub fn filter_type(self) -> FilterType {
        match self {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Linear | Interpolation::Area => FilterType::Triangle,
            Interpolation::Cubic => FilterType::CatmullRom,
            Interpolation::Lanczos => FilterType::Lanczos3,
        }
    }
}

/// Out-of-bounds policy for warps
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    Constant(f32),
    Nearest,
    Reflect,
    Wrap,
}

impl Fill {
    pub fn parse(mode: &str, cval: f32) -> Self {
        match mode.trim().to_lowercase().as_str() {
            "constant" => Fill::Constant(cval),
            "reflect" => Fill::Reflect,
            "wrap" => Fill::Wrap,
            _ => Fill::Nearest,
        }
    }
}

pub fn check_size(width: i64, height: i64) -> Result<(usize, usize), StepError> {
    if width <= 0 || height <= 0 || width > MAX_EDGE || height > MAX_EDGE {
        return Err(StepError::InvalidSize { width, height });
    }
    Ok((width as usize, height as usize))
}

/// Source cells and coverage weights for every destination index
fn box_taps(src: usize, dst: usize) -> Vec<Vec<(usize, f32)>> {
    let scale = src as f64 / dst as f64;
    let last = src - 1;
    (0..dst)
        .map(|d| {
            let start = d as f64 * scale;
            let end = start + scale;
            let mut taps = Vec::new();
            let mut cell = start.floor() as usize;
            while (cell as f64) < end && cell <= last {
                let overlap = end.min(cell as f64 + 1.0) - start.max(cell as f64);
                if overlap > 1e-9 {
                    taps.push((cell, (overlap / scale) as f32));
                }
                cell += 1;
            }
            taps
        })
        .collect()
}

fn area_resize(raster: &Raster, width: usize, height: usize) -> Raster {
    let x_taps = box_taps(raster.width(), width);
    let y_taps = box_taps(raster.height(), height);
    let channels = raster.channels();

    // Horizontal pass at source height
    let mut horizontal = vec![0f32; width * raster.height() * channels];
    for y in 0..raster.height() {
        for (x, taps) in x_taps.iter().enumerate() {
            for c in 0..channels {
                horizontal[(y * width + x) * channels + c] =
                    taps.iter().map(|&(sx, w)| raster.get(sx, y, c) * w).sum();
            }
        }
    }

    Raster::from_fn(width, height, raster.depth(), |x, y, c| {
        y_taps[y]
            .iter()
            .map(|&(sy, w)| horizontal[(sy * width + x) * channels + c] * w)
            .sum()
    })
}

/// Resample to exactly `width x height`
pub fn resize(raster: &Raster, width: usize, height: usize, kernel: Interpolation) -> Raster {
    if raster.width() == 0 || raster.height() == 0 {
        return Raster::filled(width, height, raster.depth(), 0.0);
    }
    if (raster.width(), raster.height()) == (width, height) {
        return raster.clone();
    }
    if kernel == Interpolation::Area && (width < raster.width() || height < raster.height()) {
        return area_resize(raster, width, height);
    }

    let filter = kernel.filter_type();
    raster.through_imageops(|img| imageops::resize(img, width as u32, height as u32, filter))
}

/// Index policy for a coordinate outside `0..n`; `None` means constant fill
fn resolve(i: i64, n: usize, fill: Fill) -> Option<usize> {
    let n = n as i64;
    if (0..n).contains(&i) {
        return Some(i as usize);
    }
    match fill {
        Fill::Constant(_) => None,
        Fill::Nearest => Some(i.clamp(0, n - 1) as usize),
        Fill::Wrap => Some(i.rem_euclid(n) as usize),
        Fill::Reflect => {
            // d c b a | a b c d | d c b a
            let period = 2 * n;
            let m = i.rem_euclid(period);
            Some(if m < n { m } else { period - 1 - m } as usize)
        }
    }
}

/// Bilinear sample at a fractional source position
pub fn sample_bilinear(raster: &Raster, x: f64, y: f64, c: usize, fill: Fill) -> f32 {
    let x0 = x.floor();
    let y0 = y.floor();
    let tx = (x - x0) as f32;
    let ty = (y - y0) as f32;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let fetch = |xi: i64, yi: i64| -> f32 {
        match (resolve(xi, raster.width(), fill), resolve(yi, raster.height(), fill)) {
            (Some(sx), Some(sy)) => raster.get(sx, sy, c),
            _ => match fill {
                Fill::Constant(v) => v,
                _ => 0.0,
            },
        }
    };

    let (x1, y1) = (x0.saturating_add(1), y0.saturating_add(1));
    let top = fetch(x0, y0) * (1.0 - tx) + fetch(x1, y0) * tx;
    let bottom = fetch(x0, y1) * (1.0 - tx) + fetch(x1, y1) * tx;
    top * (1.0 - ty) + bottom * ty
}

/// Warp with an output-to-source coordinate map
pub fn warp(
    raster: &Raster,
    width: usize,
    height: usize,
    fill: Fill,
    map: impl Fn(f64, f64) -> (f64, f64),
) -> Raster {
    let mut positions = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            positions.push(map(x as f64, y as f64));
        }
    }
    Raster::from_fn(width, height, raster.depth(), |x, y, c| {
        let (sx, sy) = positions[y * width + x];
        sample_bilinear(raster, sx, sy, c, fill)
    })
}

/// 2x3 affine matrix `[a, b, c; d, e, f]` mapping `(x, y)` forward
pub type Affine = [[f64; 3]; 2];

pub fn invert_affine(m: &Affine) -> Option<Affine> {
    let det = m[0][0] * m[1][1] - m[0][1] * m[1][0];
    if det.abs() < f64::EPSILON {
        return None;
    }
    let (a, b) = (m[1][1] / det, -m[0][1] / det);
    let (d, e) = (-m[1][0] / det, m[0][0] / det);
    let tx = -(a * m[0][2] + b * m[1][2]);
    let ty = -(d * m[0][2] + e * m[1][2]);
    Some([[a, b, tx], [d, e, ty]])
}

/// Forward affine warp over an output of the same size
pub fn warp_affine(raster: &Raster, forward: &Affine, fill: Fill) -> Raster {
    let Some(inv) = invert_affine(forward) else {
        return raster.clone();
    };
    warp(raster, raster.width(), raster.height(), fill, |x, y| {
        (
            inv[0][0] * x + inv[0][1] * y + inv[0][2],
            inv[1][0] * x + inv[1][1] * y + inv[1][2],
        )
    })
}

/// Counter-clockwise rotation about `(cx, cy)` in degrees
pub fn rotation_matrix(cx: f64, cy: f64, degrees: f64) -> Affine {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        [cos, sin, (1.0 - cos) * cx - sin * cy],
        [-sin, cos, sin * cx + (1.0 - cos) * cy],
    ]
}

pub fn flip_horizontal(raster: &Raster) -> Raster {
    Raster::from_image(imageops::flip_horizontal(raster.pixels()), raster.depth())
}

pub fn flip_vertical(raster: &Raster) -> Raster {
    Raster::from_image(imageops::flip_vertical(raster.pixels()), raster.depth())
}
