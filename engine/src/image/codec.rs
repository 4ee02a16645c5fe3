//! Image codecs
//!
//! Decoding goes through the `image` crate. `U8` rasters persist as PNG and
//! `F32` rasters as float32 NPY arrays of shape `(height, width, channels)`.

use super::raster::{Depth, Raster};
use image::ImageFormat;
use sdk::{PipelineError, StepError};
use std::io::Cursor;
use std::path::Path;

const NPY_MAGIC: &[u8] = b"\x93NUMPY";

/// Decode an encoded image into an 8-bit RGB raster
pub fn decode_image(bytes: &[u8]) -> Result<Raster, PipelineError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| PipelineError::Input(format!("could not decode image: {}", e)))?;
    Ok(Raster::from_dynamic(&img))
}

/// Load an image file; returns the raster and the file size in bytes
pub fn load_image(path: &Path) -> Result<(Raster, u64), PipelineError> {
    let bytes = std::fs::read(path)
        .map_err(|e| PipelineError::Input(format!("failed to read {}: {}", path.display(), e)))?;
    let raster = decode_image(&bytes)
        .map_err(|e| PipelineError::Input(format!("{}: {}", path.display(), e)))?;
    Ok((raster, bytes.len() as u64))
}

pub fn encode_png(raster: &Raster) -> Result<Vec<u8>, StepError> {
    let mut buffer = Cursor::new(Vec::new());
    raster
        .to_rgb8()
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| StepError::Persist(format!("PNG encoding failed: {}", e)))?;
    Ok(buffer.into_inner())
}

/// NPY v1.0 document holding the raw float32 samples
pub fn encode_npy(raster: &Raster) -> Vec<u8> {
    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}, {}), }}",
        raster.height(),
        raster.width(),
        raster.channels()
    );
    // magic + version + length field + header is padded to a multiple of 64
    let unpadded = NPY_MAGIC.len() + 2 + 2 + header.len() + 1;
    header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    header.push('\n');

    let mut out = Vec::with_capacity(NPY_MAGIC.len() + 4 + header.len() + raster.data().len() * 4);
    out.extend_from_slice(NPY_MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for sample in raster.data() {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

/// Encoded bytes and file extension for a raster's persisted form
pub fn encode_for_storage(raster: &Raster) -> Result<(Vec<u8>, &'static str), StepError> {
    match raster.depth() {
        Depth::U8 => Ok((encode_png(raster)?, "png")),
        Depth::F32 => Ok((encode_npy(raster), "npy")),
    }
}

#[cfg(test)]
pub(crate) fn decode_npy(bytes: &[u8]) -> Option<(Vec<usize>, Vec<f32>)> {
    if !bytes.starts_with(NPY_MAGIC) {
        return None;
    }
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let header = std::str::from_utf8(&bytes[10..10 + header_len]).ok()?;
    let shape_text = header.split("'shape': (").nth(1)?.split(')').next()?;
    let shape = shape_text
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    let data = bytes[10 + header_len..]
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Some((shape, data))
}
