//! Image step handlers and output sinks
//!
//! [`ImageHandler`] persists every produced raster through a [`RasterSink`]
//! and logs the file name. [`PreviewHandler`] keeps everything in memory and
//! only runs deterministic transforms.

use super::augment::{augment, augment_deterministic};
use super::codec::encode_for_storage;
use super::ops::{self, ImageOp, NormalizeMethod};
use super::raster::Raster;
use crate::executor::StepHandler;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sdk::{ExecutionLogEntry, OpSpec, StepError};
use std::fs;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// Destination for step outputs
pub trait RasterSink {
    /// Store `raster` and return the stored file name
    fn persist(&mut self, raster: &Raster, stem: &str) -> Result<String, StepError>;
}

/// Writes `<uuid>_<stem>.png|npy` files into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

impl RasterSink for DirectorySink {
    fn persist(&mut self, raster: &Raster, stem: &str) -> Result<String, StepError> {
        let (bytes, ext) = encode_for_storage(raster)?;
        let file_name = format!("{}_{}.{}", Uuid::new_v4().simple(), stem, ext);
        fs::create_dir_all(&self.dir)
            .and_then(|_| fs::write(self.dir.join(&file_name), bytes))
            .map_err(|e| StepError::Persist(format!("{}: {}", file_name, e)))?;
        debug!("Wrote {}", file_name);
        Ok(file_name)
    }
}

/// Keeps encoded outputs in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub files: Vec<(String, Vec<u8>)>,
}

impl RasterSink for MemorySink {
    fn persist(&mut self, raster: &Raster, stem: &str) -> Result<String, StepError> {
        let (bytes, ext) = encode_for_storage(raster)?;
        let file_name = format!("{}_{}.{}", self.files.len(), stem, ext);
        self.files.push((file_name.clone(), bytes));
        Ok(file_name)
    }
}

/// Full image handler: every op writes its output through the sink
pub struct ImageHandler<S> {
    sink: S,
    rng: StdRng,
    max_variants: usize,
    last_output: Option<String>,
}

impl<S: RasterSink> ImageHandler<S> {
    /// `seed` makes `ml_training` augmentation reproducible
    pub fn new(sink: S, seed: Option<u64>, max_variants: usize) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            sink,
            rng,
            max_variants,
            last_output: None,
        }
    }

    /// Name of the most recently written file
    pub fn last_output(&self) -> Option<&str> {
        self.last_output.as_deref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn store(&mut self, raster: &Raster, op: &str, stem: &str) -> Result<ExecutionLogEntry, StepError> {
        let file_name = self.sink.persist(raster, stem)?;
        self.last_output = Some(file_name.clone());
        Ok(ExecutionLogEntry::ok(op).with("output", file_name))
    }
}

impl<S: RasterSink> StepHandler for ImageHandler<S> {
    type State = Raster;
    type Op = ImageOp;

    fn apply(
        &mut self,
        state: &mut Raster,
        op: ImageOp,
        _spec: &OpSpec,
    ) -> Result<Vec<ExecutionLogEntry>, StepError> {
        let name = op.name();
        let stem = match &op {
            ImageOp::Normalize { method }
                if NormalizeMethod::parse(method) == Some(NormalizeMethod::ZScore) =>
            {
                "normalize_zscore"
            }
            _ => name,
        };

        match op {
            ImageOp::Resize {
                width,
                height,
                interp,
            } => *state = ops::resize_required(state, width, height, &interp)?,
            ImageOp::Denoise { method, ksize } => *state = ops::denoise(state, &method, ksize)?,
            ImageOp::Normalize { method } => *state = ops::normalize(state, &method),
            ImageOp::Augment(params) => {
                let variants = augment(state, &params, self.max_variants, &mut self.rng)?;
                let mut entries = Vec::with_capacity(variants.len());
                for (raster, label) in &variants {
                    entries.push(self.store(raster, &format!("augment_{}", label), label)?);
                }
                if let Some((last, _)) = variants.into_iter().last() {
                    *state = last;
                }
                return Ok(entries);
            }
        }

        Ok(vec![self.store(state, name, stem)?])
    }
}

/// In-memory preview: deterministic transforms only, lenient parameters
#[derive(Debug, Default)]
pub struct PreviewHandler;

/// Preview edge length when a resize omits its dimensions
pub const PREVIEW_EDGE: i64 = 224;

impl StepHandler for PreviewHandler {
    type State = Raster;
    type Op = ImageOp;

    fn apply(
        &mut self,
        state: &mut Raster,
        op: ImageOp,
        _spec: &OpSpec,
    ) -> Result<Vec<ExecutionLogEntry>, StepError> {
        let name = op.name();
        match op {
            ImageOp::Resize {
                width,
                height,
                interp,
            } => {
                *state = ops::resize(
                    state,
                    width.unwrap_or(PREVIEW_EDGE),
                    height.unwrap_or(PREVIEW_EDGE),
                    &interp,
                )?
            }
            ImageOp::Denoise { method, ksize } => {
                let ksize = if ksize % 2 == 0 { ksize + 1 } else { ksize.max(1) };
                *state = ops::denoise(state, &method, ksize)?;
            }
            ImageOp::Normalize { method } => *state = ops::normalize(state, &method),
            ImageOp::Augment(params) => *state = augment_deterministic(state, &params)?,
        }
        Ok(vec![ExecutionLogEntry::ok(name)])
    }
}
