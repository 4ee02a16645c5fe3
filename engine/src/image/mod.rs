//! Image modality
//!
//! Rasters, codecs, the image profiler, geometric and filtering kernels,
//! augmentation, the operation library with its step handlers, and the
//! orchestrator.

pub mod augment;
pub mod codec;
pub mod filters;
pub mod geometry;
pub mod handler;
pub mod ops;
pub mod pipeline;
pub mod profile;
pub mod raster;

pub use augment::AugmentParams;
pub use codec::{decode_image, encode_png, load_image};
pub use handler::{DirectorySink, ImageHandler, MemorySink, PreviewHandler, RasterSink};
pub use ops::ImageOp;
pub use pipeline::{
    process_for_preview, run_image_plan, run_visual_data_logic, ImageBundle, ImageRun,
    DEFAULT_IMAGE_GOAL,
};
pub use profile::profile_image;
pub use raster::{Depth, Raster};
