//! Text modality
//!
//! Loads plain text or PDF documents, profiles them and applies text plans.

pub mod document;
pub mod language;
pub mod lemmatizer;
pub mod ops;
pub mod pipeline;
pub mod profile;
pub mod stopwords;

pub use document::{load_document, TextDocument};
pub use ops::{apply_text_plan, TextHandler, TextOp, TextState, TokenUsage};
pub use pipeline::{run_text_data_logic, run_text_plan, TextBundle, TextRun, DEFAULT_TEXT_GOAL};
pub use profile::profile_text;
