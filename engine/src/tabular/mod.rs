//! Tabular modality
//!
//! CSV tables with typed nullable columns, their profiler, the tabular
//! operation library and the orchestrator.

pub mod column;
pub mod csv_io;
pub mod ops;
pub mod pipeline;
pub mod profile;
pub mod stats;
pub mod table;

pub use column::Column;
pub use csv_io::{read_csv, read_csv_from, to_csv_string, write_csv};
pub use ops::{apply_tabular_plan, TabularHandler, TabularOp};
pub use pipeline::{
    run_structured_data_logic, run_tabular_plan, TabularBundle, TabularRun, DEFAULT_TABULAR_GOAL,
};
pub use profile::profile_table;
pub use table::{Table, TablePreview};
