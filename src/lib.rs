//! pricesense: score customers against a remote price-sensitivity model
//!
//! Records come from a single form-style input or from the rows of an uploaded spreadsheet.
//! Each record is sent to the prediction service, the results are collected in input order,
//! and scored tables can be exported back to a spreadsheet or summarized with charts.

pub mod batch;
pub mod cli;
pub mod client;
pub mod data;
pub mod error;
pub mod export;
pub mod model;
pub mod source;
pub mod summary;
pub mod viz;

// Re-export public items for easier access
pub use batch::{BatchReport, BatchScorer, CancelToken, ScoredRow, ScoredTable};
pub use cli::Args;
pub use client::{ClientConfig, PredictionClient, Scorer};
pub use data::{load_table, read_table, write_table, TableFormat};
pub use error::Error;
pub use export::{export, PREDICTION_COLUMN, PROBABILITY_COLUMN};
pub use model::{CabinClass, CustomerAttributes, CustomerRecord, FlightType, PredictionResult, Segment};
pub use source::{RecordSource, SingleRecordSource, TabularRecordSource};
pub use summary::{summarize, summarize_frame, Summary};

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;
