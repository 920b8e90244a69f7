pub mod config;
pub mod error;
pub mod family;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod quality;
pub mod table;
pub mod walk;

pub use config::{DateWindow, OutputFormat, PipelineConfig, RawConfig};
pub use error::PipelineError;
pub use family::DataFamily;
pub use pipeline::{CombinedDataset, Pipeline, RunOutcome, RunReport, RunSummary};
