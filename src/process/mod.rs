// src/process/mod.rs
//! Per-file processing: read the artifact, pick its table, map the headers.

pub mod date_parser;
pub mod loader;
pub mod normalize;
pub mod select;
pub mod utils;

pub use date_parser::extract_date_from_filename;
pub use loader::load_artifact;
pub use normalize::{normalize_headers, MappingReport};
pub use select::{select_table, Selection, PREFERRED_TABLE};
