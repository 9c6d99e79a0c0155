//! Tabular input boundary
//!
//! The trainer consumes two row-aligned flat tables (train and test) plus a
//! newline-delimited feature-name list, all produced by the upstream ETL.
//! This module loads them and hands the rest of the pipeline dense
//! `ndarray` matrices with every non-finite cell replaced by exact zero.

mod loader;

pub use loader::{extract_features, load_dataset, load_table, read_feature_names, Dataset};
