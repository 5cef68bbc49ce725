//! Certificate Stamper
//!
//! Batch driver around `overlay-composer`: reads a names file and a directory
//! of PDF templates, and writes one stamped page per (template, name) pair.

pub mod batch;
pub mod config;
pub mod error;
pub mod names;
pub mod naming;
pub mod templates;

pub use batch::{run_batch, stamp_single, BatchReport, PairFailure};
pub use config::StampConfig;
pub use error::{Result, StampError};
