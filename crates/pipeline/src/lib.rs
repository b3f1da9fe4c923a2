//! The file upload pipeline.
//!
//! An upload resolves its target model, reads the bounded file body, then,
//! holding and renewing the slot lock, clears any stale pending file, stages
//! a new pending record, stores the bytes, commits the record and sweeps
//! versions beyond the model's `keep`. The committed file is hydrated with
//! download counters before it is returned. Failures after the commit never
//! fail the upload; they come back as [`CleanupFailure`] warnings.

mod body;
pub mod builder;
pub mod config;
pub mod context;
pub mod error;
pub mod hydrate;
pub mod metrics;
pub mod pipeline;
pub mod reconcile;
pub mod sweep;

#[cfg(test)]
mod test_support;

pub use builder::UploadPipelineBuilder;
pub use config::UploadConfig;
pub use context::{Stores, UploadContext};
pub use error::{CleanupFailure, ErrorKind, PipelineError, UploadError};
pub use metrics::{MetricsSnapshot, UploadMetrics};
pub use pipeline::{UploadOutcome, UploadPipeline, UploadRequest, UploadTarget};
pub use reconcile::{ReconcileError, ReconcileReport, Reconciler};
pub use sweep::SweepReport;
