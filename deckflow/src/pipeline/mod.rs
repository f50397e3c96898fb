//! Pipeline building and execution.
//!
//! This module provides:
//! - The sequential [`PipelineRunner`] and its builder
//! - Request validation and the [`run_pipeline`] entry point
//! - Backoff retry used by stages around external calls

mod builder;
mod request;
mod retry;
mod runner;

pub use builder::PipelineBuilder;
pub use request::{run_pipeline, PipelineRequest};
pub use retry::{with_retry, with_retry_when, JitterStrategy, RetryAttempt, RetryHook, RetryPolicy};
pub use runner::PipelineRunner;
