//! # Deckflow
//!
//! A sequential pipeline engine that turns a topic into a rendered slide deck.
//!
//! Deckflow runs a fixed chain of stages over a shared [`state::PipelineState`]:
//!
//! - **Outline**: plan one item per slide
//! - **Research**: gather supporting notes per outline item
//! - **Content**: write the slide bodies
//! - **Media**: attach an image keyword and URL to each slide
//! - **Document**: render the deck to disk
//!
//! Calls to external services are composed from reusable wrappers: bounded
//! exponential-backoff retry ([`interceptors::retrying`]) and content-addressed
//! result caching ([`interceptors::cached`]). A stage whose service keeps
//! failing degrades to empty output instead of aborting the run. Whole
//! pipeline runs can be dispatched as jobs on a broker, falling back to inline
//! execution when none is reachable ([`dispatcher::JobDispatcher`]).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deckflow::prelude::*;
//!
//! let settings = Settings::from_env()?;
//! init_tracing(&settings.log)?;
//!
//! let cache = Arc::new(ResultCache::on_disk(&settings.cache_dir));
//! let runner = PipelineRunner::presentation(&ports, &settings, &cache, Arc::new(LoggingEventSink::debug()))?;
//!
//! let request = PipelineRequest::new("Climate Change").with_slide_count(5);
//! let state = run_pipeline(&runner, &request).await?;
//! println!("{}", state.output_path);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod interceptors;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod state;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cache::{CacheKey, CacheStats, CacheStore, DiskCacheStore, ResultCache};
    pub use crate::config::Settings;
    pub use crate::dispatcher::{
        register_pipeline_job, DispatchMode, InMemoryBroker, JobBroker, JobDispatcher, JobHandle,
        JobRegistry, JobStatus, Worker,
    };
    pub use crate::errors::{DeckflowError, DispatchError, InputValidationError, ServiceError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::interceptors::{cached, operation, retrying, Operation, SharedOperation};
    pub use crate::observability::init_tracing;
    pub use crate::pipeline::{
        run_pipeline, JitterStrategy, PipelineBuilder, PipelineRequest, PipelineRunner, RetryPolicy,
    };
    pub use crate::stages::{PresentationPorts, Stage};
    pub use crate::state::{Depth, OutlineItem, PipelineState, Slide, StateField, StateUpdate};
    pub use std::sync::Arc;
}
