//! Bounded-concurrency download passes over the CDN content graph.
//!
//! The pipeline runs two sequential passes: the meta pass downloads every
//! reachable meta container and collects the content entries they name, then
//! the content pass streams every content blob to its sink. Jobs within a
//! pass run concurrently up to a configurable cap; completions carry no
//! ordering guarantee. Persistence is delegated to caller-supplied sinks.

mod error;
mod pipeline;
mod progress;
mod sink;

pub use error::PipelineError;
pub use pipeline::{DEFAULT_MAX_JOBS, Pipeline};
pub use progress::{ProgressReporter, ReporterMisuse};
pub use sink::{ContentSink, MetaSink};
