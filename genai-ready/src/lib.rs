//! Readiness polling for asynchronously processed Gemini resources.
//!
//! Large media uploads and long-running operations must finish server-side
//! processing before they can be used. [`poll::ReadinessPoller`] waits for
//! them with a bounded, cancellable loop; [`files::Files`] and
//! [`operations::Operations`] supply the status queries.

pub mod client;
pub mod error;
pub mod files;
pub mod operations;
pub mod poll;

#[cfg(test)]
mod test_support;

pub use genai_ready_types as types;

pub use client::{Client, ClientBuilder, ClientConfig, HttpOptions};
pub use error::{Error, Result};
pub use poll::{
    wait_until_ready, Clock, PollConfig, PollProgress, Readiness, ReadinessPoller, Status,
    TokioClock, UnknownStatusPolicy,
};
pub use tokio_util::sync::CancellationToken;
