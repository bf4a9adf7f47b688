//! Seekable reads over a remote blob store.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable configuration and identifier types
//! - [`core`] - Pure logic: backoff schedules, range planning, the footer cache
//! - [`effects`] - I/O: transports, retries and the read channel
//!
//! # Key Features
//!
//! - **Fadvise-driven ranges**: sequential scans drain one unbounded stream;
//!   random access sends bounded range requests sized from the read buffer,
//!   and `Auto` switches over the first time a seek pattern looks random
//! - **Footer prefetch**: tail probes of columnar files are served from one
//!   cached range request instead of many small ones
//! - **Generation pinning**: every content request is tied to one immutable
//!   snapshot of the object
//! - **Transparent retries**: transient failures and truncated streams are
//!   absorbed by truncated exponential backoff with jitter

mod core;
mod data;
mod effects;
mod error;
mod stats;

pub use crate::core::{footer_start, plan_range, BackoffSequencer, ByteRange, FooterCache};
pub use crate::data::{
    BackoffOptions, Fadvise, ObjectHandle, ObjectMetadata, ReadOptions, Timeouts, SIZE_UNKNOWN,
};
pub use crate::effects::{
    error_for_status, run_with_backoff, BoxByteStream, RangeBody, ReadChannel, StorageTransport,
};
pub use crate::error::{ReadError, Result};
pub use crate::stats::{ChannelStats, NoopStats};

#[cfg(feature = "reqwest")]
pub use crate::effects::HttpTransport;
