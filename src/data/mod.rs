//! Immutable configuration and identifier types.

mod handle;
mod metadata;
mod options;

pub use handle::ObjectHandle;
pub use metadata::{ObjectMetadata, SIZE_UNKNOWN};
pub use options::{BackoffOptions, Fadvise, ReadOptions, Timeouts};
