//! Pure logic: no I/O happens in this layer.

mod backoff;
mod footer;
mod range;

pub use backoff::BackoffSequencer;
pub use footer::{footer_start, FooterCache};
pub use range::{plan_range, ByteRange};
