//! Effect layer: transports, retries and the read channel itself.

mod channel;
#[cfg(feature = "reqwest")]
mod http;
mod metadata;
mod retry;
mod transport;

pub use channel::ReadChannel;
#[cfg(feature = "reqwest")]
pub use http::HttpTransport;
pub use retry::run_with_backoff;
pub use transport::{error_for_status, BoxByteStream, RangeBody, StorageTransport};
