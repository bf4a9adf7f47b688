//! HTTP/JSON transport over a blob-store API.
//!
//! Metadata lives at `{endpoint}/b/{bucket}/o/{object}`; content is the same
//! resource with `alt=media` and a `Range` header. Generation pinning rides
//! along as a query parameter.

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header;
use serde::{Deserialize, Deserializer};
use url::Url;

use crate::core::ByteRange;
use crate::data::{ObjectHandle, ObjectMetadata, Timeouts};
use crate::effects::transport::{error_for_status, RangeBody, StorageTransport};
use crate::error::{ReadError, Result};

/// [`StorageTransport`] implementation speaking the JSON API over HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Create a transport against the given API endpoint, e.g.
    /// `https://storage.example.com/storage/v1`.
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_timeouts(endpoint, Timeouts::default())
    }

    pub fn with_timeouts(endpoint: &str, timeouts: Timeouts) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ReadError::InvalidArgument(format!("invalid endpoint: {e}")))?;
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .read_timeout(timeouts.read)
            .build()
            .map_err(|e| ReadError::InvalidArgument(format!("failed to build http client: {e}")))?;
        Ok(Self { client, endpoint })
    }

    fn object_url(&self, handle: &ObjectHandle, generation: Option<i64>) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ReadError::InvalidArgument(format!("endpoint {} cannot be a base", self.endpoint))
            })?
            .push("b")
            .push(handle.bucket())
            .push("o")
            .push(handle.object());
        if let Some(generation) = generation {
            url.query_pairs_mut()
                .append_pair("generation", &generation.to_string());
        }
        Ok(url)
    }
}

#[async_trait]
impl StorageTransport for HttpTransport {
    async fn fetch_metadata(&self, handle: &ObjectHandle) -> Result<ObjectMetadata> {
        let url = self.object_url(handle, handle.generation())?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(error_for_status(
                status,
                &format!("metadata fetch for {handle}"),
            ));
        }

        let resource: ObjectResource = response.json().await.map_err(map_reqwest_error)?;
        Ok(ObjectMetadata {
            size: resource.size,
            generation: resource.generation,
            content_encoding: resource.content_encoding,
        })
    }

    async fn open_range(
        &self,
        handle: &ObjectHandle,
        range: ByteRange,
        generation: Option<i64>,
    ) -> Result<RangeBody> {
        let mut url = self.object_url(handle, generation.or(handle.generation()))?;
        url.query_pairs_mut().append_pair("alt", "media");

        let response = self
            .client
            .get(url)
            .header(header::RANGE, range.header_value())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let first_byte = match status {
            // Partial content: trust the server's view of where it started.
            206 => response
                .headers()
                .get(header::CONTENT_RANGE)
                .and_then(|value| value.to_str().ok())
                .and_then(content_range_first_byte)
                .unwrap_or(range.first),
            // The range was ignored and the body starts at the beginning.
            200 => 0,
            _ => {
                return Err(error_for_status(
                    status,
                    &format!("content open for {handle}"),
                ))
            }
        };
        let content_encoding = response
            .headers()
            .get(header::CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let stream = response
            .bytes_stream()
            .map_err(map_reqwest_error)
            .boxed();
        Ok(RangeBody {
            stream,
            first_byte,
            content_encoding,
        })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> ReadError {
    if error.is_decode() {
        ReadError::Fatal(format!("malformed response body: {error}"))
    } else {
        // Connection resets, timeouts and friends.
        ReadError::Transient(error.to_string())
    }
}

/// Parse the first byte offset out of a `Content-Range` header such as
/// `bytes 5-9/10`.
fn content_range_first_byte(value: &str) -> Option<u64> {
    let rest = value.strip_prefix("bytes ")?;
    let (range, _total) = rest.split_once('/')?;
    let (first, _last) = range.split_once('-')?;
    first.trim().parse().ok()
}

/// Wire form of an object resource. Int64 attributes arrive as decimal
/// strings in JSON, so both representations are accepted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    #[serde(deserialize_with = "u64_from_wire")]
    size: u64,
    #[serde(deserialize_with = "i64_from_wire")]
    generation: i64,
    #[serde(default)]
    content_encoding: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireInt64 {
    Number(i64),
    Text(String),
}

fn i64_from_wire<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    match WireInt64::deserialize(deserializer)? {
        WireInt64::Number(value) => Ok(value),
        WireInt64::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn u64_from_wire<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    let value = i64_from_wire(deserializer)?;
    u64::try_from(value).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_range_parsing() {
        assert_eq!(content_range_first_byte("bytes 5-9/10"), Some(5));
        assert_eq!(content_range_first_byte("bytes 0-0/1"), Some(0));
        assert_eq!(content_range_first_byte("bytes */10"), None);
        assert_eq!(content_range_first_byte("units 5-9/10"), None);
    }

    #[test]
    fn test_object_resource_accepts_string_and_number_int64() {
        let resource: ObjectResource =
            serde_json::from_str(r#"{"size": "1024", "generation": "42"}"#).unwrap();
        assert_eq!(resource.size, 1024);
        assert_eq!(resource.generation, 42);
        assert_eq!(resource.content_encoding, None);

        let resource: ObjectResource = serde_json::from_str(
            r#"{"size": 10, "generation": 7, "contentEncoding": "gzip"}"#,
        )
        .unwrap();
        assert_eq!(resource.size, 10);
        assert_eq!(resource.content_encoding.as_deref(), Some("gzip"));
    }

    #[test]
    fn test_object_url_encodes_nested_names() {
        let transport = HttpTransport::new("https://storage.example.com/storage/v1").unwrap();
        let handle = ObjectHandle::new("bucket", "dir/part 1.parquet");
        let url = transport.object_url(&handle, Some(5)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.example.com/storage/v1/b/bucket/o/dir%2Fpart%201.parquet?generation=5"
        );
    }
}
