use std::fmt;

/// Byte range of a content request. `first` is inclusive; `last` is
/// inclusive when present, otherwise the server streams to end of object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub first: u64,
    pub last: Option<u64>,
}

impl ByteRange {
    pub fn unbounded(first: u64) -> Self {
        Self { first, last: None }
    }

    pub fn bounded(first: u64, last: u64) -> Self {
        Self {
            first,
            last: Some(last),
        }
    }

    /// Exclusive end of the range, falling back to the object size for
    /// unbounded requests.
    pub fn end(&self, object_size: u64) -> u64 {
        match self.last {
            Some(last) => last + 1,
            None => object_size,
        }
    }

    /// Value of the HTTP `Range` header for this range, e.g. `bytes=5-9` or
    /// `bytes=5-` when unbounded.
    pub fn header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last {
            Some(last) => write!(f, "bytes={}-{}", self.first, last),
            None => write!(f, "bytes={}-", self.first),
        }
    }
}

/// Decide the byte range of the next stream open.
///
/// Sequential access streams from the position to end of object. Random
/// access bounds the request by the larger of the configured minimum span
/// and the caller's buffer, clamped to the object, and stops short of an
/// already-cached footer so cached bytes are not fetched twice.
pub fn plan_range(
    position: u64,
    size: u64,
    random_access: bool,
    min_range_request_size: u64,
    buffer_hint: u64,
    cached_footer_start: Option<u64>,
) -> ByteRange {
    if !random_access {
        return ByteRange::unbounded(position);
    }

    let span = min_range_request_size.max(buffer_hint).max(1);
    let mut last = size.saturating_sub(1).min(position + span - 1);
    if let Some(footer_start) = cached_footer_start {
        if position < footer_start && last >= footer_start {
            last = footer_start - 1;
        }
    }
    ByteRange::bounded(position, last)
}
