use bytes::Bytes;

/// First byte of the footer region of an object.
///
/// The region spans `[size - min(size, footer_size), size)`, so small
/// objects are covered entirely.
pub fn footer_start(size: u64, footer_size: u64) -> u64 {
    size - size.min(footer_size)
}

/// The prefetched tail segment of an object. Always ends at the resolved
/// object size; at most one exists per channel.
#[derive(Debug, Clone)]
pub struct FooterCache {
    start: u64,
    bytes: Bytes,
}

impl FooterCache {
    pub fn new(start: u64, bytes: Bytes) -> Self {
        Self { start, bytes }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    /// Exclusive end, equal to the object size.
    pub fn end(&self) -> u64 {
        self.start + self.bytes.len() as u64
    }

    pub fn contains(&self, position: u64) -> bool {
        position >= self.start && position < self.end()
    }

    /// Copy cached bytes starting at `position` into `dst`, returning how
    /// many were copied. `position` must lie within the cache.
    pub fn copy_to(&self, position: u64, dst: &mut [u8]) -> usize {
        let offset = (position - self.start) as usize;
        let available = self.bytes.len() - offset;
        let count = available.min(dst.len());
        dst[..count].copy_from_slice(&self.bytes[offset..offset + count]);
        count
    }
}
