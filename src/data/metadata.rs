/// Size reported while the decoded length of an object is unknown, which is
/// the case for objects the server decompresses on the fly.
pub const SIZE_UNKNOWN: u64 = i64::MAX as u64;

/// Server-side attributes of an object, resolved at most once per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Stored size in bytes. For gzip encoded objects this is the compressed
    /// on-disk size, not the number of bytes a reader will receive.
    pub size: u64,
    /// Server-assigned content generation, always positive.
    pub generation: i64,
    /// Value of the Content-Encoding attribute, if any.
    pub content_encoding: Option<String>,
}

impl ObjectMetadata {
    pub fn is_gzip_encoded(&self) -> bool {
        self.content_encoding
            .as_deref()
            .is_some_and(|encoding| encoding.eq_ignore_ascii_case("gzip"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_detection_is_case_insensitive() {
        let mut metadata = ObjectMetadata {
            size: 10,
            generation: 1,
            content_encoding: Some("GZIP".into()),
        };
        assert!(metadata.is_gzip_encoded());

        metadata.content_encoding = Some("identity".into());
        assert!(!metadata.is_gzip_encoded());

        metadata.content_encoding = None;
        assert!(!metadata.is_gzip_encoded());
    }
}
