use std::fmt;

/// Immutable identifier of a remote object: bucket, object name and an
/// optional pinned generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    bucket: String,
    object: String,
    generation: Option<i64>,
}

impl ObjectHandle {
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
            generation: None,
        }
    }

    /// Pin the handle to a specific content generation.
    ///
    /// Generations are positive, server-assigned numbers; a non-positive
    /// value clears the pinning.
    #[must_use]
    pub fn with_generation(mut self, generation: i64) -> Self {
        self.generation = (generation > 0).then_some(generation);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn generation(&self) -> Option<i64> {
        self.generation
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.object)?;
        if let Some(generation) = self.generation {
            write!(f, "#{generation}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_generation_clears_pinning() {
        let handle = ObjectHandle::new("logs", "day.parquet").with_generation(-1);
        assert_eq!(handle.generation(), None);

        let handle = handle.with_generation(42);
        assert_eq!(handle.generation(), Some(42));
    }

    #[test]
    fn test_display_includes_generation_when_pinned() {
        let handle = ObjectHandle::new("logs", "day.parquet");
        assert_eq!(handle.to_string(), "logs/day.parquet");
        assert_eq!(
            handle.with_generation(7).to_string(),
            "logs/day.parquet#7"
        );
    }
}
