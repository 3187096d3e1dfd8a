//! Configuration constants and the validated reader configuration.

use crate::error::{Result, YaxError};

/// Number of bytes requested from the input per read.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Marker prepended to attribute names in the attribute-prefixed mapping.
pub const DEFAULT_ATTRIB_PREFIX: &str = "-";

/// Key holding the aggregated text in the attribute-prefixed mapping.
pub const DEFAULT_TEXT_KEY: &str = "#text";

/// Per-reader configuration.
///
/// Carried by each [`StreamReader`](crate::reader::StreamReader) instance,
/// so two readers with different settings never interfere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Capacity of the read buffer, i.e. the size of one input chunk.
    pub chunk_size: usize,

    /// Prefix for attribute keys in the attribute-prefixed mapping.
    pub attrib_prefix: String,

    /// Key for aggregated text in the attribute-prefixed mapping.
    pub text_key: String,
}

impl ReaderConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            attrib_prefix: DEFAULT_ATTRIB_PREFIX.to_string(),
            text_key: DEFAULT_TEXT_KEY.to_string(),
        }
    }

    /// Set the chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the attribute prefix.
    #[must_use]
    pub fn with_attrib_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.attrib_prefix = prefix.into();
        self
    }

    /// Set the aggregated text key.
    #[must_use]
    pub fn with_text_key(mut self, key: impl Into<String>) -> Self {
        self.text_key = key.into();
        self
    }

    /// Validate the configuration.
    ///
    /// # Returns
    /// * `Ok(())` if every setting is usable
    /// * `Err(YaxError::Config)` describing the first offending setting
    ///
    /// # Examples
    /// ```
    /// use yax::config::ReaderConfig;
    ///
    /// assert!(ReaderConfig::new().validate().is_ok());
    /// assert!(ReaderConfig::new().with_chunk_size(0).validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(YaxError::Config("chunk size must be positive".to_string()));
        }
        if self.attrib_prefix.is_empty() {
            return Err(YaxError::Config(
                "attribute prefix must not be empty".to_string(),
            ));
        }
        if self.text_key.is_empty() {
            return Err(YaxError::Config("text key must not be empty".to_string()));
        }
        // Otherwise an attribute could overwrite the aggregated text
        if self.text_key.starts_with(&self.attrib_prefix) {
            return Err(YaxError::Config(format!(
                "text key '{}' collides with attribute prefix '{}'",
                self.text_key, self.attrib_prefix
            )));
        }
        Ok(())
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ReaderConfig::default();
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.attrib_prefix, "-");
        assert_eq!(config.text_key, "#text");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_chunk() {
        let err = ReaderConfig::new().with_chunk_size(0).validate().unwrap_err();
        assert!(err.to_string().contains("chunk size"));
    }

    #[test]
    fn test_validate_rejects_empty_prefix_and_key() {
        assert!(ReaderConfig::new().with_attrib_prefix("").validate().is_err());
        assert!(ReaderConfig::new().with_text_key("").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_colliding_text_key() {
        let config = ReaderConfig::new()
            .with_attrib_prefix("@")
            .with_text_key("@text");
        assert!(config.validate().is_err());

        let config = ReaderConfig::new()
            .with_attrib_prefix("@")
            .with_text_key("#text");
        assert!(config.validate().is_ok());
    }
}
