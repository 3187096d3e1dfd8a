//! Error types for the condition engine and the streaming controller.
//!
//! Uses the dual-error pattern: `ConditionError` for mistakes in a condition
//! specification (always raised while building a condition, never during a
//! pass), `StreamError` for everything that can go wrong while a document is
//! being consumed, and `YaxError` wrapping both for library consumers.

use thiserror::Error;

use crate::reader::Position;

/// Boxed error returned by user callbacks.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Malformed condition specification.
#[derive(Debug, Error)]
pub enum ConditionError {
    /// The specification shape is not accepted in this position.
    #[error("Invalid {position} filter: {found}")]
    InvalidFilter {
        position: &'static str,
        found: &'static str,
    },

    /// A list filter contains another list.
    #[error("Nested lists are not allowed in a {position} filter")]
    NestedList { position: &'static str },

    /// An attribute filter tried to require that an attribute is missing.
    #[error("Attribute absence cannot be expressed: attribute '{key}' is set to false")]
    AttributeAbsence { key: String },

    /// A parent condition declares child conditions.
    #[error("Checking children of parents not allowed")]
    ParentWithChildren,

    /// A child condition declares a parent condition.
    #[error("Checking parents of children not allowed")]
    ChildWithParent,

    /// A children list contains an empty entry.
    #[error("Child condition must not be empty")]
    MissingChildCondition,

    /// A regular expression failed to compile.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Failure while driving a pass over an input stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// `start` was called without an input stream.
    #[error("Input stream is not initialized")]
    NotBound,

    /// The stream was already consumed (or the pass aborted).
    #[error("The input stream is closed")]
    Closed,

    /// Registration or binding was attempted after the pass started.
    #[error("The reader has already started; register conditions before calling start")]
    AlreadyStarted,

    /// The tokenizer rejected the document.
    #[error("XML parsing failed: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The element structure is broken (unbalanced tags, missing root).
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// Malformed attribute in a start tag.
    #[error("Malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// Reading the input failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A converter could not render an element.
    #[error("Failed to convert <{tag}>: {message}")]
    Serialize { tag: String, message: String },

    /// A user callback returned an error.
    #[error("Callback failed at element #{}: {source}", .position.index)]
    Callback {
        position: Position,
        #[source]
        source: CallbackError,
    },
}

/// Main error type for the library.
#[derive(Debug, Error)]
pub enum YaxError {
    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Invalid reader configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, YaxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConditionError::AttributeAbsence {
            key: "participantFK".to_string(),
        };
        assert!(err.to_string().contains("participantFK"));
        assert!(err.to_string().contains("absence"));
    }

    #[test]
    fn test_invalid_filter_display() {
        let err = ConditionError::InvalidFilter {
            position: "tag",
            found: "false",
        };
        assert_eq!(err.to_string(), "Invalid tag filter: false");
    }

    #[test]
    fn test_callback_error_display() {
        let err = StreamError::Callback {
            position: Position {
                index: 7,
                offset: 120,
            },
            source: "boom".into(),
        };
        assert_eq!(err.to_string(), "Callback failed at element #7: boom");
    }

    #[test]
    fn test_yax_error_is_transparent() {
        let err: YaxError = StreamError::NotBound.into();
        assert_eq!(err.to_string(), "Input stream is not initialized");
    }
}
