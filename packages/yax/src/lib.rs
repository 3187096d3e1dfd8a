//! YAX - Extract fragments from large XML streams with bounded memory.
//!
//! Callers register conditions over tag names, attributes, text, ancestors
//! and descendants, each paired with a callback and an output format. While
//! the document streams through the tokenizer, every closing element is
//! checked against all conditions, matching callbacks fire, and elements
//! that no condition needs are dropped straight away.
//!
//! # Example
//!
//! ```
//! use yax::{AttribSpec, ConditionFields, FilterSpec, OutputFormat, StreamReader};
//!
//! let xml = r#"<lineups><lineup participantFK="100612"/><lineup participantFK="abc"/></lineups>"#;
//! let mut ids = Vec::new();
//!
//! let mut reader = StreamReader::from_reader(xml.as_bytes());
//! reader
//!     .find(ConditionFields::new().with_tag("lineup").with_attribs(
//!         AttribSpec::new().with("participantFK", FilterSpec::pattern(r"\d+").unwrap()),
//!     ))
//!     .unwrap()
//!     .output(OutputFormat::Prefixed)
//!     .calls(|output, _| {
//!         ids.push(format!("{output:?}"));
//!         Ok(())
//!     });
//! reader.start().unwrap();
//! drop(reader);
//!
//! assert_eq!(ids.len(), 1);
//! assert!(ids[0].contains("100612"));
//! ```
//!
//! # Architecture
//!
//! - [`condition`]: Filter normalization, attribute predicates, conditions
//! - [`reader`]: The streaming controller
//! - [`runner`]: Callback runners and output converters
//! - [`xml`]: Element tree, tree builder and serializer
//! - [`config`]: Configuration constants and validation
//! - [`error`]: Error types and Result alias
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod condition;
pub mod config;
pub mod error;
pub mod reader;
pub mod runner;
pub mod xml;

// Re-export commonly used items
pub use condition::{
    normalize_children, normalize_condition, AttribSpec, Check, Condition, ConditionFields,
    ConditionRef, ConditionSpec, EmptyCondition, FilterSpec, Placement,
};
pub use config::ReaderConfig;
pub use error::{CallbackError, ConditionError, Result, StreamError, YaxError};
pub use reader::{PassStats, Position, StreamReader};
pub use runner::{CallbackRunner, NestedElement, Output, OutputFormat};
pub use xml::{Attributes, Element};
