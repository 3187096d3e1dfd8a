//! Streaming controller.
//!
//! A [`StreamReader`] owns an ordered registry of (condition, runner) pairs
//! and drives one pass over an input stream. At every closing tag the
//! closed element is evaluated against each registered condition in
//! registration order, matching runners fire, and then the retention
//! decision is taken: the element is attached to its parent if any
//! condition votes to keep it, and dropped with its subtree otherwise.
//! Peak memory is bounded by the open ancestor path plus whatever the
//! registered conditions ask to keep.

use std::fmt;
use std::io::{BufReader, Read};
use std::sync::Arc;

use quick_xml::Reader;
use serde::Serialize;

use crate::condition::{
    normalize_condition, Condition, ConditionFields, ConditionRef, ConditionSpec, Placement,
};
use crate::config::ReaderConfig;
use crate::error::{Result, StreamError};
use crate::runner::{CallbackRunner, Converter, OutputFormat};
use crate::xml::{read_token, Element, Token, TreeBuilder};

/// Where an element closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    /// Number of elements closed before this one.
    pub index: usize,
    /// Byte offset just after the closing tag.
    pub offset: u64,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.index, self.offset)
    }
}

/// Counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
    pub opened: usize,
    pub closed: usize,
    /// Condition matches, one per (element, registration) pair.
    pub matched: usize,
    pub detached: usize,
    /// Most elements alive at once: open ancestors plus retained subtrees.
    pub peak_alive: usize,
}

struct Registration<'a> {
    condition: ConditionRef,
    runner: CallbackRunner<'a>,
}

enum State<'a> {
    Idle,
    Ready(Box<dyn Read + 'a>),
    Running,
    Closed,
}

impl State<'_> {
    fn name(&self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::Ready(_) => "ready",
            State::Running => "running",
            State::Closed => "closed",
        }
    }
}

/// Single-pass streaming controller.
///
/// # Examples
/// ```
/// use yax::{ConditionFields, StreamReader};
///
/// let xml = r#"<CATALOG><PLANT><COMMON>Hepatica</COMMON></PLANT><PLANT/></CATALOG>"#;
/// let mut found = Vec::new();
///
/// let mut reader = StreamReader::from_reader(xml.as_bytes());
/// reader
///     .find(ConditionFields::new().with_tag("PLANT").with_child("COMMON"))
///     .unwrap()
///     .calls(|output, position| {
///         found.push((output.as_element().map(|e| e.children().len()), position.index));
///         Ok(())
///     });
/// let stats = reader.start().unwrap();
/// drop(reader);
///
/// assert_eq!(found, [(Some(1), 1)]);
/// assert_eq!(stats.matched, 1);
/// ```
pub struct StreamReader<'a> {
    config: ReaderConfig,
    registry: Vec<Registration<'a>>,
    state: State<'a>,
}

impl Default for StreamReader<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> StreamReader<'a> {
    /// Create an unbound reader with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ReaderConfig::default(),
            registry: Vec::new(),
            state: State::Idle,
        }
    }

    /// Create an unbound reader with a custom configuration.
    ///
    /// # Errors
    /// Returns `YaxError::Config` if the configuration is invalid.
    pub fn with_config(config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: Vec::new(),
            state: State::Idle,
        })
    }

    /// Create a reader bound to `input`, with the default configuration.
    #[must_use]
    pub fn from_reader(input: impl Read + 'a) -> Self {
        let mut reader = Self::new();
        reader.state = State::Ready(Box::new(input));
        reader
    }

    /// Bind (or rebind) the input stream.
    ///
    /// # Errors
    /// * `StreamError::AlreadyStarted` while a pass is running
    /// * `StreamError::Closed` after a pass
    pub fn bind(&mut self, input: impl Read + 'a) -> Result<()> {
        match self.state {
            State::Idle | State::Ready(_) => {
                self.state = State::Ready(Box::new(input));
                Ok(())
            }
            State::Running => Err(StreamError::AlreadyStarted.into()),
            State::Closed => Err(StreamError::Closed.into()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Whether an input stream is bound and not yet consumed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    /// Number of registered conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Register a condition built from named fields.
    ///
    /// # Errors
    /// * `YaxError::Condition` if the fields do not form a valid condition
    /// * `StreamError::AlreadyStarted` after `start` was called
    pub fn find(&mut self, fields: ConditionFields) -> Result<&mut CallbackRunner<'a>> {
        self.ensure_not_started()?;
        let condition = Arc::new(Condition::from_fields(fields)?);
        self.register(condition)
    }

    /// Register a condition in any accepted shape, including prebuilt ones.
    ///
    /// # Errors
    /// * `YaxError::Condition` if the condition cannot be normalized
    /// * `StreamError::AlreadyStarted` after `start` was called
    pub fn match_condition(
        &mut self,
        condition: impl Into<ConditionSpec>,
    ) -> Result<&mut CallbackRunner<'a>> {
        self.ensure_not_started()?;
        let condition = normalize_condition(condition.into(), Placement::ANY)?;
        self.register(condition)
    }

    /// Release the input stream without reading it.
    pub fn close(&mut self) {
        if !matches!(self.state, State::Closed) {
            tracing::debug!(state = self.state.name(), "Closing reader");
        }
        self.state = State::Closed;
    }

    /// Run the pass over the bound stream.
    ///
    /// The stream is released when the pass ends, successfully or not, and
    /// the reader is closed afterwards.
    ///
    /// # Errors
    /// * `StreamError::NotBound` if no stream is bound
    /// * `StreamError::Closed` if the stream was already consumed or closed
    /// * Tokenizer, structure and IO errors from the document
    /// * `StreamError::Callback` for the first failing callback
    pub fn start(&mut self) -> Result<PassStats> {
        let input = match std::mem::replace(&mut self.state, State::Running) {
            State::Ready(input) => input,
            State::Idle => {
                self.state = State::Idle;
                return Err(StreamError::NotBound.into());
            }
            State::Running => return Err(StreamError::AlreadyStarted.into()),
            State::Closed => {
                self.state = State::Closed;
                return Err(StreamError::Closed.into());
            }
        };

        tracing::debug!(
            chunk_size = self.config.chunk_size,
            conditions = self.registry.len(),
            "Starting pass"
        );
        let result = self.run_pass(input);
        self.state = State::Closed;

        match result {
            Ok(stats) => {
                tracing::debug!(
                    opened = stats.opened,
                    matched = stats.matched,
                    detached = stats.detached,
                    peak_alive = stats.peak_alive,
                    "Pass finished"
                );
                Ok(stats)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Pass aborted");
                Err(err.into())
            }
        }
    }

    fn ensure_not_started(&self) -> std::result::Result<(), StreamError> {
        match self.state {
            State::Idle | State::Ready(_) => Ok(()),
            State::Running | State::Closed => Err(StreamError::AlreadyStarted),
        }
    }

    fn register(&mut self, condition: ConditionRef) -> Result<&mut CallbackRunner<'a>> {
        let runner = CallbackRunner::new(Converter::from_config(
            OutputFormat::default(),
            &self.config,
        ));
        tracing::debug!(index = self.registry.len(), ?condition, "Registered condition");
        self.registry.push(Registration { condition, runner });
        let index = self.registry.len() - 1;
        Ok(&mut self.registry[index].runner)
    }

    fn run_pass(
        &mut self,
        input: Box<dyn Read + 'a>,
    ) -> std::result::Result<PassStats, StreamError> {
        let input = BufReader::with_capacity(self.config.chunk_size, input);
        let mut reader = Reader::from_reader(input);
        let mut buf = Vec::new();
        let mut builder = TreeBuilder::new();
        let mut stats = PassStats::default();

        loop {
            match read_token(&mut reader, &mut buf)? {
                Token::Open(element) => {
                    stats.opened += 1;
                    builder.open(element);
                }
                Token::Empty(element) => {
                    stats.opened += 1;
                    builder.open(element);
                    let offset = reader.buffer_position();
                    self.close_element(&mut builder, &mut stats, offset)?;
                }
                Token::Close => {
                    let offset = reader.buffer_position();
                    self.close_element(&mut builder, &mut stats, offset)?;
                }
                Token::Text(text) => builder.text(&text),
                Token::Other => {}
                Token::Eof => break,
            }
        }

        builder.finish()?;
        if stats.opened == 0 {
            return Err(StreamError::Malformed(
                "document has no root element".to_string(),
            ));
        }
        stats.peak_alive = builder.peak_alive();
        Ok(stats)
    }

    /// Evaluate, dispatch and retain or detach the innermost open element.
    ///
    /// A callback error is returned only after the element was attached or
    /// detached.
    fn close_element(
        &mut self,
        builder: &mut TreeBuilder,
        stats: &mut PassStats,
        offset: u64,
    ) -> std::result::Result<(), StreamError> {
        let element = builder.close()?;
        let position = Position {
            index: stats.closed,
            offset,
        };
        stats.closed += 1;

        let ancestors = builder.ancestors();
        let dispatched = self.dispatch(&element, ancestors, position, stats);
        let keep = ancestors.is_empty()
            || self
                .registry
                .iter()
                .any(|registration| registration.condition.keep(&element, ancestors));

        if keep {
            builder.attach(element);
        } else {
            tracing::trace!(tag = element.tag(), index = position.index, "Detached element");
            stats.detached += 1;
            builder.detach(element);
        }
        dispatched
    }

    fn dispatch(
        &mut self,
        element: &Element,
        ancestors: &[Element],
        position: Position,
        stats: &mut PassStats,
    ) -> std::result::Result<(), StreamError> {
        for registration in &mut self.registry {
            if !registration.condition.check(element, ancestors) {
                continue;
            }
            stats.matched += 1;
            tracing::trace!(tag = element.tag(), %position, "Condition matched");
            registration.runner.run(element, position)?;
        }
        Ok(())
    }
}

impl fmt::Debug for StreamReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamReader")
            .field("config", &self.config)
            .field("conditions", &self.registry.len())
            .field("state", &self.state.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::YaxError;

    fn run(xml: &str, setup: impl FnOnce(&mut StreamReader<'_>)) -> PassStats {
        let mut reader = StreamReader::from_reader(xml.as_bytes());
        setup(&mut reader);
        reader.start().unwrap()
    }

    #[test]
    fn test_start_without_stream_fails() {
        let mut reader = StreamReader::new();
        assert!(matches!(
            reader.start(),
            Err(YaxError::Stream(StreamError::NotBound))
        ));
        assert!(!reader.is_closed());
    }

    #[test]
    fn test_second_start_fails_closed() {
        let mut reader = StreamReader::from_reader("<a/>".as_bytes());
        reader.start().unwrap();
        assert!(reader.is_closed());
        assert!(matches!(
            reader.start(),
            Err(YaxError::Stream(StreamError::Closed))
        ));
    }

    #[test]
    fn test_closed_reader_rejects_start_and_bind() {
        let mut reader = StreamReader::from_reader("<a/>".as_bytes());
        reader.close();
        assert!(matches!(
            reader.start(),
            Err(YaxError::Stream(StreamError::Closed))
        ));
        assert!(matches!(
            reader.bind("<b/>".as_bytes()),
            Err(YaxError::Stream(StreamError::Closed))
        ));
    }

    #[test]
    fn test_bind_then_start() {
        let mut reader = StreamReader::new();
        assert!(!reader.is_ready());
        reader.bind("<a><b/></a>".as_bytes()).unwrap();
        assert!(reader.is_ready());
        let stats = reader.start().unwrap();
        assert_eq!(stats.opened, 2);
        assert_eq!(stats.closed, 2);
    }

    #[test]
    fn test_registration_after_start_fails() {
        let mut reader = StreamReader::from_reader("<a/>".as_bytes());
        reader.start().unwrap();
        assert!(matches!(
            reader.find(ConditionFields::new().with_tag("a")),
            Err(YaxError::Stream(StreamError::AlreadyStarted))
        ));
        assert!(matches!(
            reader.match_condition("a"),
            Err(YaxError::Stream(StreamError::AlreadyStarted))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(StreamReader::with_config(ReaderConfig::new().with_chunk_size(0)).is_err());
        let reader = StreamReader::with_config(ReaderConfig::new().with_chunk_size(16)).unwrap();
        assert_eq!(reader.config().chunk_size, 16);
    }

    #[test]
    fn test_unmatched_siblings_are_detached() {
        let stats = run("<root><a/><a/><a/></root>", |reader| {
            reader.match_condition("zzz").unwrap();
        });
        assert_eq!(stats.closed, 4);
        assert_eq!(stats.detached, 3);
        assert_eq!(stats.matched, 0);
        assert_eq!(stats.peak_alive, 2);
    }

    #[test]
    fn test_detaches_without_registrations() {
        let stats = run("<root><a><b/></a></root>", |_| {});
        assert_eq!(stats.detached, 2);
        assert_eq!(stats.peak_alive, 3);
    }

    #[test]
    fn test_positions_count_close_events() {
        let mut positions = Vec::new();
        {
            let mut reader = StreamReader::from_reader("<r><x/><y></y><x/></r>".as_bytes());
            reader
                .match_condition("x")
                .unwrap()
                .calls(|_, position| {
                    positions.push(position);
                    Ok(())
                });
            reader.start().unwrap();
        }
        let indexes: Vec<usize> = positions.iter().map(|p| p.index).collect();
        assert_eq!(indexes, vec![0, 2]);
        assert!(positions[0].offset < positions[1].offset);
        assert_eq!(positions[0].offset, 7);
    }

    #[test]
    fn test_callback_error_after_retention_decision() {
        let mut reader = StreamReader::new();
        reader
            .find(ConditionFields::new().with_tag("root").with_child("a"))
            .unwrap();
        reader
            .match_condition("a")
            .unwrap()
            .calls(|_, _| Err("stop".into()));
        reader
            .match_condition("a")
            .unwrap()
            .calls(|_, _| panic!("later callbacks must not run"));

        let mut builder = TreeBuilder::new();
        let mut stats = PassStats::default();
        builder.open(Element::new("root"));
        builder.open(Element::new("a"));

        let err = reader
            .close_element(&mut builder, &mut stats, 10)
            .unwrap_err();
        assert!(matches!(err, StreamError::Callback { position, .. } if position.offset == 10));
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.detached, 0);

        builder.close_and_attach().unwrap();
        let root = builder.into_root().unwrap();
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn test_callback_error_aborts_pass_and_closes() {
        let mut reader = StreamReader::from_reader("<r><a/><a/></r>".as_bytes());
        reader.match_condition("a").unwrap().calls(|_, _| Err("boom".into()));
        let err = reader.start().unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(reader.is_closed());
    }

    #[test]
    fn test_malformed_documents_abort() {
        for xml in ["<a><b></a>", "<a><b/>", "", "just text"] {
            let mut reader = StreamReader::from_reader(xml.as_bytes());
            assert!(reader.start().is_err(), "{xml:?} should fail");
            assert!(reader.is_closed());
        }
    }

    #[test]
    fn test_each_root_replaces_the_previous_one() {
        let stats = run("<a><b/></a><a><b/></a><a><b/></a>", |reader| {
            reader
                .find(ConditionFields::new().with_tag("a").with_child("b"))
                .unwrap();
        });
        assert_eq!(stats.matched, 3);
        assert_eq!(stats.detached, 0);
        assert_eq!(stats.peak_alive, 2);
    }

    #[test]
    fn test_small_chunks_give_same_result() {
        let xml = r#"<CATALOG><PLANT id="1"><COMMON>Bloodroot</COMMON></PLANT><PLANT id="2"/></CATALOG>"#;
        let mut ids = Vec::new();
        {
            let config = ReaderConfig::new().with_chunk_size(3);
            let mut reader = StreamReader::with_config(config).unwrap();
            reader.bind(xml.as_bytes()).unwrap();
            reader
                .match_condition("PLANT")
                .unwrap()
                .calls(|output, _| {
                    let id = output.as_element().and_then(|e| e.attribute("id"));
                    ids.push(id.map(str::to_string));
                    Ok(())
                });
            reader.start().unwrap();
        }
        assert_eq!(ids, vec![Some("1".to_string()), Some("2".to_string())]);
    }
}
