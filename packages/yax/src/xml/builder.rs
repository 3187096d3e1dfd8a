//! Tree builder on top of the token stream.
//!
//! The builder keeps a stack of open elements. A closing element is popped
//! off the stack and handed back to the caller, which decides whether it is
//! attached to its parent or detached (dropped together with its subtree).

use super::element::Element;
use crate::error::StreamError;

/// Where character data for an open element currently goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextSink {
    /// No child closed yet: the element's own text.
    Text,
    /// Tail of the last attached child.
    Tail,
    /// Tail of a detached child, dropped with it.
    Discard,
}

/// Stack-based builder for the retained part of the tree.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    open: Vec<Element>,
    sinks: Vec<TextSink>,
    root: Option<Element>,
    alive: usize,
    peak_alive: usize,
}

impl TreeBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a freshly opened element.
    ///
    /// A new top-level element releases the previous root.
    pub fn open(&mut self, element: Element) {
        if self.open.is_empty() {
            self.release_root();
        }
        self.open.push(element);
        self.sinks.push(TextSink::Text);
        self.alive += 1;
        self.peak_alive = self.peak_alive.max(self.alive);
    }

    /// Add character data to the innermost open element.
    ///
    /// Text outside the root element is ignored.
    pub fn text(&mut self, text: &str) {
        let (Some(element), Some(sink)) = (self.open.last_mut(), self.sinks.last()) else {
            return;
        };
        match sink {
            TextSink::Text => element.append_text(text),
            TextSink::Tail => element.append_tail_of_last_child(text),
            TextSink::Discard => {}
        }
    }

    /// Pop the innermost open element.
    ///
    /// # Errors
    /// Returns `StreamError::Malformed` if no element is open.
    pub fn close(&mut self) -> Result<Element, StreamError> {
        self.sinks.pop();
        self.open
            .pop()
            .ok_or_else(|| StreamError::Malformed("unexpected closing tag".to_string()))
    }

    /// Open ancestors of the element that was just closed, root first.
    #[must_use]
    pub fn ancestors(&self) -> &[Element] {
        &self.open
    }

    /// Attach a closed element to its parent, or keep it as the root.
    pub fn attach(&mut self, element: Element) {
        match self.open.last_mut() {
            Some(parent) => {
                parent.push_child(element);
                self.set_sink(TextSink::Tail);
            }
            None => {
                self.release_root();
                self.root = Some(element);
            }
        }
    }

    /// Drop a closed element and everything below it.
    pub fn detach(&mut self, element: Element) {
        self.alive = self.alive.saturating_sub(element.subtree_len());
        self.set_sink(TextSink::Discard);
    }

    /// Close the innermost element and attach it unconditionally.
    ///
    /// # Errors
    /// Returns `StreamError::Malformed` if no element is open.
    pub fn close_and_attach(&mut self) -> Result<(), StreamError> {
        let element = self.close()?;
        self.attach(element);
        Ok(())
    }

    /// Check that the document ended with every element closed.
    ///
    /// # Errors
    /// Returns `StreamError::Malformed` naming the innermost unclosed element.
    pub fn finish(&self) -> Result<(), StreamError> {
        match self.open.last() {
            Some(element) => Err(StreamError::Malformed(format!(
                "document ended inside <{}>",
                element.tag()
            ))),
            None => Ok(()),
        }
    }

    /// Number of elements currently reachable from the open stack.
    #[must_use]
    pub fn alive(&self) -> usize {
        self.alive
    }

    /// Highest value `alive` has reached.
    #[must_use]
    pub fn peak_alive(&self) -> usize {
        self.peak_alive
    }

    /// Take the finished root element.
    #[must_use]
    pub fn into_root(self) -> Option<Element> {
        self.root
    }

    fn release_root(&mut self) {
        if let Some(previous) = self.root.take() {
            self.alive = self.alive.saturating_sub(previous.subtree_len());
        }
    }

    fn set_sink(&mut self, sink: TextSink) {
        if let Some(current) = self.sinks.last_mut() {
            *current = sink;
        }
    }
}
