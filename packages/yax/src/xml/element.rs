//! Owned element tree produced from the token stream.
//!
//! Ownership runs strictly parent → children. There is no parent pointer:
//! the ancestors of an element are passed alongside it as a slice (root
//! first, parent last), taken from the builder's stack of open elements.

use serde::ser::{Serialize, Serializer};

use super::builder::TreeBuilder;
use super::tokens::{read_token, Token};
use crate::error::StreamError;

/// Attribute mapping of an element.
///
/// Keys are unique; insertion order is preserved so serialized output
/// reproduces the source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    /// Create an empty attribute mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute, replacing the value of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Get the value of an attribute.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over `(key, value)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrib = Self::new();
        for (key, value) in iter {
            attrib.insert(key, value);
        }
        attrib
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// An XML element with its retained subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attrib: Attributes,
    text: Option<String>,
    tail: Option<String>,
    children: Vec<Element>,
}

impl Element {
    /// Create an element without attributes, text or children.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrib: Attributes::new(),
            text: None,
            tail: None,
            children: Vec::new(),
        }
    }

    /// Set an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrib.insert(key, value);
        self
    }

    /// Set the attribute mapping.
    #[must_use]
    pub fn with_attributes(mut self, attrib: Attributes) -> Self {
        self.attrib = attrib;
        self
    }

    /// Set the text following the opening tag.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the text following the closing tag.
    #[must_use]
    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = Some(tail.into());
        self
    }

    /// Append a child element.
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Parse a complete XML document into an unpruned tree.
    ///
    /// # Arguments
    /// * `xml` - Document source
    ///
    /// # Returns
    /// The root element
    ///
    /// # Errors
    /// Returns the tokenizer error for malformed input, or
    /// `StreamError::Malformed` when the document has no root element.
    ///
    /// # Examples
    /// ```
    /// use yax::Element;
    ///
    /// let root = Element::parse("<PLANT><PRICE>$4.45</PRICE></PLANT>").unwrap();
    /// assert_eq!(root.tag(), "PLANT");
    /// assert_eq!(root.children()[0].text(), Some("$4.45"));
    /// ```
    pub fn parse(xml: &str) -> Result<Element, StreamError> {
        let mut reader = quick_xml::Reader::from_str(xml);
        let mut builder = TreeBuilder::new();
        let mut buf = Vec::new();

        loop {
            match read_token(&mut reader, &mut buf)? {
                Token::Open(element) => builder.open(element),
                Token::Empty(element) => {
                    builder.open(element);
                    builder.close_and_attach()?;
                }
                Token::Close => builder.close_and_attach()?,
                Token::Text(text) => builder.text(&text),
                Token::Eof => break,
                Token::Other => {}
            }
        }

        builder.finish()?;
        builder
            .into_root()
            .ok_or_else(|| StreamError::Malformed("document has no root element".to_string()))
    }

    /// Tag name as written in the source (including any namespace prefix).
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn attrib(&self) -> &Attributes {
        &self.attrib
    }

    /// Get an attribute value.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attrib.get(key)
    }

    /// Raw text between the opening tag and the first child.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Raw text between the closing tag and the next sibling.
    #[must_use]
    pub fn tail(&self) -> Option<&str> {
        self.tail.as_deref()
    }

    /// Children still attached to this element.
    #[must_use]
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Find the first attached child with the given tag name.
    #[must_use]
    pub fn find_child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// Number of elements in this subtree, including this element.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Element::subtree_len).sum::<usize>()
    }

    pub(crate) fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    pub(crate) fn append_text(&mut self, text: &str) {
        self.text.get_or_insert_with(String::new).push_str(text);
    }

    /// Append to the tail of the last attached child.
    pub(crate) fn append_tail_of_last_child(&mut self, text: &str) {
        if let Some(child) = self.children.last_mut() {
            child.tail.get_or_insert_with(String::new).push_str(text);
        }
    }
}
