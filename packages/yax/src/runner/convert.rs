//! Output formats and the converters that produce them.
//!
//! Four shapes are available:
//! - `Element`: a borrowed reference to the element, no copy
//! - `String`: the element and its retained subtree serialized as XML
//! - `Dict`: a [`NestedElement`] mirroring the tree
//! - `Prefixed`: a JSON object with prefixed attribute keys, children keyed
//!   by tag and aggregated text under a single key

use std::fmt;
use std::str::FromStr;

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};

use crate::config::{ReaderConfig, DEFAULT_ATTRIB_PREFIX, DEFAULT_TEXT_KEY};
use crate::error::StreamError;
use crate::xml::{to_xml_string, Attributes, Element};

/// Representation handed to a callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    #[default]
    Element,
    String,
    Dict,
    Prefixed,
}

impl OutputFormat {
    /// All formats, in declaration order.
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Element,
        OutputFormat::String,
        OutputFormat::Dict,
        OutputFormat::Prefixed,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Element => "element",
            OutputFormat::String => "string",
            OutputFormat::Dict => "dict",
            OutputFormat::Prefixed => "prefixed",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| {
                format!("unknown output format '{s}' (expected element, string, dict or prefixed)")
            })
    }
}

/// A converted element, as received by a callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Output<'a> {
    Element(&'a Element),
    String(String),
    Dict(NestedElement),
    Prefixed(Value),
}

impl Output<'_> {
    #[must_use]
    pub fn format(&self) -> OutputFormat {
        match self {
            Output::Element(_) => OutputFormat::Element,
            Output::String(_) => OutputFormat::String,
            Output::Dict(_) => OutputFormat::Dict,
            Output::Prefixed(_) => OutputFormat::Prefixed,
        }
    }

    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Output::Element(element) => Some(element),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Output::String(xml) => Some(xml),
            _ => None,
        }
    }
}

/// Nested mapping of an element.
///
/// `childlist` keeps every child in document order. The tag-keyed view
/// returned by [`NestedElement::child`] points at the last child with that
/// tag, so repeated tags overwrite each other there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedElement {
    pub tag: String,
    pub attrib: Attributes,
    pub text: Option<String>,
    pub childlist: Vec<NestedElement>,
    by_tag: Vec<(String, usize)>,
}

impl NestedElement {
    #[must_use]
    pub fn from_element(element: &Element) -> Self {
        let mut nested = Self {
            tag: element.tag().to_string(),
            attrib: element.attrib().clone(),
            text: element.text().map(str::to_string),
            childlist: Vec::with_capacity(element.children().len()),
            by_tag: Vec::new(),
        };
        for (index, child) in element.children().iter().enumerate() {
            nested.childlist.push(Self::from_element(child));
            match nested.by_tag.iter_mut().find(|(tag, _)| tag == child.tag()) {
                Some(entry) => entry.1 = index,
                None => nested.by_tag.push((child.tag().to_string(), index)),
            }
        }
        nested
    }

    /// Last child with the given tag.
    #[must_use]
    pub fn child(&self, tag: &str) -> Option<&NestedElement> {
        self.by_tag
            .iter()
            .find(|(t, _)| t == tag)
            .and_then(|(_, index)| self.childlist.get(*index))
    }

    /// Tag-keyed view, one entry per distinct tag in first-seen order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &NestedElement)> {
        self.by_tag
            .iter()
            .filter_map(|(tag, index)| Some((tag.as_str(), self.childlist.get(*index)?)))
    }
}

struct ChildrenByTag<'a>(&'a NestedElement);

impl Serialize for ChildrenByTag<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.children())
    }
}

impl Serialize for NestedElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("NestedElement", 5)?;
        state.serialize_field("tag", &self.tag)?;
        state.serialize_field("attrib", &self.attrib)?;
        state.serialize_field("text", &self.text)?;
        state.serialize_field("children", &ChildrenByTag(self))?;
        state.serialize_field("childlist", &self.childlist)?;
        state.end()
    }
}

/// Attribute-prefixed mapping of an element.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use yax::{runner::to_prefixed, Element};
///
/// let catalog = Element::parse(
///     r#"<CATALOG name="first"><PLANT>Rose</PLANT><PLANT>Lily</PLANT></CATALOG>"#,
/// )
/// .unwrap();
/// assert_eq!(
///     to_prefixed(&catalog, "-", "#text"),
///     json!({
///         "-name": "first",
///         "PLANT": [{"#text": "Rose"}, {"#text": "Lily"}]
///     })
/// );
/// ```
#[must_use]
pub fn to_prefixed(element: &Element, attrib_prefix: &str, text_key: &str) -> Value {
    let mut map = Map::new();
    for (key, value) in element.attrib().iter() {
        map.insert(format!("{attrib_prefix}{key}"), Value::String(value.to_string()));
    }

    let mut text = element.text().unwrap_or_default().to_string();
    for child in element.children() {
        let value = to_prefixed(child, attrib_prefix, text_key);
        match map.get_mut(child.tag()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(child.tag().to_string(), value);
            }
        }
        if let Some(tail) = child.tail() {
            text.push_str(tail);
        }
    }

    if !text.trim().is_empty() {
        map.insert(text_key.to_string(), Value::String(text));
    }
    Value::Object(map)
}

/// Converts closed elements into one output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converter {
    format: OutputFormat,
    attrib_prefix: String,
    text_key: String,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(OutputFormat::default())
    }
}

impl Converter {
    /// Converter with the default prefix and text key.
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            attrib_prefix: DEFAULT_ATTRIB_PREFIX.to_string(),
            text_key: DEFAULT_TEXT_KEY.to_string(),
        }
    }

    /// Converter taking the prefix and text key from a reader configuration.
    #[must_use]
    pub fn from_config(format: OutputFormat, config: &ReaderConfig) -> Self {
        Self {
            format,
            attrib_prefix: config.attrib_prefix.clone(),
            text_key: config.text_key.clone(),
        }
    }

    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.format = format;
    }

    /// Convert an element.
    ///
    /// # Errors
    /// Returns `StreamError::Serialize` if the string form cannot be produced.
    pub fn convert<'a>(&self, element: &'a Element) -> Result<Output<'a>, StreamError> {
        let output = match self.format {
            OutputFormat::Element => Output::Element(element),
            OutputFormat::String => Output::String(to_xml_string(element)?),
            OutputFormat::Dict => Output::Dict(NestedElement::from_element(element)),
            OutputFormat::Prefixed => {
                Output::Prefixed(to_prefixed(element, &self.attrib_prefix, &self.text_key))
            }
        };
        Ok(output)
    }
}
