//! `Condition`, its fixed-answer stand-in `EmptyCondition`, and the
//! matching and retention rules shared by both.
//!
//! Elements carry no parent pointer. The ancestor chain of an element is
//! passed alongside it as a slice, root first and parent last.

use std::fmt;
use std::sync::Arc;

use super::attrib::{normalize_attrib, AttribPredicate};
use super::filter::{normalize_filter, FilterSpec, Predicate};
use super::spec::{normalize_children, normalize_condition, ConditionFields, Placement};
use crate::error::ConditionError;
use crate::xml::Element;

/// Shared, read-only condition.
pub type ConditionRef = Arc<dyn Check>;

/// Anything that can stand where a condition is expected.
pub trait Check: fmt::Debug + Send + Sync {
    /// Does `element`, with the given ancestors, satisfy this condition?
    fn check(&self, element: &Element, ancestors: &[Element]) -> bool;

    /// Evaluate against a missing element (the parent of a root).
    fn check_absent(&self) -> bool;

    /// Must `element` survive detachment from its parent?
    fn keep(&self, _element: &Element, _ancestors: &[Element]) -> bool {
        false
    }

    /// Whether a real parent condition is declared.
    fn has_parent(&self) -> bool {
        false
    }

    /// Whether child conditions are declared.
    fn has_children(&self) -> bool {
        false
    }

    /// `Some(answer)` for stubs that ignore their input.
    fn fixed_answer(&self) -> Option<bool> {
        None
    }
}

/// Stub that returns the same answer for every element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyCondition {
    answer: bool,
}

impl EmptyCondition {
    #[must_use]
    pub fn new(answer: bool) -> Self {
        Self { answer }
    }
}

impl Check for EmptyCondition {
    fn check(&self, _element: &Element, _ancestors: &[Element]) -> bool {
        self.answer
    }

    fn check_absent(&self) -> bool {
        self.answer
    }

    fn fixed_answer(&self) -> Option<bool> {
        Some(self.answer)
    }
}

/// Composite predicate over an element's tag, attributes, text, parent
/// and children.
///
/// # Examples
/// ```
/// use yax::{Check, Condition, ConditionFields, Element, FilterSpec};
///
/// let cheap = FilterSpec::custom(|t| {
///     t.strip_prefix('$')
///         .and_then(|p| p.parse::<f64>().ok())
///         .is_some_and(|p| p < 5.10)
/// });
/// let condition = Condition::from_fields(
///     ConditionFields::new()
///         .with_tag("PLANT")
///         .with_child(ConditionFields::new().with_tag("PRICE").with_text(cheap)),
/// )
/// .unwrap();
///
/// let plant = Element::parse("<PLANT><PRICE>$4.45</PRICE></PLANT>").unwrap();
/// assert!(condition.check(&plant, &[]));
/// ```
#[derive(Debug, Clone)]
pub struct Condition {
    tag: Predicate,
    attrib: AttribPredicate,
    text: Predicate,
    parent: ConditionRef,
    children: Vec<ConditionRef>,
    keep: Vec<ConditionRef>,
    inverted: bool,
}

impl Condition {
    /// Condition on the tag name only.
    ///
    /// # Errors
    /// Returns a `ConditionError` if the filter is malformed.
    pub fn new(tag: impl Into<FilterSpec>) -> Result<Self, ConditionError> {
        Self::from_fields(ConditionFields::new().with_tag(tag))
    }

    /// Build a condition from named fields.
    ///
    /// The parent is normalized in parent position (no child conditions
    /// allowed), children and keep conditions in child position (no parent
    /// conditions allowed, no empty entries).
    ///
    /// # Errors
    /// Returns the first `ConditionError` found in any field.
    pub fn from_fields(fields: ConditionFields) -> Result<Self, ConditionError> {
        Ok(Self {
            tag: normalize_filter(fields.tag, "tag")?,
            attrib: normalize_attrib(fields.attrib)?,
            text: normalize_filter(fields.text, "text")?,
            parent: normalize_condition(fields.parent, Placement::PARENT)?,
            children: normalize_children(fields.children)?,
            keep: normalize_children(fields.keep_children)?,
            inverted: false,
        })
    }

    /// Negate the whole condition. Calling it twice restores the original.
    #[must_use]
    pub fn invert(mut self) -> Self {
        self.inverted = !self.inverted;
        self
    }

    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    fn matches(&self, element: &Element, ancestors: &[Element]) -> bool {
        if !self.tag.test(Some(element.tag())) {
            return false;
        }
        if !self.attrib.test(Some(element.attrib())) {
            return false;
        }
        if !self.text.test(element.text().map(str::trim)) {
            return false;
        }
        let parent_ok = match ancestors.split_last() {
            Some((parent, rest)) => self.parent.check(parent, rest),
            None => self.parent.check_absent(),
        };
        if !parent_ok {
            return false;
        }
        // Only children still attached count; detached ones are gone
        self.children.iter().all(|condition| {
            element
                .children()
                .iter()
                .any(|child| condition.check(child, &[]))
        })
    }
}

impl Check for Condition {
    fn check(&self, element: &Element, ancestors: &[Element]) -> bool {
        self.matches(element, ancestors) != self.inverted
    }

    fn check_absent(&self) -> bool {
        let matched = self.tag.test(None)
            && self.attrib.test(None)
            && self.text.test(None)
            && self.parent.check_absent()
            && self.children.is_empty();
        matched != self.inverted
    }

    fn keep(&self, element: &Element, ancestors: &[Element]) -> bool {
        let Some(parent) = ancestors.last() else {
            return true;
        };
        let wanted = || self.children.iter().chain(&self.keep);

        // Descendants needed by nested child conditions
        if wanted().any(|condition| condition.keep(element, ancestors)) {
            return true;
        }
        if !self.tag.test(Some(parent.tag())) {
            return false;
        }
        wanted().any(|condition| condition.check(element, ancestors))
    }

    fn has_parent(&self) -> bool {
        self.parent.fixed_answer().is_none()
    }

    fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}
