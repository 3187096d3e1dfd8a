//! Condition specifications and their normalization into shared
//! [`Check`] objects.
//!
//! A condition can be written in several shapes: a prebuilt condition, a
//! boolean, named fields, a positional tuple of the leading fields
//! `(tag, attrib, text, parent, children, keep_children)`, or a bare tag
//! filter. [`normalize_condition`] turns every shape into a
//! [`ConditionRef`] and enforces the placement rules: a parent condition
//! may not declare children, and a child condition may not declare a parent.

use std::sync::Arc;

use regex::Regex;

use super::attrib::AttribSpec;
use super::composite::{Check, Condition, ConditionRef, EmptyCondition};
use super::filter::FilterSpec;
use crate::error::ConditionError;

/// Named fields of a condition.
///
/// # Examples
/// ```
/// use yax::{AttribSpec, ConditionFields};
///
/// let fields = ConditionFields::new()
///     .with_tag("lineup")
///     .with_attribs(AttribSpec::new().with("participantFK", true))
///     .with_child("participant");
/// assert_eq!(fields.children.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConditionFields {
    pub tag: FilterSpec,
    pub attrib: AttribSpec,
    pub text: FilterSpec,
    pub parent: ConditionSpec,
    pub children: Vec<ConditionSpec>,
    pub keep_children: Vec<ConditionSpec>,
}

impl ConditionFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<FilterSpec>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Add one attribute constraint.
    #[must_use]
    pub fn with_attrib(mut self, key: impl Into<String>, filter: impl Into<FilterSpec>) -> Self {
        self.attrib = self.attrib.with(key, filter);
        self
    }

    /// Replace all attribute constraints.
    #[must_use]
    pub fn with_attribs(mut self, attrib: impl Into<AttribSpec>) -> Self {
        self.attrib = attrib.into();
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<FilterSpec>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<ConditionSpec>) -> Self {
        self.parent = parent.into();
        self
    }

    /// Require a child satisfying `child`. Each call adds one requirement.
    #[must_use]
    pub fn with_child(mut self, child: impl Into<ConditionSpec>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Keep children satisfying `keep` alive without requiring them.
    #[must_use]
    pub fn with_keep(mut self, keep: impl Into<ConditionSpec>) -> Self {
        self.keep_children.push(keep.into());
        self
    }
}

/// Every shape a condition can be written in.
#[derive(Debug, Clone, Default)]
pub enum ConditionSpec {
    /// Omitted. Only allowed where a default answer exists.
    #[default]
    None,
    /// Fixed answer.
    Bool(bool),
    /// Already built; passed through after the placement check.
    Built(ConditionRef),
    Fields(Box<ConditionFields>),
    /// Shorthand for a condition on the tag name only.
    Tag(FilterSpec),
}

impl From<bool> for ConditionSpec {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ConditionSpec {
    fn from(tag: &str) -> Self {
        Self::Tag(tag.into())
    }
}

impl From<String> for ConditionSpec {
    fn from(tag: String) -> Self {
        Self::Tag(tag.into())
    }
}

impl From<Regex> for ConditionSpec {
    fn from(tag: Regex) -> Self {
        Self::Tag(tag.into())
    }
}

impl From<FilterSpec> for ConditionSpec {
    fn from(tag: FilterSpec) -> Self {
        Self::Tag(tag)
    }
}

impl<T: Into<FilterSpec>> From<Vec<T>> for ConditionSpec {
    fn from(tags: Vec<T>) -> Self {
        Self::Tag(tags.into())
    }
}

impl From<ConditionFields> for ConditionSpec {
    fn from(fields: ConditionFields) -> Self {
        Self::Fields(Box::new(fields))
    }
}

impl From<Condition> for ConditionSpec {
    fn from(condition: Condition) -> Self {
        Self::Built(Arc::new(condition))
    }
}

impl From<EmptyCondition> for ConditionSpec {
    fn from(condition: EmptyCondition) -> Self {
        Self::Built(Arc::new(condition))
    }
}

impl From<Arc<Condition>> for ConditionSpec {
    fn from(condition: Arc<Condition>) -> Self {
        Self::Built(condition)
    }
}

impl From<ConditionRef> for ConditionSpec {
    fn from(condition: ConditionRef) -> Self {
        Self::Built(condition)
    }
}

impl<T, A> From<(T, A)> for ConditionSpec
where
    T: Into<FilterSpec>,
    A: Into<AttribSpec>,
{
    fn from((tag, attrib): (T, A)) -> Self {
        ConditionFields::new()
            .with_tag(tag)
            .with_attribs(attrib)
            .into()
    }
}

impl<T, A, X> From<(T, A, X)> for ConditionSpec
where
    T: Into<FilterSpec>,
    A: Into<AttribSpec>,
    X: Into<FilterSpec>,
{
    fn from((tag, attrib, text): (T, A, X)) -> Self {
        ConditionFields::new()
            .with_tag(tag)
            .with_attribs(attrib)
            .with_text(text)
            .into()
    }
}

impl<T, A, X, P> From<(T, A, X, P)> for ConditionSpec
where
    T: Into<FilterSpec>,
    A: Into<AttribSpec>,
    X: Into<FilterSpec>,
    P: Into<ConditionSpec>,
{
    fn from((tag, attrib, text, parent): (T, A, X, P)) -> Self {
        ConditionFields::new()
            .with_tag(tag)
            .with_attribs(attrib)
            .with_text(text)
            .with_parent(parent)
            .into()
    }
}

impl<T, A, X, P, C> From<(T, A, X, P, Vec<C>)> for ConditionSpec
where
    T: Into<FilterSpec>,
    A: Into<AttribSpec>,
    X: Into<FilterSpec>,
    P: Into<ConditionSpec>,
    C: Into<ConditionSpec>,
{
    fn from((tag, attrib, text, parent, children): (T, A, X, P, Vec<C>)) -> Self {
        let mut fields = ConditionFields::new()
            .with_tag(tag)
            .with_attribs(attrib)
            .with_text(text)
            .with_parent(parent);
        fields.children = children.into_iter().map(Into::into).collect();
        fields.into()
    }
}

/// Positional form of every field, in declaration order.
impl<T, A, X, P, C, K> From<(T, A, X, P, Vec<C>, Vec<K>)> for ConditionSpec
where
    T: Into<FilterSpec>,
    A: Into<AttribSpec>,
    X: Into<FilterSpec>,
    P: Into<ConditionSpec>,
    C: Into<ConditionSpec>,
    K: Into<ConditionSpec>,
{
    fn from(
        (tag, attrib, text, parent, children, keep_children): (T, A, X, P, Vec<C>, Vec<K>),
    ) -> Self {
        let mut fields = ConditionFields::new()
            .with_tag(tag)
            .with_attribs(attrib)
            .with_text(text)
            .with_parent(parent);
        fields.children = children.into_iter().map(Into::into).collect();
        fields.keep_children = keep_children.into_iter().map(Into::into).collect();
        fields.into()
    }
}

/// Where a condition is used, and what it may therefore declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// May declare a parent condition.
    pub allow_parents: bool,
    /// May declare child conditions.
    pub allow_children: bool,
    /// Answer of the stub produced for an omitted condition.
    pub none_default: bool,
    /// Whether an omitted condition is accepted at all.
    pub allow_none: bool,
}

impl Placement {
    /// Top-level registration.
    pub const ANY: Self = Self {
        allow_parents: true,
        allow_children: true,
        none_default: true,
        allow_none: true,
    };

    /// Parent of another condition.
    pub const PARENT: Self = Self {
        allow_children: false,
        ..Self::ANY
    };

    /// Member of a children or keep list.
    pub const CHILD: Self = Self {
        allow_parents: false,
        allow_none: false,
        ..Self::ANY
    };
}

impl Default for Placement {
    fn default() -> Self {
        Self::ANY
    }
}

/// Turn any condition shape into a shared condition.
///
/// Prebuilt conditions are returned as the same `Arc`, never re-wrapped.
///
/// # Errors
/// * `ConditionError::ParentWithChildren` / `ChildWithParent` when the
///   condition does not fit `placement`
/// * `ConditionError::MissingChildCondition` for an omitted condition where
///   none is allowed
/// * `ConditionError::InvalidFilter` for a custom predicate used as a whole
///   condition
/// * Any error from building the condition's own filters
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use yax::{normalize_condition, Condition, ConditionRef, Placement};
///
/// let built: ConditionRef = Arc::new(Condition::new("PLANT").unwrap());
/// let normalized = normalize_condition(built.clone().into(), Placement::ANY).unwrap();
/// assert!(Arc::ptr_eq(&built, &normalized));
/// ```
pub fn normalize_condition(
    spec: ConditionSpec,
    placement: Placement,
) -> Result<ConditionRef, ConditionError> {
    let condition: ConditionRef = match spec {
        ConditionSpec::None | ConditionSpec::Tag(FilterSpec::None) => {
            if !placement.allow_none {
                return Err(ConditionError::MissingChildCondition);
            }
            Arc::new(EmptyCondition::new(placement.none_default))
        }
        ConditionSpec::Bool(answer) | ConditionSpec::Tag(FilterSpec::Bool(answer)) => {
            Arc::new(EmptyCondition::new(answer))
        }
        ConditionSpec::Tag(FilterSpec::Custom(_)) => {
            return Err(ConditionError::InvalidFilter {
                position: "condition",
                found: "custom predicate",
            });
        }
        ConditionSpec::Tag(tag) => Arc::new(Condition::new(tag)?),
        ConditionSpec::Fields(fields) => Arc::new(Condition::from_fields(*fields)?),
        ConditionSpec::Built(condition) => condition,
    };
    verify_placement(condition.as_ref(), placement)?;
    tracing::trace!(?placement, "Normalized condition");
    Ok(condition)
}

/// Normalize a children or keep list. Every member is in child position.
///
/// # Errors
/// Returns the first error of [`normalize_condition`] among the members.
pub fn normalize_children(specs: Vec<ConditionSpec>) -> Result<Vec<ConditionRef>, ConditionError> {
    specs
        .into_iter()
        .map(|spec| normalize_condition(spec, Placement::CHILD))
        .collect()
}

fn verify_placement(condition: &dyn Check, placement: Placement) -> Result<(), ConditionError> {
    if !placement.allow_children && condition.has_children() {
        return Err(ConditionError::ParentWithChildren);
    }
    if !placement.allow_parents && condition.has_parent() {
        return Err(ConditionError::ChildWithParent);
    }
    Ok(())
}
