//! Filter specifications for tag names, text and attribute values, and
//! their normalized predicates.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::ConditionError;

/// Caller-supplied predicate over an optional value.
pub type CustomFn = Arc<dyn Fn(Option<&str>) -> bool + Send + Sync>;

/// How a caller describes the accepted values of a tag name, a text or an
/// attribute value.
#[derive(Clone, Default)]
pub enum FilterSpec {
    /// No constraint.
    #[default]
    None,
    /// `true`: the value exists and is non-empty. `false` is rejected.
    Bool(bool),
    /// Exact, case-sensitive equality.
    Exact(String),
    /// The whole value must match the pattern.
    Pattern(Regex),
    /// Any member must accept the value. Members cannot be lists.
    List(Vec<FilterSpec>),
    /// Caller logic, used as is.
    Custom(CustomFn),
}

impl FilterSpec {
    /// Compile a pattern filter.
    ///
    /// # Errors
    /// Returns `ConditionError::InvalidPattern` if the regex does not compile.
    pub fn pattern(pattern: &str) -> Result<Self, ConditionError> {
        Ok(Self::Pattern(Regex::new(pattern)?))
    }

    /// Custom predicate over a present value; an absent value never matches.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(move |value: Option<&str>| value.is_some_and(&predicate)))
    }

    /// Custom predicate that also sees absent values.
    pub fn custom_opt<F>(predicate: F) -> Self
    where
        F: Fn(Option<&str>) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(true) => "true",
            Self::Bool(false) => "false",
            Self::Exact(_) => "string",
            Self::Pattern(_) => "pattern",
            Self::List(_) => "list",
            Self::Custom(_) => "custom predicate",
        }
    }
}

impl fmt::Debug for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Exact(s) => f.debug_tuple("Exact").field(s).finish(),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<&str> for FilterSpec {
    fn from(value: &str) -> Self {
        Self::Exact(value.to_string())
    }
}

impl From<String> for FilterSpec {
    fn from(value: String) -> Self {
        Self::Exact(value)
    }
}

impl From<Regex> for FilterSpec {
    fn from(value: Regex) -> Self {
        Self::Pattern(value)
    }
}

impl From<bool> for FilterSpec {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<FilterSpec>> From<Vec<T>> for FilterSpec {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterSpec>> From<Option<T>> for FilterSpec {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

/// Normalized predicate over a tag name, text or attribute value.
#[derive(Clone)]
pub enum Predicate {
    Any,
    NonEmpty,
    Equals(String),
    /// Holds the pattern anchored at both ends.
    FullMatch(Regex),
    AnyOf(Vec<Predicate>),
    Custom(CustomFn),
}

impl Predicate {
    /// Evaluate the predicate; `None` stands for a missing value.
    #[must_use]
    pub fn test(&self, value: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::NonEmpty => value.is_some_and(|v| !v.is_empty()),
            Self::Equals(expected) => value == Some(expected.as_str()),
            Self::FullMatch(re) => value.is_some_and(|v| re.is_match(v)),
            Self::AnyOf(options) => options.iter().any(|p| p.test(value)),
            Self::Custom(predicate) => predicate(value),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::NonEmpty => f.write_str("NonEmpty"),
            Self::Equals(s) => f.debug_tuple("Equals").field(s).finish(),
            Self::FullMatch(re) => f.debug_tuple("FullMatch").field(&re.as_str()).finish(),
            Self::AnyOf(options) => f.debug_tuple("AnyOf").field(options).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Convert a filter specification into a predicate.
///
/// # Arguments
/// * `spec` - The filter specification
/// * `position` - Where the filter is used ("tag", "text", "attribute"), for error messages
///
/// # Errors
/// * `ConditionError::InvalidFilter` for `false`, and for `true`/none inside a list
/// * `ConditionError::NestedList` for a list inside a list
/// * `ConditionError::InvalidPattern` if anchoring a pattern fails
///
/// # Examples
/// ```
/// use yax::condition::{normalize_filter, FilterSpec};
///
/// let p = normalize_filter(vec!["PLANT", "plant"].into(), "tag").unwrap();
/// assert!(p.test(Some("plant")));
/// assert!(!p.test(Some("Plant")));
/// assert!(normalize_filter(FilterSpec::Bool(false), "tag").is_err());
/// ```
pub fn normalize_filter(
    spec: FilterSpec,
    position: &'static str,
) -> Result<Predicate, ConditionError> {
    normalize(spec, position, true)
}

fn normalize(
    spec: FilterSpec,
    position: &'static str,
    top_level: bool,
) -> Result<Predicate, ConditionError> {
    match spec {
        FilterSpec::Custom(predicate) => Ok(Predicate::Custom(predicate)),
        FilterSpec::Exact(expected) => Ok(Predicate::Equals(expected)),
        FilterSpec::Pattern(re) => Ok(Predicate::FullMatch(anchor(&re)?)),
        FilterSpec::List(items) if top_level => {
            // An empty list constrains nothing, like any other falsy spec
            if items.is_empty() {
                return Ok(Predicate::Any);
            }
            let options = items
                .into_iter()
                .map(|item| normalize(item, position, false))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Predicate::AnyOf(options))
        }
        FilterSpec::List(_) => Err(ConditionError::NestedList { position }),
        FilterSpec::Bool(true) if top_level => Ok(Predicate::NonEmpty),
        FilterSpec::None if top_level => Ok(Predicate::Any),
        other => Err(ConditionError::InvalidFilter {
            position,
            found: other.kind(),
        }),
    }
}

/// Anchor a pattern so `is_match` means a full-string match.
///
/// Flags must be inline (`(?i)...`) to survive anchoring.
fn anchor(re: &Regex) -> Result<Regex, ConditionError> {
    Ok(Regex::new(&format!(r"\A(?:{})\z", re.as_str()))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(p: &str) -> FilterSpec {
        FilterSpec::pattern(p).unwrap()
    }

    #[test]
    fn test_exact_is_case_sensitive() {
        let p = normalize_filter("PLANT".into(), "tag").unwrap();
        assert!(p.test(Some("PLANT")));
        assert!(!p.test(Some("plant")));
        assert!(!p.test(None));
    }

    #[test]
    fn test_pattern_is_full_match() {
        let p = normalize_filter(pattern("(?i)plant"), "tag").unwrap();
        assert!(p.test(Some("PlAnT")));
        assert!(!p.test(Some("plant2")));
        assert!(!p.test(Some("a plant")));
        assert!(!p.test(None));
    }

    #[test]
    fn test_pattern_full_match_prefers_longer_alternative() {
        let p = normalize_filter(pattern("a|ab"), "tag").unwrap();
        assert!(p.test(Some("ab")));
    }

    #[test]
    fn test_list_is_disjunction() {
        let spec: FilterSpec = vec![
            FilterSpec::from("PLANT"),
            pattern("(?i)plant"),
            FilterSpec::custom(|s| s.to_lowercase().starts_with("cat")),
        ]
        .into();
        let p = normalize_filter(spec, "tag").unwrap();
        assert!(p.test(Some("PLANT")));
        assert!(p.test(Some("Plant")));
        assert!(p.test(Some("CATALOG")));
        assert!(!p.test(Some("plant2")));
        assert!(!p.test(Some("COMMON")));
    }

    #[test]
    fn test_true_means_non_empty() {
        let p = normalize_filter(true.into(), "text").unwrap();
        assert!(p.test(Some("x")));
        assert!(!p.test(Some("")));
        assert!(!p.test(None));
    }

    #[test]
    fn test_none_and_empty_list_accept_everything() {
        for spec in [FilterSpec::None, FilterSpec::List(Vec::new())] {
            let p = normalize_filter(spec, "tag").unwrap();
            assert!(p.test(Some("anything")));
            assert!(p.test(None));
        }
    }

    #[test]
    fn test_custom_is_used_verbatim() {
        let p = normalize_filter(FilterSpec::custom_opt(|v| v.is_none()), "text").unwrap();
        assert!(p.test(None));
        assert!(!p.test(Some("x")));

        let p = normalize_filter(FilterSpec::custom(|_| true), "text").unwrap();
        assert!(!p.test(None));
    }

    #[test]
    fn test_false_is_rejected() {
        let err = normalize_filter(false.into(), "tag").unwrap_err();
        assert!(matches!(
            err,
            ConditionError::InvalidFilter {
                position: "tag",
                found: "false"
            }
        ));
    }

    #[test]
    fn test_nested_list_is_rejected() {
        let spec = FilterSpec::List(vec![FilterSpec::from(vec!["a", "b"])]);
        assert!(matches!(
            normalize_filter(spec, "tag"),
            Err(ConditionError::NestedList { position: "tag" })
        ));
    }

    #[test]
    fn test_bool_and_none_inside_list_are_rejected() {
        let spec = FilterSpec::List(vec![FilterSpec::from("a"), FilterSpec::Bool(true)]);
        assert!(normalize_filter(spec, "text").is_err());

        let spec = FilterSpec::List(vec![FilterSpec::None]);
        assert!(normalize_filter(spec, "text").is_err());
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            FilterSpec::pattern("("),
            Err(ConditionError::InvalidPattern(_))
        ));
    }
}
