//! Attribute predicates: a set of key to filter pairs that must all hold.

use super::filter::{normalize_filter, FilterSpec, Predicate};
use crate::error::ConditionError;
use crate::xml::Attributes;

/// Attribute constraints as written by the caller.
///
/// An empty spec constrains nothing.
#[derive(Debug, Clone, Default)]
pub struct AttribSpec {
    entries: Vec<(String, FilterSpec)>,
}

impl AttribSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key` to be present with a value accepted by `filter`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, filter: impl Into<FilterSpec>) -> Self {
        self.entries.push((key.into(), filter.into()));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, F: Into<FilterSpec>> FromIterator<(K, F)> for AttribSpec {
    fn from_iter<I: IntoIterator<Item = (K, F)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, filter)| (key.into(), filter.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, F: Into<FilterSpec>> From<Vec<(K, F)>> for AttribSpec {
    fn from(entries: Vec<(K, F)>) -> Self {
        entries.into_iter().collect()
    }
}

/// Conjunction of per-attribute predicates.
#[derive(Debug, Clone, Default)]
pub struct AttribPredicate {
    entries: Vec<(String, Predicate)>,
}

impl AttribPredicate {
    /// True when every key is present and its value passes its predicate.
    ///
    /// A missing attribute map only passes an empty predicate.
    #[must_use]
    pub fn test(&self, attrib: Option<&Attributes>) -> bool {
        if self.entries.is_empty() {
            return true;
        }
        let Some(attrib) = attrib else {
            return false;
        };
        self.entries.iter().all(|(key, predicate)| {
            attrib
                .get(key)
                .is_some_and(|value| predicate.test(Some(value)))
        })
    }
}

/// Normalize an attribute spec.
///
/// # Errors
/// * `ConditionError::AttributeAbsence` when a value is `false`
/// * Any error of [`normalize_filter`] for a value
pub fn normalize_attrib(spec: AttribSpec) -> Result<AttribPredicate, ConditionError> {
    let entries = spec
        .entries
        .into_iter()
        .map(|(key, filter)| {
            if matches!(filter, FilterSpec::Bool(false)) {
                return Err(ConditionError::AttributeAbsence { key });
            }
            let predicate = normalize_filter(filter, "attribute")?;
            Ok((key, predicate))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AttribPredicate { entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_empty_spec_accepts_anything() {
        let p = normalize_attrib(AttribSpec::new()).unwrap();
        assert!(p.test(None));
        assert!(p.test(Some(&attrs(&[("a", "1")]))));
    }

    #[test]
    fn test_all_keys_must_match() {
        let spec = AttribSpec::new()
            .with("participantFK", FilterSpec::pattern(r"\d+").unwrap())
            .with("role", "home");
        let p = normalize_attrib(spec).unwrap();

        assert!(p.test(Some(&attrs(&[("participantFK", "12"), ("role", "home")]))));
        assert!(!p.test(Some(&attrs(&[("participantFK", "ab"), ("role", "home")]))));
        assert!(!p.test(Some(&attrs(&[("participantFK", "12")]))));
        assert!(!p.test(None));
    }

    #[test]
    fn test_missing_key_fails_even_without_filter() {
        let spec = AttribSpec::new().with("id", FilterSpec::None);
        let p = normalize_attrib(spec).unwrap();
        assert!(p.test(Some(&attrs(&[("id", "")]))));
        assert!(!p.test(Some(&attrs(&[("other", "1")]))));
    }

    #[test]
    fn test_true_requires_non_empty_value() {
        let spec: AttribSpec = vec![("id", true)].into();
        let p = normalize_attrib(spec).unwrap();
        assert!(p.test(Some(&attrs(&[("id", "x")]))));
        assert!(!p.test(Some(&attrs(&[("id", "")]))));
    }

    #[test]
    fn test_false_value_is_rejected() {
        let spec: AttribSpec = vec![("id", false)].into();
        let err = normalize_attrib(spec).unwrap_err();
        assert!(matches!(err, ConditionError::AttributeAbsence { key } if key == "id"));
    }

    #[test]
    fn test_list_value_is_disjunction() {
        let spec = AttribSpec::new().with("lang", vec!["en", "nl"]);
        let p = normalize_attrib(spec).unwrap();
        assert!(p.test(Some(&attrs(&[("lang", "nl")]))));
        assert!(!p.test(Some(&attrs(&[("lang", "de")]))));
    }
}
