//! Condition engine: filter normalization, attribute predicates, composite
//! conditions with their matching and retention rules.

mod attrib;
mod composite;
mod filter;
mod spec;

pub use attrib::{normalize_attrib, AttribPredicate, AttribSpec};
pub use composite::{Check, Condition, ConditionRef, EmptyCondition};
pub use filter::{normalize_filter, CustomFn, FilterSpec, Predicate};
pub use spec::{normalize_children, normalize_condition, ConditionFields, ConditionSpec, Placement};
