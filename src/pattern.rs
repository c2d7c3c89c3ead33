//! # Pattern Engine
//!
//! Patterns describe the shape of a message a `receive` is willing to accept. Matching is a
//! pure function from `(pattern, value)` to either the bound captures or no match; it never
//! touches the mailbox.
//!
//! | Pattern | Matches | Binds |
//! |---------|---------|-------|
//! | [`Pattern::Lit`] | an equal value | nothing |
//! | [`Pattern::Kind`] | any value of that runtime type | the value |
//! | [`ANY`] | anything | the value |
//! | [`IGNORE`] | anything | nothing |
//! | [`Pattern::Tuple`] | a tuple of the same arity, element-wise | what the elements bind |
//! | [`Pattern::Guard`] | values the predicate accepts | the value |
//!
//! Rust tuples convert into tuple patterns, strings and numbers into literals, and a
//! [`Kind`] into a typed placeholder, so a call request reads like the message it matches:
//!
//! ```rust
//! use actor_otp::{Kind, Pattern, Value, ANY};
//!
//! let pattern = Pattern::from(("$call", Kind::Ref, Kind::Pid, ANY));
//! assert!(pattern.matches(&Value::from(("$cast", "get"))).is_none());
//! ```

use crate::pid::{Pid, Ref};
use crate::value::{Kind, Value};
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

/// Matches and binds any single value.
pub const ANY: Pattern = Pattern::Any;
/// Matches any single value and binds nothing.
pub const IGNORE: Pattern = Pattern::Ignore;

#[derive(Clone)]
pub enum Pattern {
    Lit(Value),
    Kind(Kind),
    Any,
    Ignore,
    Tuple(Vec<Pattern>),
    Guard(Guard),
}

/// A predicate used as a pattern.
#[derive(Clone)]
pub struct Guard(Arc<dyn Fn(&Value) -> bool + Send + Sync>);

impl Pattern {
    pub fn lit(value: impl Into<Value>) -> Self {
        Pattern::Lit(value.into())
    }

    pub fn of(kind: Kind) -> Self {
        Pattern::Kind(kind)
    }

    pub fn tuple(elements: impl IntoIterator<Item = Pattern>) -> Self {
        Pattern::Tuple(elements.into_iter().collect())
    }

    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Pattern::Guard(Guard(Arc::new(predicate)))
    }

    /// Returns the captures if `value` has this shape.
    pub fn matches(&self, value: &Value) -> Option<Captures> {
        let mut captures = Captures::default();
        self.bind(value, &mut captures).then_some(captures)
    }

    fn bind(&self, value: &Value, captures: &mut Captures) -> bool {
        match self {
            Pattern::Lit(expected) => expected == value,
            Pattern::Kind(kind) => {
                let ok = value.kind() == *kind;
                if ok {
                    captures.0.push(value.clone());
                }
                ok
            }
            Pattern::Any => {
                captures.0.push(value.clone());
                true
            }
            Pattern::Ignore => true,
            Pattern::Tuple(elements) => match value.as_tuple() {
                Some(items) if items.len() == elements.len() => elements
                    .iter()
                    .zip(items)
                    .all(|(pattern, item)| pattern.bind(item, captures)),
                _ => false,
            },
            Pattern::Guard(Guard(predicate)) => {
                let ok = predicate(value);
                if ok {
                    captures.0.push(value.clone());
                }
                ok
            }
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Lit(value) => write!(f, "{value}"),
            Pattern::Kind(kind) => write!(f, "{kind:?}"),
            Pattern::Any => write!(f, "ANY"),
            Pattern::Ignore => write!(f, "_"),
            Pattern::Tuple(elements) => f.debug_tuple("").field(elements).finish(),
            Pattern::Guard(_) => write!(f, "Guard(..)"),
        }
    }
}

/// Values bound by a successful match, in left-to-right order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Captures(Vec<Value>);

impl Captures {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }

    /// Destructures into a fixed number of bindings, or `None` if the count differs.
    pub fn into_array<const N: usize>(self) -> Option<[Value; N]> {
        self.0.try_into().ok()
    }
}

impl Index<usize> for Captures {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.0[index]
    }
}

impl IntoIterator for Captures {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<Kind> for Pattern {
    fn from(kind: Kind) -> Self {
        Pattern::Kind(kind)
    }
}

impl From<Value> for Pattern {
    fn from(value: Value) -> Self {
        Pattern::Lit(value)
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Pattern::Lit(s.into())
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Pattern::Lit(s.into())
    }
}

impl From<i64> for Pattern {
    fn from(n: i64) -> Self {
        Pattern::Lit(n.into())
    }
}

impl From<i32> for Pattern {
    fn from(n: i32) -> Self {
        Pattern::Lit(n.into())
    }
}

impl From<bool> for Pattern {
    fn from(b: bool) -> Self {
        Pattern::Lit(b.into())
    }
}

impl From<Ref> for Pattern {
    fn from(r: Ref) -> Self {
        Pattern::Lit(r.into())
    }
}

impl From<&Pid> for Pattern {
    fn from(pid: &Pid) -> Self {
        Pattern::Lit(pid.into())
    }
}

macro_rules! tuple_into_pattern {
    ($($name:ident),+) => {
        impl<$($name: Into<Pattern>),+> From<($($name,)+)> for Pattern {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                Pattern::Tuple(vec![$($name.into()),+])
            }
        }
    };
}

tuple_into_pattern!(A);
tuple_into_pattern!(A, B);
tuple_into_pattern!(A, B, C);
tuple_into_pattern!(A, B, C, D);
tuple_into_pattern!(A, B, C, D, E);
tuple_into_pattern!(A, B, C, D, E, F);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_matches_only_equal_value() {
        let pattern = Pattern::from("ping");
        assert!(pattern.matches(&Value::from("ping")).is_some_and(|c| c.is_empty()));
        assert!(pattern.matches(&Value::from("pong")).is_none());
        assert!(pattern.matches(&Value::Int(1)).is_none());
    }

    #[test]
    fn test_kind_binds_value_of_that_type() {
        let pattern = Pattern::from(("add", Kind::Int));
        let captures = pattern.matches(&Value::from(("add", 5))).expect("should match");
        assert_eq!(captures.into_vec(), vec![Value::Int(5)]);
        assert!(pattern.matches(&Value::from(("add", "five"))).is_none());
    }

    #[test]
    fn test_any_binds_and_ignore_discards() {
        let pattern = Pattern::from((IGNORE, ANY, IGNORE));
        let captures = pattern
            .matches(&Value::from((1, "kept", 3)))
            .expect("should match");
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0], "kept");
    }

    #[test]
    fn test_tuple_arity_must_match() {
        let pattern = Pattern::from(("$cast", ANY));
        assert!(pattern.matches(&Value::from(("$cast",))).is_none());
        assert!(pattern.matches(&Value::from(("$cast", 1, 2))).is_none());
        assert!(pattern.matches(&Value::from(("$cast", 1))).is_some());
    }

    #[test]
    fn test_captures_are_left_to_right() {
        let pattern = Pattern::from((ANY, ("inner", ANY), Kind::Bool));
        let [a, b, c] = pattern
            .matches(&Value::from((1, ("inner", 2), true)))
            .and_then(Captures::into_array)
            .expect("three bindings");
        assert_eq!(a, Value::Int(1));
        assert_eq!(b, Value::Int(2));
        assert_eq!(c, Value::Bool(true));
    }

    #[test]
    fn test_guard_binds_when_predicate_holds() {
        let pattern = Pattern::when(|v| v.as_int().is_some_and(|n| n > 10));
        assert!(pattern.matches(&Value::Int(5)).is_none());
        let captures = pattern.matches(&Value::Int(42)).expect("should match");
        assert_eq!(captures[0], Value::Int(42));
    }

    #[test]
    fn test_partial_captures_do_not_leak_on_failure() {
        let pattern = Pattern::from((ANY, "tag"));
        assert!(pattern.matches(&Value::from((1, "other"))).is_none());
    }
}
