//! Per-policy restrictiveness orderings
//!
//! "Strictest" has no universal meaning: disabling a feature is stricter for
//! a state policy, a larger number is stricter for a minimum password length,
//! and a smaller number is stricter for a maximum failed-attempt count. Every
//! policy therefore carries its own [`Comparator`].

use std::cmp::Ordering;

use crate::value::PolicyValue;

/// Orders two values of the same policy by restrictiveness.
///
/// `Ordering::Less` means `a` is more restrictive than `b`. Implementations
/// must be total over values of the policy's kind.
pub trait Comparator: Send + Sync {
    fn compare(&self, a: &PolicyValue, b: &PolicyValue) -> Ordering;
}

/// Allow/deny style policies.
///
/// Any value other than the policy's default restricts the feature and ranks
/// stricter than the default. Among restricting values, lower integers and
/// `false` are stricter. Without a default, plain lower-is-stricter applies.
#[derive(Debug, Clone, Default)]
pub struct StateComparator {
    default: Option<PolicyValue>,
}

impl StateComparator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rank `default` as the least restrictive value
    pub fn with_default(default: impl Into<PolicyValue>) -> Self {
        Self {
            default: Some(default.into()),
        }
    }

    fn is_default(&self, value: &PolicyValue) -> bool {
        self.default.as_ref() == Some(value)
    }
}

impl Comparator for StateComparator {
    fn compare(&self, a: &PolicyValue, b: &PolicyValue) -> Ordering {
        match (self.is_default(a), self.is_default(b)) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
        match (a, b) {
            (PolicyValue::Int(a), PolicyValue::Int(b)) => a.cmp(b),
            (PolicyValue::Bool(a), PolicyValue::Bool(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Smaller integers are more restrictive (e.g. maximum failed attempts).
#[derive(Debug, Clone, Copy, Default)]
pub struct MinimizeIntegerComparator;

impl Comparator for MinimizeIntegerComparator {
    fn compare(&self, a: &PolicyValue, b: &PolicyValue) -> Ordering {
        match (a.as_int(), b.as_int()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => Ordering::Equal,
        }
    }
}

/// Larger integers are more restrictive (e.g. minimum password length).
#[derive(Debug, Clone, Copy, Default)]
pub struct MaximizeIntegerComparator;

impl Comparator for MaximizeIntegerComparator {
    fn compare(&self, a: &PolicyValue, b: &PolicyValue) -> Ordering {
        match (a.as_int(), b.as_int()) {
            (Some(a), Some(b)) => b.cmp(&a),
            _ => Ordering::Equal,
        }
    }
}

/// Adapts a closure into a [`Comparator`]
pub struct FnComparator<F>(pub F);

impl<F> Comparator for FnComparator<F>
where
    F: Fn(&PolicyValue, &PolicyValue) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &PolicyValue, b: &PolicyValue) -> Ordering {
        (self.0)(a, b)
    }
}

/// Fold `values` down to the most restrictive one.
///
/// On ties the earliest value wins, so callers control tie-breaking through
/// iteration order. Returns `None` for an empty iterator.
pub fn strictest_of<'a, I>(comparator: &dyn Comparator, values: I) -> Option<&'a PolicyValue>
where
    I: IntoIterator<Item = &'a PolicyValue>,
{
    values.into_iter().fold(None, |best, candidate| match best {
        Some(best) if comparator.compare(candidate, best) != Ordering::Less => Some(best),
        _ => Some(candidate),
    })
}
