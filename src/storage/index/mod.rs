pub mod generic_key;
pub mod int_comparator;

use std::cmp::Ordering;

/// Key comparison for index pages. Two keys are equal when `compare`
/// returns `Ordering::Equal`; the index never relies on more than that.
pub trait Comparator<K>: Clone + Send + Sync {
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering;
}
