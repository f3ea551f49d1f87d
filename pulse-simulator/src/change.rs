//! Change detection between consecutive category tallies.
//!
//! Drives the transient highlight on category tiles. It never feeds back
//! into any count.

use std::collections::BTreeSet;

use pulse_core::{Category, CategoryCounts};

/// Categories whose count strictly increased from `previous` to `current`.
///
/// Missing keys count as zero on either side. A key present only in
/// `previous` has a current count of zero and so cannot have increased.
pub fn diff(previous: &CategoryCounts, current: &CategoryCounts) -> BTreeSet<Category> {
    current
        .iter()
        .filter(|(category, count)| **count > previous.get(category))
        .map(|(category, _)| category.clone())
        .collect()
}
