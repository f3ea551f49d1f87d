//! ## pulse-core::counter
//! **Point-in-time counting**
//!
//! All queries use an inclusive upper bound: an event completed exactly at
//! `instant` is counted. Totals are a single binary search over the sequence;
//! per-category counts are one binary search per category column.

use std::collections::btree_map;
use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::event::{Category, EventSequence};

/// Per-category counts, ordered by category name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryCounts(BTreeMap<Category, u64>);

impl CategoryCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for `category`; categories never seen count as zero.
    pub fn get(&self, category: &str) -> u64 {
        self.0.get(category).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, category: &Category) {
        match self.0.get_mut(category) {
            Some(count) => *count += 1,
            None => {
                self.0.insert(category.clone(), 1);
            }
        }
    }

    pub fn insert(&mut self, category: Category, count: u64) {
        self.0.insert(category, count);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.0.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Category, u64> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a CategoryCounts {
    type Item = (&'a Category, &'a u64);
    type IntoIter = btree_map::Iter<'a, Category, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(Category, u64)> for CategoryCounts {
    fn from_iter<I: IntoIterator<Item = (Category, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Index one past the last event completed at or before `instant`.
#[inline]
pub fn prefix_len(sequence: &EventSequence, instant: NaiveDateTime) -> usize {
    sequence
        .events()
        .partition_point(|event| event.completed_at() <= instant)
}

/// Number of events completed at or before `instant`.
#[inline]
pub fn count_at(sequence: &EventSequence, instant: NaiveDateTime) -> u64 {
    prefix_len(sequence, instant) as u64
}

/// Events completed at or before `instant`, partitioned by category.
///
/// Only categories with at least one qualifying event appear in the result.
pub fn count_by_category_at(sequence: &EventSequence, instant: NaiveDateTime) -> CategoryCounts {
    sequence
        .category_columns()
        .filter_map(|(category, times)| {
            let count = times.partition_point(|t| *t <= instant) as u64;
            (count > 0).then(|| (category.clone(), count))
        })
        .collect()
}
