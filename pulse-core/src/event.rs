//! ## pulse-core::event
//! **Immutable, time-ordered event sequences**
//!
//! An [`EventSequence`] is built once from loaded records and never changes.
//! Events are stably sorted by completion time, so events sharing a timestamp
//! keep their insertion order. Alongside the events the sequence keeps one
//! sorted timestamp column per category, which lets the counter answer
//! per-category questions with a binary search per category instead of a
//! prefix scan.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta, Timelike};

use crate::error::CoreError;

/// Procedure category (section code). Open-ended: any label seen in the data
/// is a valid category.
pub type Category = Arc<str>;

/// A single completed procedure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Completion time, truncated to whole seconds.
    completed_at: NaiveDateTime,
    category: Category,
    /// Sub-second offset used only when charting. Never counted.
    display_offset_ms: u16,
}

impl Event {
    pub fn new(completed_at: NaiveDateTime, category: impl Into<Category>) -> Self {
        Self {
            completed_at: completed_at.with_nanosecond(0).unwrap_or(completed_at),
            category: category.into(),
            display_offset_ms: 0,
        }
    }

    /// Attaches a display-only offset. Values of a second or more are folded
    /// back below one second so the event never crosses into the next second.
    #[must_use]
    pub fn with_display_offset(mut self, offset_ms: u16) -> Self {
        self.display_offset_ms = offset_ms % 1000;
        self
    }

    #[inline]
    pub fn completed_at(&self) -> NaiveDateTime {
        self.completed_at
    }

    #[inline]
    pub fn category(&self) -> &Category {
        &self.category
    }

    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.completed_at.date()
    }

    pub fn display_offset_ms(&self) -> u16 {
        self.display_offset_ms
    }

    /// Completion time including the display offset.
    pub fn display_time(&self) -> NaiveDateTime {
        self.completed_at + TimeDelta::milliseconds(i64::from(self.display_offset_ms))
    }
}

/// Number of events recorded on one calendar date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateCount {
    pub date: NaiveDate,
    pub count: usize,
}

#[derive(Debug)]
struct Inner {
    events: Vec<Event>,
    by_category: BTreeMap<Category, Vec<NaiveDateTime>>,
    first: NaiveDateTime,
    last: NaiveDateTime,
}

/// Sorted, immutable collection of events. Cloning is cheap (shared handle).
#[derive(Clone, Debug)]
pub struct EventSequence {
    inner: Arc<Inner>,
}

impl EventSequence {
    /// Builds a sequence from events in any order.
    ///
    /// # Errors
    /// [`CoreError::EmptyDataset`] if `events` is empty.
    pub fn new(mut events: Vec<Event>) -> Result<Self, CoreError> {
        // Stable: equal timestamps keep insertion order.
        events.sort_by_key(Event::completed_at);
        Self::from_sorted(events)
    }

    fn from_sorted(events: Vec<Event>) -> Result<Self, CoreError> {
        let (first, last) = match (events.first(), events.last()) {
            (Some(first), Some(last)) => (first.completed_at, last.completed_at),
            _ => return Err(CoreError::EmptyDataset),
        };

        let mut by_category: BTreeMap<Category, Vec<NaiveDateTime>> = BTreeMap::new();
        for event in &events {
            by_category
                .entry(event.category.clone())
                .or_default()
                .push(event.completed_at);
        }

        tracing::debug!(
            events = events.len(),
            categories = by_category.len(),
            %first,
            %last,
            "Built event sequence"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                events,
                by_category,
                first,
                last,
            }),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.events.len()
    }

    /// Always `false`; an empty sequence cannot be constructed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.events.is_empty()
    }

    #[inline]
    pub fn events(&self) -> &[Event] {
        &self.inner.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.inner.events.iter()
    }

    pub fn first_instant(&self) -> NaiveDateTime {
        self.inner.first
    }

    pub fn last_instant(&self) -> NaiveDateTime {
        self.inner.last
    }

    /// Every category present, in name order.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.inner.by_category.keys()
    }

    pub(crate) fn category_columns(
        &self,
    ) -> impl Iterator<Item = (&Category, &[NaiveDateTime])> {
        self.inner
            .by_category
            .iter()
            .map(|(category, times)| (category, times.as_slice()))
    }

    /// Calendar dates present in the data with their event counts, ascending.
    pub fn available_dates(&self) -> Vec<DateCount> {
        let mut dates: Vec<DateCount> = Vec::new();
        for event in self.iter() {
            match dates.last_mut() {
                Some(last) if last.date == event.date() => last.count += 1,
                _ => dates.push(DateCount {
                    date: event.date(),
                    count: 1,
                }),
            }
        }
        dates
    }

    fn date_bounds(&self, date: NaiveDate) -> (usize, usize) {
        let events = self.events();
        let start = events.partition_point(|e| e.date() < date);
        let end = events.partition_point(|e| e.date() <= date);
        (start, end)
    }

    /// Extracts the events of a single calendar day.
    ///
    /// # Errors
    /// [`CoreError::NoEventsForDate`] if nothing was recorded on `date`.
    pub fn for_date(&self, date: NaiveDate) -> Result<Self, CoreError> {
        let (start, end) = self.date_bounds(date);
        if start == end {
            return Err(CoreError::NoEventsForDate(date));
        }
        Self::from_sorted(self.events()[start..end].to_vec())
    }

    /// Timestamp of the first event recorded on `date`, if any.
    pub fn first_instant_on(&self, date: NaiveDate) -> Option<NaiveDateTime> {
        let (start, end) = self.date_bounds(date);
        (start < end).then(|| self.events()[start].completed_at)
    }

    /// Timestamp of the last event recorded on `date`, if any.
    pub fn last_instant_on(&self, date: NaiveDate) -> Option<NaiveDateTime> {
        let (start, end) = self.date_bounds(date);
        (start < end).then(|| self.events()[end - 1].completed_at)
    }
}

impl<'a> IntoIterator for &'a EventSequence {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
