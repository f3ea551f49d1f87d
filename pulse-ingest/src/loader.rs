//! ## pulse-ingest::loader
//! **CSV event store**
//!
//! Reads a headed CSV extract, parses the completion timestamp of each row
//! and builds an immutable [`EventSequence`]. Rows whose timestamp does not
//! parse are dropped without error; extracts from the RIS routinely contain
//! blank or free-text timestamps. Only the final counts show up in the
//! [`LoadReport`].

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use tracing::{debug, info, instrument};

use pulse_core::{Category, Event, EventSequence};

use crate::error::IngestError;
use crate::jitter::{DisplayJitter, NoDisplayJitter};

/// Category assigned to rows with a blank category cell.
pub const UNKNOWN_CATEGORY: &str = "UNKNOWN";

/// Where the fields live in the source and how to read them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    pub timestamp_column: String,
    pub category_column: String,
    /// Tried in order; the first format that parses wins.
    pub timestamp_formats: Vec<String>,
    /// Keep only these categories. Empty keeps everything.
    pub include_categories: Vec<String>,
    pub delimiter: u8,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            timestamp_column: "PROCEDURE_END".into(),
            category_column: "SECTION_CODE".into(),
            timestamp_formats: vec!["%d-%m-%y %H:%M:%S".into(), "%d-%m-%y %H:%M".into()],
            include_categories: Vec::new(),
            delimiter: b',',
        }
    }
}

impl SourceLayout {
    fn parse_timestamp(&self, raw: &str) -> Option<NaiveDateTime> {
        self.timestamp_formats
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    }

    fn keeps(&self, category: &str) -> bool {
        self.include_categories.is_empty()
            || self.include_categories.iter().any(|c| c == category)
    }
}

/// What happened to the raw rows during a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
    /// Rows dropped because the timestamp (or the row itself) was unreadable.
    pub malformed: usize,
    /// Rows dropped by the category filter.
    pub filtered: usize,
    pub loaded: usize,
}

pub struct EventLoader {
    layout: SourceLayout,
    jitter: Box<dyn DisplayJitter>,
}

impl EventLoader {
    pub fn new(layout: SourceLayout) -> Self {
        Self {
            layout,
            jitter: Box::new(NoDisplayJitter),
        }
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: Box<dyn DisplayJitter>) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    /// Loads events from a CSV file.
    ///
    /// # Errors
    /// Missing file, missing column, I/O failures, or
    /// [`CoreError::EmptyDataset`](pulse_core::CoreError::EmptyDataset) when no
    /// row survives parsing.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load_path<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> Result<(EventSequence, LoadReport), IngestError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        self.load_reader(file)
    }

    /// Loads events from any CSV byte stream.
    pub fn load_reader<R: Read>(
        &mut self,
        reader: R,
    ) -> Result<(EventSequence, LoadReport), IngestError> {
        let mut csv = csv::ReaderBuilder::new()
            .delimiter(self.layout.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| IngestError::MissingColumn(name.to_string()))
        };
        let ts_idx = column(&self.layout.timestamp_column)?;
        let cat_idx = column(&self.layout.category_column)?;

        let mut report = LoadReport::default();
        let mut interned: HashMap<String, Category> = HashMap::new();
        let mut events = Vec::new();

        for record in csv.records() {
            report.rows += 1;
            let record = match record {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    debug!("Skipping unreadable row: {e}");
                    report.malformed += 1;
                    continue;
                }
            };

            let Some(completed_at) = record
                .get(ts_idx)
                .and_then(|raw| self.layout.parse_timestamp(raw))
            else {
                report.malformed += 1;
                continue;
            };

            let label = match record.get(cat_idx) {
                Some(label) if !label.is_empty() => label,
                _ => UNKNOWN_CATEGORY,
            };
            if !self.layout.keeps(label) {
                report.filtered += 1;
                continue;
            }

            let category = interned
                .entry(label.to_string())
                .or_insert_with(|| Category::from(label))
                .clone();
            let offset = self.jitter.next_offset_ms();
            events.push(Event::new(completed_at, category).with_display_offset(offset));
        }

        report.loaded = events.len();
        let sequence = EventSequence::new(events)?;
        info!(
            rows = report.rows,
            loaded = report.loaded,
            malformed = report.malformed,
            filtered = report.filtered,
            "Event store loaded"
        );
        Ok((sequence, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jitter::RandomDisplayJitter;
    use chrono::NaiveDate;
    use pulse_core::{count_at, CoreError};
    use std::io::Write;
    use tracing_test::traced_test;

    const EXTRACT: &str = "\
ACCESSION,PROCEDURE_END,SECTION_CODE
A1,01-03-24 09:00:00,CT
A2,01-03-24 09:00:05,MRI
A3,not a date,CT
A4,01-03-24 09:00:05,CT
A5,,US
A6,01-03-24 09:10,CT
A7,02-03-24 07:30:00,
";

    fn load(layout: SourceLayout, input: &str) -> Result<(EventSequence, LoadReport), IngestError> {
        EventLoader::new(layout).load_reader(input.as_bytes())
    }

    #[test]
    fn drops_unparseable_timestamps_and_sorts() {
        let (seq, report) = load(SourceLayout::default(), EXTRACT).unwrap();
        assert_eq!(
            report,
            LoadReport {
                rows: 7,
                malformed: 2,
                filtered: 0,
                loaded: 5,
            }
        );
        assert_eq!(seq.len(), 5);

        let nine = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 5)
            .unwrap();
        assert_eq!(count_at(&seq, nine), 3);
        // Minute-resolution rows parse via the fallback format.
        assert_eq!(
            seq.last_instant_on(nine.date()),
            Some(nine.date().and_hms_opt(9, 10, 0).unwrap())
        );
    }

    #[test]
    fn blank_category_becomes_unknown() {
        let (seq, _) = load(SourceLayout::default(), EXTRACT).unwrap();
        let last = seq.events().last().unwrap();
        assert_eq!(last.category().as_ref(), UNKNOWN_CATEGORY);
    }

    #[test]
    fn category_filter_is_applied_upstream() {
        let layout = SourceLayout {
            include_categories: vec!["CT".into()],
            ..SourceLayout::default()
        };
        let (seq, report) = load(layout, EXTRACT).unwrap();
        assert_eq!(report.filtered, 2);
        assert!(seq.iter().all(|e| e.category().as_ref() == "CT"));
    }

    #[test]
    fn no_parseable_rows_is_an_empty_dataset() {
        let input = "PROCEDURE_END,SECTION_CODE\nyesterday,CT\n,MRI\n";
        match load(SourceLayout::default(), input) {
            Err(IngestError::Core(CoreError::EmptyDataset)) => {}
            other => panic!("expected EmptyDataset, got {other:?}"),
        }
    }

    #[test]
    fn missing_column_is_reported() {
        let input = "END_TIME,SECTION_CODE\n01-03-24 09:00:00,CT\n";
        match load(SourceLayout::default(), input) {
            Err(IngestError::MissingColumn(name)) => assert_eq!(name, "PROCEDURE_END"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn jitter_changes_display_time_only() {
        let (plain, _) = load(SourceLayout::default(), EXTRACT).unwrap();
        let (jittered, _) = EventLoader::new(SourceLayout::default())
            .with_jitter(Box::new(RandomDisplayJitter::seeded(9)))
            .load_reader(EXTRACT.as_bytes())
            .unwrap();

        for (a, b) in plain.iter().zip(jittered.iter()) {
            assert_eq!(a.completed_at(), b.completed_at());
            assert_eq!(a.category(), b.category());
            assert!(b.display_time() >= b.completed_at());
        }
        for instant in plain.iter().map(Event::completed_at) {
            assert_eq!(count_at(&plain, instant), count_at(&jittered, instant));
        }
    }

    #[traced_test]
    #[test]
    fn loads_from_file_and_logs_summary() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(EXTRACT.as_bytes()).unwrap();

        let (seq, _) = EventLoader::new(SourceLayout::default())
            .load_path(file.path())
            .unwrap();
        assert_eq!(seq.len(), 5);
        assert!(logs_contain("Event store loaded"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = EventLoader::new(SourceLayout::default())
            .load_path("/definitely/not/here.csv")
            .unwrap_err();
        assert!(matches!(err, IngestError::FileNotFound(_)));
    }
}
