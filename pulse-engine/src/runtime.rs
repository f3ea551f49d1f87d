//! Replay runtime - owns the loop around a [`ReplaySession`].
//!
//! Live mode ticks on a tokio interval against a [`WallClock`] until Ctrl-C
//! or `replay.max_ticks`. Sweep mode fast-forwards one day on a virtual clock
//! and can check the resulting state hash against a known value.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::FixedOffset;
use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use pulse_config::{CountingStrategy, IngestConfig, PulseConfig};
use pulse_core::time::{SystemClock, WallClock};
use pulse_core::{CoreError, DateCount, EventSequence};
use pulse_ingest::{EventLoader, LoadReport, RandomDisplayJitter, SourceLayout};
use pulse_simulator::{
    sweep_with, CountStrategy, CursorCounter, ReplayAnchor, ReplaySession, Snapshot,
    SpeedFactor, StatelessCounter, SweepOutcome, TimeSeries,
};
use pulse_telemetry::{EventLogger, MetricsRecorder};

use crate::diagnostics::{DiagnosticsCollector, HashMismatchReport};
use crate::error::EngineError;
use crate::sink::{ArrivalsCsvSink, SeriesCsvSink, SnapshotSink};

/// Why a live run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxTicks,
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub ticks: u64,
    pub final_snapshot: Option<Snapshot>,
    pub series: TimeSeries,
    pub stopped_by: StopReason,
}

pub struct ReplayRuntime {
    config: Arc<PulseConfig>,
    metrics: Arc<MetricsRecorder>,
    diagnostics: Mutex<DiagnosticsCollector>,
    sinks: Vec<Box<dyn SnapshotSink>>,
}

impl ReplayRuntime {
    /// Builds a runtime for an already validated configuration.
    ///
    /// A [`SeriesCsvSink`] is registered when `display.series_out` is set and
    /// an [`ArrivalsCsvSink`] when `display.arrivals_out` is.
    pub fn new(config: PulseConfig) -> Result<Self, EngineError> {
        let metrics = Arc::new(MetricsRecorder::new()?);

        let mut sinks: Vec<Box<dyn SnapshotSink>> = Vec::new();
        if let Some(path) = &config.display.series_out {
            sinks.push(Box::new(SeriesCsvSink::new(path.clone())));
        }
        if let Some(path) = &config.display.arrivals_out {
            sinks.push(Box::new(ArrivalsCsvSink::create(path.clone())?));
        }

        debug!("Replay config: {:?}", config.replay);
        Ok(Self {
            config: Arc::new(config),
            metrics,
            diagnostics: Mutex::new(DiagnosticsCollector::default()),
            sinks,
        })
    }

    #[must_use]
    pub fn with_sink(mut self, sink: impl SnapshotSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Directory for bug reports written on hash mismatches.
    #[must_use]
    pub fn with_report_dir(self, dir: impl Into<std::path::PathBuf>) -> Self {
        *self.diagnostics.lock() = DiagnosticsCollector::new(dir);
        self
    }

    pub fn config(&self) -> &PulseConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<MetricsRecorder> {
        self.metrics.clone()
    }

    /// Loads the configured extract.
    #[instrument(skip(self))]
    pub fn load_events(&self) -> Result<(EventSequence, LoadReport), EngineError> {
        let ingest = &self.config.ingest;
        let path = ingest.data_path.as_ref().ok_or(EngineError::MissingDataPath)?;

        let mut loader = EventLoader::new(source_layout(ingest)?);
        if ingest.display_jitter {
            let jitter = match ingest.jitter_seed {
                Some(seed) => RandomDisplayJitter::seeded(seed),
                None => RandomDisplayJitter::from_entropy(),
            };
            loader = loader.with_jitter(Box::new(jitter));
        }
        Ok(loader.load_path(path)?)
    }

    /// Dates present in the configured extract, earliest first.
    pub fn list_dates(&self) -> Result<Vec<DateCount>, EngineError> {
        let (events, _) = self.load_events()?;
        Ok(events.available_dates())
    }

    /// The configured replay date, or the earliest date in `events`.
    pub fn anchor(&self, events: &EventSequence) -> Result<ReplayAnchor, EngineError> {
        let replay_date = match self.config.replay.replay_date {
            Some(date) => date,
            None => events
                .available_dates()
                .first()
                .map(|d| d.date)
                .ok_or(CoreError::EmptyDataset)?,
        };
        Ok(ReplayAnchor::new(
            replay_date,
            self.config.replay.baseline_offset,
        ))
    }

    /// Wall clock for live runs: the configured UTC offset, else local time.
    pub fn system_clock(&self) -> Result<SystemClock, EngineError> {
        match self.config.replay.utc_offset_minutes {
            None => Ok(SystemClock::local()),
            Some(minutes) => FixedOffset::east_opt(minutes * 60)
                .map(SystemClock::with_utc_offset)
                .ok_or(EngineError::InvalidUtcOffset(minutes)),
        }
    }

    /// Replays `events` at wall-clock pace.
    pub async fn run_live<C>(
        &mut self,
        events: &EventSequence,
        clock: &C,
    ) -> Result<RunSummary, EngineError>
    where
        C: WallClock + ?Sized,
    {
        match self.config.replay.strategy {
            CountingStrategy::Cursor => self.run_live_with::<CursorCounter, C>(events, clock).await,
            CountingStrategy::Stateless => {
                self.run_live_with::<StatelessCounter, C>(events, clock).await
            }
        }
    }

    #[instrument(level = "info", name = "run_live", skip_all, fields(strategy = ?self.config.replay.strategy))]
    async fn run_live_with<S, C>(
        &mut self,
        events: &EventSequence,
        clock: &C,
    ) -> Result<RunSummary, EngineError>
    where
        S: CountStrategy,
        C: WallClock + ?Sized,
    {
        let replay = &self.config.replay;
        let anchor = self.anchor(events)?;
        let speed = SpeedFactor::new(replay.speed_factor)?;
        let mut session: ReplaySession<S> =
            ReplaySession::start(events, anchor, clock.now(), speed)?;

        EventLogger::log_event(
            "replay_started",
            vec![
                ("replay_date", anchor.replay_date.to_string()),
                ("baseline_offset", anchor.baseline_offset.to_string()),
                ("speed_factor", speed.get().to_string()),
                ("simulated_start", session.clock().simulated_start().to_string()),
            ],
        )
        .await;

        let mut interval = tokio::time::interval(Duration::from_secs(replay.tick_interval_seconds));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let max_ticks = replay.max_ticks;

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        let stopped_by = loop {
            if max_ticks.is_some_and(|max| session.ticks() >= max) {
                break StopReason::MaxTicks;
            }

            tokio::select! {
                _ = interval.tick() => {}
                signal = &mut shutdown => {
                    if let Err(e) = signal {
                        warn!("Ctrl-C listener failed: {e}");
                    }
                    info!("Interrupted, stopping replay");
                    break StopReason::Interrupted;
                }
            }

            let started = Instant::now();
            let output = session.tick(clock.now())?;
            self.metrics.record_tick(
                started.elapsed(),
                output.snapshot.today_count,
                output.snapshot.total_count,
                output.changed.len(),
            );
            for sink in &mut self.sinks {
                sink.on_tick(&output)?;
            }
        };

        self.finish_sinks(session.series())?;

        let final_snapshot = session.latest().cloned();
        EventLogger::log_event(
            "replay_stopped",
            vec![
                ("ticks", session.ticks().to_string()),
                ("reason", format!("{stopped_by:?}")),
                (
                    "total_count",
                    final_snapshot
                        .as_ref()
                        .map_or(anchor.baseline_offset, |s| s.total_count)
                        .to_string(),
                ),
            ],
        )
        .await;

        Ok(RunSummary {
            ticks: session.ticks(),
            final_snapshot,
            series: session.series().clone(),
            stopped_by,
        })
    }

    /// Fast-forwards the replay date in `replay.sweep_step_seconds` steps.
    ///
    /// With `validate_hash`, a differing state hash writes a bug report and
    /// fails with [`EngineError::HashMismatch`].
    #[instrument(level = "info", name = "run_sweep", skip(self, events))]
    pub fn run_sweep(
        &mut self,
        events: &EventSequence,
        validate_hash: Option<&str>,
    ) -> Result<SweepOutcome, EngineError> {
        let anchor = self.anchor(events)?;
        let step = Duration::from_secs(self.config.replay.sweep_step_seconds);

        let outcome = match self.config.replay.strategy {
            CountingStrategy::Cursor => self.sweep_with_strategy::<CursorCounter>(events, anchor, step)?,
            CountingStrategy::Stateless => {
                self.sweep_with_strategy::<StatelessCounter>(events, anchor, step)?
            }
        };
        self.finish_sinks(&outcome.series)?;

        if let Some(expected) = validate_hash {
            self.check_hash(anchor, &outcome, expected)?;
        }
        Ok(outcome)
    }

    fn sweep_with_strategy<S: CountStrategy>(
        &mut self,
        events: &EventSequence,
        anchor: ReplayAnchor,
        step: Duration,
    ) -> Result<SweepOutcome, EngineError> {
        let metrics = &self.metrics;
        let sinks = &mut self.sinks;

        sweep_with::<S, EngineError, _>(events, anchor, step, |output| {
            metrics.record_snapshot(
                output.snapshot.today_count,
                output.snapshot.total_count,
                output.changed.len(),
            );
            sinks.iter_mut().try_for_each(|sink| sink.on_tick(output))
        })
    }

    fn check_hash(
        &self,
        anchor: ReplayAnchor,
        outcome: &SweepOutcome,
        expected: &str,
    ) -> Result<(), EngineError> {
        if expected.eq_ignore_ascii_case(&outcome.state_hash) {
            info!("State hash validated");
            return Ok(());
        }
        error!(expected, actual = %outcome.state_hash, "State hash mismatch");

        let report = HashMismatchReport {
            data_path: self.config.ingest.data_path.clone(),
            replay_date: anchor.replay_date,
            baseline_offset: anchor.baseline_offset,
            step_seconds: self.config.replay.sweep_step_seconds,
            strategy: self.config.replay.strategy,
            ticks: outcome.ticks,
            expected: expected.to_string(),
            actual: outcome.state_hash.clone(),
        };
        let report = match self.diagnostics.lock().record_bug_report(&report) {
            Ok(path) => {
                error!("Bug report saved to: {}", path.display());
                Some(path)
            }
            Err(e) => {
                error!("Failed to write bug report: {e}");
                None
            }
        };

        Err(EngineError::HashMismatch {
            expected: expected.to_string(),
            actual: outcome.state_hash.clone(),
            report,
        })
    }

    fn finish_sinks(&mut self, series: &TimeSeries) -> Result<(), EngineError> {
        for sink in &mut self.sinks {
            sink.finish(series)?;
        }
        Ok(())
    }
}

fn source_layout(ingest: &IngestConfig) -> Result<SourceLayout, EngineError> {
    let delimiter =
        u8::try_from(ingest.delimiter).map_err(|_| EngineError::InvalidDelimiter(ingest.delimiter))?;
    Ok(SourceLayout {
        timestamp_column: ingest.timestamp_column.clone(),
        category_column: ingest.category_column.clone(),
        timestamp_formats: ingest.timestamp_formats.clone(),
        include_categories: ingest.include_categories.clone(),
        delimiter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
    use pulse_simulator::TickOutput;
    use std::io::Write;
    use std::path::Path;
    use tracing_test::traced_test;

    const EXTRACT: &str = "\
ACCESSION,PROCEDURE_END,SECTION_CODE
A1,01-03-24 09:00:00,CT
A2,01-03-24 09:00:05,MRI
A3,01-03-24 09:00:05,CT
A4,01-03-24 09:10,CT
A5,not a date,US
A6,02-03-24 08:00:00,US
";

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn write_extract(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("extract.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(EXTRACT.as_bytes()).unwrap();
        path
    }

    fn config(data: &Path) -> PulseConfig {
        let mut config = PulseConfig::default();
        config.ingest.data_path = Some(data.to_path_buf());
        config.replay.baseline_offset = 100;
        config
    }

    /// Wall clock driven by tokio's (pausable) timer.
    struct TokioClock {
        base: NaiveDateTime,
        start: tokio::time::Instant,
    }

    impl WallClock for TokioClock {
        fn now(&self) -> NaiveDateTime {
            self.base + TimeDelta::from_std(self.start.elapsed()).unwrap_or(TimeDelta::zero())
        }
    }

    #[test]
    fn loads_and_defaults_to_earliest_date() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = ReplayRuntime::new(config(&write_extract(dir.path()))).unwrap();

        let (events, report) = runtime.load_events().unwrap();
        assert_eq!(report.malformed, 1);
        assert_eq!(events.len(), 5);
        assert_eq!(runtime.anchor(&events).unwrap(), ReplayAnchor::new(day(), 100));

        let dates = runtime.list_dates().unwrap();
        assert_eq!(dates.len(), 2);
        assert_eq!((dates[0].date, dates[0].count), (day(), 4));
    }

    #[test]
    fn missing_data_path_is_reported() {
        let runtime = ReplayRuntime::new(PulseConfig::default()).unwrap();
        assert!(matches!(
            runtime.load_events(),
            Err(EngineError::MissingDataPath)
        ));
    }

    #[test]
    fn sweep_feeds_sinks_and_exports_series() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&write_extract(dir.path()));
        let series_path = dir.path().join("series.csv");
        config.display.series_out = Some(series_path.clone());
        config.replay.sweep_step_seconds = 60;

        let recorder = RecordingSink::new();
        let mut runtime = ReplayRuntime::new(config).unwrap().with_sink(recorder.clone());
        let (events, _) = runtime.load_events().unwrap();
        let outcome = runtime.run_sweep(&events, None).unwrap();

        // 09:00 through 09:10 in one-minute steps.
        assert_eq!(outcome.ticks, 11);
        assert_eq!(recorder.len(), 11);
        assert_eq!(outcome.final_snapshot.total_count, 104);
        assert_eq!(recorder.finished_series(), Some(outcome.series.clone()));
        assert_eq!(runtime.metrics().ticks.get(), 11);

        let exported = std::fs::read_to_string(series_path).unwrap();
        assert_eq!(exported.lines().count(), 12);
        assert!(exported.ends_with("2024-03-01 09:10:00,104\n"));
    }

    #[test]
    fn sweep_hash_is_stable_across_strategies() {
        let dir = tempfile::tempdir().unwrap();
        let data = write_extract(dir.path());

        let mut cursor = ReplayRuntime::new(config(&data)).unwrap();
        let (events, _) = cursor.load_events().unwrap();
        let expected = cursor.run_sweep(&events, None).unwrap().state_hash;

        let mut stateless_config = config(&data);
        stateless_config.replay.strategy = CountingStrategy::Stateless;
        let mut stateless = ReplayRuntime::new(stateless_config).unwrap();
        let outcome = stateless
            .run_sweep(&events, Some(&expected.to_uppercase()))
            .unwrap();
        assert_eq!(outcome.state_hash, expected);
    }

    /// Accepts `limit - 1` ticks, then fails.
    struct FailingSink {
        seen: u64,
        limit: u64,
    }

    impl SnapshotSink for FailingSink {
        fn on_tick(&mut self, _output: &TickOutput) -> Result<(), EngineError> {
            self.seen += 1;
            if self.seen == self.limit {
                return Err(EngineError::Sink {
                    sink: "failing",
                    source: std::io::Error::other("disk full"),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn sink_error_stops_the_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&write_extract(dir.path()));
        config.replay.sweep_step_seconds = 60;

        let recorder = RecordingSink::new();
        let mut runtime = ReplayRuntime::new(config)
            .unwrap()
            .with_sink(recorder.clone())
            .with_sink(FailingSink { seen: 0, limit: 3 });
        let (events, _) = runtime.load_events().unwrap();

        let result = runtime.run_sweep(&events, None);
        assert!(matches!(
            result,
            Err(EngineError::Sink { sink: "failing", .. })
        ));
        // The sweep would take 11 ticks; it must stop at the failing one.
        assert_eq!(recorder.len(), 3);
        assert_eq!(runtime.metrics().ticks.get(), 3);
        assert_eq!(recorder.finished_series(), None);
    }

    #[test]
    fn arrivals_export_carries_display_jitter() {
        let dir = tempfile::tempdir().unwrap();
        let data = write_extract(dir.path());

        let export = |jitter: bool, name: &str| {
            let mut config = config(&data);
            let path = dir.path().join(name);
            config.ingest.display_jitter = jitter;
            config.ingest.jitter_seed = Some(9);
            config.display.arrivals_out = Some(path.clone());
            let mut runtime = ReplayRuntime::new(config).unwrap();
            let (events, _) = runtime.load_events().unwrap();
            let outcome = runtime.run_sweep(&events, None).unwrap();
            (outcome.state_hash, std::fs::read_to_string(path).unwrap())
        };

        let (plain_hash, plain) = export(false, "plain.csv");
        let (jittered_hash, jittered) = export(true, "jittered.csv");

        assert_eq!(
            plain,
            "display_time,category,total_count\n\
             2024-03-01 09:00:00.000,CT,101\n\
             2024-03-01 09:00:05.000,MRI,102\n\
             2024-03-01 09:00:05.000,CT,103\n\
             2024-03-01 09:10:00.000,CT,104\n"
        );
        assert_ne!(plain, jittered);

        // Jitter moves only the display times; counts and the state hash hold.
        let totals = |csv: &str| -> Vec<String> {
            csv.lines()
                .map(|line| line.rsplit(',').next().unwrap().to_string())
                .collect()
        };
        assert_eq!(totals(&plain), totals(&jittered));
        assert_eq!(plain_hash, jittered_hash);
        for (plain_row, jittered_row) in plain.lines().zip(jittered.lines()).skip(1) {
            assert_eq!(&plain_row[..19], &jittered_row[..19]);
        }
    }

    #[test]
    #[traced_test]
    fn hash_mismatch_writes_a_bug_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = ReplayRuntime::new(config(&write_extract(dir.path())))
            .unwrap()
            .with_report_dir(dir.path());
        let (events, _) = runtime.load_events().unwrap();

        let (expected, report) = match runtime.run_sweep(&events, Some("deadbeef")) {
            Err(EngineError::HashMismatch {
                expected, report, ..
            }) => (expected, report),
            other => panic!("expected a hash mismatch, got {other:?}"),
        };
        assert_eq!(expected, "deadbeef");
        let report = std::fs::read_to_string(report.unwrap()).unwrap();
        assert!(report.contains("expected: deadbeef"));
        assert!(report.contains("baseline_offset: 100"));

        assert!(logs_contain("State hash mismatch"));
        assert!(logs_contain("Bug report saved to:"));
    }

    #[tokio::test(start_paused = true)]
    async fn live_run_stops_after_max_ticks() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&write_extract(dir.path()));
        config.replay.speed_factor = 5.0;
        config.replay.max_ticks = Some(4);

        let recorder = RecordingSink::new();
        let mut runtime = ReplayRuntime::new(config).unwrap().with_sink(recorder.clone());
        let (events, _) = runtime.load_events().unwrap();

        let clock = TokioClock {
            base: NaiveDate::from_ymd_opt(2025, 6, 10)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            start: tokio::time::Instant::now(),
        };
        let summary = runtime.run_live(&events, &clock).await.unwrap();

        assert_eq!(summary.stopped_by, StopReason::MaxTicks);
        assert_eq!(summary.ticks, 4);
        let today: Vec<u64> = recorder
            .outputs()
            .iter()
            .map(|o| o.snapshot.today_count)
            .collect();
        // Simulated 09:00:00, :05, :10, :15 at five simulated seconds per tick.
        assert_eq!(today, vec![1, 3, 3, 3]);
        assert_eq!(summary.final_snapshot.map(|s| s.total_count), Some(103));
        assert_eq!(runtime.metrics().tick_latency.get_sample_count(), 4);
    }

    #[test]
    fn utc_offset_clock() {
        let mut config = PulseConfig::default();
        config.replay.utc_offset_minutes = Some(180);
        let runtime = ReplayRuntime::new(config).unwrap();
        assert!(runtime.system_clock().is_ok());
    }
}
