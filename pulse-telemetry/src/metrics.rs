//! ## pulse-telemetry::metrics
//! **Prometheus registry for replay ticks**

use std::time::Duration;

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub ticks: IntCounter,
    pub tick_latency: Histogram,
    pub today_count: IntGauge,
    pub total_count: IntGauge,
    pub highlighted: IntCounter,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let ticks = IntCounter::new("pulse_ticks_total", "Replay ticks processed")?;
        let tick_latency = Histogram::with_opts(
            HistogramOpts::new("pulse_tick_latency_ns", "Time spent computing one tick")
                .buckets(vec![1_000.0, 10_000.0, 100_000.0, 1_000_000.0, 10_000_000.0]),
        )?;
        let today_count = IntGauge::new("pulse_today_count", "Events counted for the replayed day")?;
        let total_count = IntGauge::new("pulse_total_count", "Baseline plus today's count")?;
        let highlighted = IntCounter::new(
            "pulse_category_changes_total",
            "Category tiles flagged as changed",
        )?;

        registry.register(Box::new(ticks.clone()))?;
        registry.register(Box::new(tick_latency.clone()))?;
        registry.register(Box::new(today_count.clone()))?;
        registry.register(Box::new(total_count.clone()))?;
        registry.register(Box::new(highlighted.clone()))?;

        Ok(Self {
            registry,
            ticks,
            tick_latency,
            today_count,
            total_count,
            highlighted,
        })
    }

    /// Records one completed live tick.
    pub fn record_tick(&self, latency: Duration, today: u64, total: u64, changed: usize) {
        self.tick_latency.observe(latency.as_nanos() as f64);
        self.record_snapshot(today, total, changed);
    }

    /// Records a tick whose latency is meaningless, such as one step of a
    /// sweep.
    pub fn record_snapshot(&self, today: u64, total: u64, changed: usize) {
        self.ticks.inc();
        self.today_count.set(clamp_gauge(today));
        self.total_count.set(clamp_gauge(total));
        self.highlighted.inc_by(changed as u64);
    }

    /// Text exposition of every registered metric.
    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn clamp_gauge(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
