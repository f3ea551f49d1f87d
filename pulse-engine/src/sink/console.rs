//! Plain-text dashboard: simulated clock, wall date, totals and one tile per
//! category.

use std::io::{self, IsTerminal, Stdout, Write};

use pulse_config::DisplayConfig;
use pulse_simulator::{TickOutput, TimeSeries};

use crate::error::EngineError;
use crate::format::{clock, rgb, thousands};
use crate::sink::SnapshotSink;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

pub struct ConsoleSink<W: Write + Send = Stdout> {
    out: W,
    display: DisplayConfig,
    ansi: bool,
}

impl ConsoleSink<Stdout> {
    /// Writes to stdout, colored when stdout is a terminal.
    pub fn stdout(display: DisplayConfig) -> Self {
        let ansi = io::stdout().is_terminal();
        Self::new(io::stdout(), display).with_ansi(ansi)
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W, display: DisplayConfig) -> Self {
        Self {
            out,
            display,
            ansi: false,
        }
    }

    #[must_use]
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&self, output: &TickOutput) -> String {
        let snapshot = &output.snapshot;
        let mut text = format!(
            "[{}] wall {} | today {} | all-time {}\n",
            clock(snapshot.instant),
            output.wallclock.date(),
            thousands(snapshot.today_count),
            thousands(snapshot.total_count),
        );

        for (category, count) in &snapshot.category_counts {
            let changed = output.changed.contains(category);
            let marker = if changed { " *" } else { "" };
            let label = format!("{:<8}", category.as_ref());
            let label = match (self.ansi, rgb(self.display.color_for(category))) {
                (true, Some((r, g, b))) => {
                    let weight = if changed { BOLD } else { "" };
                    format!("\x1b[38;2;{r};{g};{b}m{weight}{label}{RESET}")
                }
                _ => label,
            };
            text.push_str(&format!("  {label} {:>9}{marker}\n", thousands(*count)));
        }
        text
    }

    fn io_error(source: io::Error) -> EngineError {
        EngineError::Sink {
            sink: "console",
            source,
        }
    }
}

impl<W: Write + Send> SnapshotSink for ConsoleSink<W> {
    fn on_tick(&mut self, output: &TickOutput) -> Result<(), EngineError> {
        let text = self.render(output);
        self.out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(Self::io_error)
    }

    fn finish(&mut self, series: &TimeSeries) -> Result<(), EngineError> {
        let Some(last) = series.last() else {
            return Ok(());
        };
        writeln!(
            self.out,
            "Stopped at {} after {} ticks, all-time {}",
            clock(last.time),
            series.len(),
            thousands(last.total_count)
        )
        .map_err(Self::io_error)
    }
}
