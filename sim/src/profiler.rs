//! Lightweight per-phase timing for the interest tick.
//!
//! The manager records how long each rebuild, scan and diff takes. Read the
//! numbers through [`crate::interest::InterestManager::profiler`], or log a
//! table with [`Profiler::log_summary`].

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::{Duration, Instant};

/// Statistics for a profiled section
#[derive(Debug, Default, Clone)]
pub struct SectionStats {
    pub total_time: Duration,
    pub call_count: u64,
    pub min_time: Option<Duration>,
    pub max_time: Option<Duration>,
}

impl SectionStats {
    pub fn avg_time(&self) -> Duration {
        if self.call_count == 0 {
            Duration::ZERO
        } else {
            self.total_time / self.call_count as u32
        }
    }

    fn record(&mut self, elapsed: Duration) {
        self.total_time += elapsed;
        self.call_count += 1;
        self.min_time = Some(self.min_time.map_or(elapsed, |m| m.min(elapsed)));
        self.max_time = Some(self.max_time.map_or(elapsed, |m| m.max(elapsed)));
    }
}

/// Accumulates timings for named sections.
#[derive(Debug, Default, Clone)]
pub struct Profiler {
    sections: HashMap<&'static str, SectionStats>,
    /// Scans profiled.
    tick_count: u64,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one run of `name`.
    pub fn record(&mut self, name: &'static str, elapsed: Duration) {
        self.sections.entry(name).or_default().record(elapsed);
    }

    /// Time a section using a closure.
    pub fn time_section<F, R>(&mut self, name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record(name, start.elapsed());
        result
    }

    pub fn tick(&mut self) {
        self.tick_count += 1;
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn get_section(&self, name: &str) -> Option<&SectionStats> {
        self.sections.get(name)
    }

    pub fn section_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.sections.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Render a table of all sections, slowest first.
    pub fn summary(&self) -> String {
        let mut sections: Vec<_> = self.sections.iter().collect();
        sections.sort_by(|a, b| b.1.total_time.cmp(&a.1.total_time));
        let total: Duration = sections.iter().map(|(_, s)| s.total_time).sum();

        let mut out = String::new();
        let _ = writeln!(out, "=== Interest Profiler ({} scans) ===", self.tick_count);
        let _ = writeln!(
            out,
            "{:<12} {:>10} {:>10} {:>10} {:>10} {:>8}",
            "Section", "Total", "Avg", "Min", "Max", "% Time"
        );
        for (name, stats) in &sections {
            let pct = if total.as_nanos() > 0 {
                (stats.total_time.as_nanos() as f64 / total.as_nanos() as f64) * 100.0
            } else {
                0.0
            };
            let _ = writeln!(
                out,
                "{:<12} {:>10.2?} {:>10.2?} {:>10.2?} {:>10.2?} {:>7.1}%",
                name,
                stats.total_time,
                stats.avg_time(),
                stats.min_time.unwrap_or(Duration::ZERO),
                stats.max_time.unwrap_or(Duration::ZERO),
                pct
            );
        }
        out
    }

    pub fn log_summary(&self) {
        tracing::info!(scans = self.tick_count, "\n{}", self.summary());
    }

    pub fn reset(&mut self) {
        self.sections.clear();
        self.tick_count = 0;
    }
}
