//! Metric Accumulator
//!
//! Causal per-driver and per-constructor statistics, computed by one ordered
//! scan over the ledger with a running counter per entity.

use std::collections::{HashMap, VecDeque};

use crate::data::ledger::RaceLedger;
use crate::models::{ConstructorStatSnapshot, DriverStatSnapshot, RaceRecord};

/// Number of prior entries in the recent form / recent points window
pub const RECENT_WINDOW: usize = 3;

/// Running counters for one entity
#[derive(Debug, Clone, Default)]
struct RunningStats {
    wins: u32,
    races: u32,
    recent: VecDeque<f64>,
}

impl RunningStats {
    fn win_rate(&self) -> f64 {
        self.wins as f64 / self.races.max(1) as f64
    }

    fn recent_mean(&self) -> Option<f64> {
        if self.recent.is_empty() {
            return None;
        }
        Some(self.recent.iter().sum::<f64>() / self.recent.len() as f64)
    }

    fn record_entry(&mut self, won: bool) {
        self.races += 1;
        if won {
            self.wins += 1;
        }
    }

    /// One window slot per race
    fn push_recent(&mut self, value: f64) {
        self.recent.push_back(value);
        if self.recent.len() > RECENT_WINDOW {
            self.recent.pop_front();
        }
    }
}

/// Pre-race statistics for one ledger record
#[derive(Debug, Clone, PartialEq)]
pub struct RaceMetrics {
    pub driver: DriverStatSnapshot,
    pub constructor: ConstructorStatSnapshot,
}

/// Per-entity accumulator
#[derive(Debug, Default)]
pub struct MetricAccumulator {
    drivers: HashMap<String, RunningStats>,
    constructors: HashMap<String, RunningStats>,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics for every ledger record, aligned with `ledger.records()`
    pub fn compute(ledger: &RaceLedger) -> Vec<RaceMetrics> {
        let mut acc = Self::new();
        let mut metrics = Vec::with_capacity(ledger.len());
        for race in ledger.races() {
            metrics.extend(acc.process_race(race));
        }
        metrics
    }

    /// Snapshot every record of one race, then fold the race into the counters.
    ///
    /// All records of the race see the same pre-race state, so teammates
    /// never see each other's result.
    pub fn process_race(&mut self, race: &[RaceRecord]) -> Vec<RaceMetrics> {
        let metrics = race
            .iter()
            .map(|r| RaceMetrics {
                driver: self.driver_snapshot(&r.driver_id, &r.race_id),
                constructor: self.constructor_snapshot(&r.constructor_id, &r.race_id),
            })
            .collect();

        // Team points are summed per race so the window spans races, not cars
        let mut team_points: HashMap<&str, f64> = HashMap::new();
        for r in race {
            let driver = self.drivers.entry(r.driver_id.clone()).or_default();
            driver.record_entry(r.is_winner());
            driver.push_recent(r.finish.numeric());

            self.constructors
                .entry(r.constructor_id.clone())
                .or_default()
                .record_entry(r.is_winner());
            *team_points.entry(r.constructor_id.as_str()).or_default() += r.points;
        }
        for (constructor_id, points) in team_points {
            if let Some(stats) = self.constructors.get_mut(constructor_id) {
                stats.push_recent(points);
            }
        }

        metrics
    }

    /// Driver statistics from everything folded in so far
    pub fn driver_snapshot(&self, driver_id: &str, as_of_race: &str) -> DriverStatSnapshot {
        let stats = self.drivers.get(driver_id).cloned().unwrap_or_default();
        DriverStatSnapshot {
            driver_id: driver_id.to_string(),
            as_of_race: as_of_race.to_string(),
            cumulative_wins: stats.wins,
            cumulative_races: stats.races,
            win_rate: stats.win_rate(),
            recent_form: stats.recent_mean(),
        }
    }

    /// Constructor statistics from everything folded in so far
    pub fn constructor_snapshot(
        &self,
        constructor_id: &str,
        as_of_race: &str,
    ) -> ConstructorStatSnapshot {
        let stats = self.constructors.get(constructor_id).cloned().unwrap_or_default();
        ConstructorStatSnapshot {
            constructor_id: constructor_id.to_string(),
            as_of_race: as_of_race.to_string(),
            cumulative_wins: stats.wins,
            cumulative_races: stats.races,
            win_rate: stats.win_rate(),
            recent_points: stats.recent_mean(),
        }
    }
}
