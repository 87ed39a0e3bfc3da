//! Caller-side arrival rules: which etas to show and in what order.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{Eta, TrainArrival, TrainDirection, TrainLine};

/// Decides whether etas for a (station, line, platform direction) are shown.
pub trait EtaFilter {
    fn includes(&self, station_id: u32, line: TrainLine, direction: TrainDirection) -> bool;
}

impl<F> EtaFilter for F
where
    F: Fn(u32, TrainLine, TrainDirection) -> bool,
{
    fn includes(&self, station_id: u32, line: TrainLine, direction: TrainDirection) -> bool {
        self(station_id, line, direction)
    }
}

/// One hidden (station, line, direction) combination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Exclusion {
    pub station: u32,
    pub line: TrainLine,
    pub direction: TrainDirection,
}

/// Persisted arrival preferences. Everything is shown unless excluded.
///
/// Stored as JSON:
/// ```json
/// { "excluded": [ { "station": 40380, "line": "brown", "direction": "north" } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrivalFilter {
    #[serde(default)]
    excluded: BTreeSet<Exclusion>,
}

impl ArrivalFilter {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("reading filter {path}"))?;
        let filter = serde_json::from_str(&content).with_context(|| format!("parsing filter {path}"))?;
        Ok(filter)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn exclude(&mut self, station: u32, line: TrainLine, direction: TrainDirection) {
        self.excluded.insert(Exclusion {
            station,
            line,
            direction,
        });
    }

    pub fn include(&mut self, station: u32, line: TrainLine, direction: TrainDirection) {
        self.excluded.remove(&Exclusion {
            station,
            line,
            direction,
        });
    }
}

impl EtaFilter for ArrivalFilter {
    fn includes(&self, station_id: u32, line: TrainLine, direction: TrainDirection) -> bool {
        !self.excluded.contains(&Exclusion {
            station: station_id,
            line,
            direction,
        })
    }
}

impl TrainArrival {
    /// Stable sort by arrival time; etas without one go first.
    pub fn sort_by_arrival(&mut self) {
        self.etas.sort_by_key(|eta| eta.arrives_at);
    }

    /// The etas `filter` includes, keyed on the eta's line and its stop's
    /// platform direction, sorted by arrival time.
    pub fn filtered<F: EtaFilter + ?Sized>(&self, filter: &F) -> Vec<Eta> {
        let mut etas: Vec<Eta> = self
            .etas
            .iter()
            .filter(|eta| filter.includes(self.station_id, eta.line, eta.stop.direction))
            .cloned()
            .collect();
        etas.sort_by_key(|eta| eta.arrives_at);
        etas
    }

    /// Distinct lines serving this station in the feed, in line order.
    pub fn lines(&self) -> Vec<TrainLine> {
        self.etas
            .iter()
            .map(|eta| eta.line)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
