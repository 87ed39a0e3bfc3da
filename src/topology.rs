//! The "L" reference dataset: stations and their platforms.
//!
//! Loaded once from the CTA "L" stops CSV export (one row per platform, grouped
//! into stations by `MAP_ID`) and then only read. The arrivals and follow
//! decoders use it to resolve `staId`/`stpId` to names and directions.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::model::{Position, Station, Stop, TrainDirection, TrainLine};

#[derive(Debug, Deserialize)]
struct StopRow {
    #[serde(rename = "STOP_ID")]
    stop_id: u32,
    #[serde(rename = "DIRECTION_ID")]
    direction_id: String,
    #[serde(rename = "STOP_NAME")]
    stop_name: String,
    #[serde(rename = "STATION_NAME")]
    station_name: String,
    #[serde(rename = "MAP_ID")]
    map_id: u32,
    #[serde(rename = "ADA", default)]
    ada: String,
    #[serde(rename = "RED", default)]
    red: String,
    #[serde(rename = "BLUE", default)]
    blue: String,
    #[serde(rename = "G", default)]
    green: String,
    #[serde(rename = "BRN", default)]
    brown: String,
    #[serde(rename = "P", default)]
    purple: String,
    #[serde(rename = "Pexp", default)]
    purple_express: String,
    #[serde(rename = "Y", default)]
    yellow: String,
    #[serde(rename = "Pnk", default)]
    pink: String,
    #[serde(rename = "O", default)]
    orange: String,
    #[serde(rename = "Location", default)]
    location: Option<String>,
}

impl StopRow {
    fn lines(&self) -> Vec<TrainLine> {
        let flags = [
            (&self.red, TrainLine::Red),
            (&self.blue, TrainLine::Blue),
            (&self.brown, TrainLine::Brown),
            (&self.green, TrainLine::Green),
            (&self.orange, TrainLine::Orange),
            (&self.pink, TrainLine::Pink),
            (&self.purple, TrainLine::Purple),
            (&self.purple_express, TrainLine::Purple),
            (&self.yellow, TrainLine::Yellow),
        ];
        let mut lines: Vec<TrainLine> = flags
            .into_iter()
            .filter(|(flag, _)| is_set(flag))
            .map(|(_, line)| line)
            .collect();
        lines.dedup();
        lines
    }

    fn into_stop(self) -> Result<Stop> {
        let position = match self.location.as_deref() {
            Some(loc) if !loc.trim().is_empty() => Some(
                parse_location(loc)
                    .with_context(|| format!("bad Location for stop {}: {loc}", self.stop_id))?,
            ),
            _ => None,
        };
        Ok(Stop {
            id: self.stop_id,
            station_id: self.map_id,
            direction: TrainDirection::from_code(&self.direction_id),
            lines: self.lines(),
            ada: is_set(&self.ada),
            description: self.stop_name,
            position,
        })
    }
}

fn is_set(flag: &str) -> bool {
    matches!(flag.trim().to_ascii_lowercase().as_str(), "true" | "1" | "y")
}

/// Parses the export's `(41.875478, -87.626189)` location column.
fn parse_location(s: &str) -> Result<Position> {
    let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
    let (lat, lon) = inner
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("expected \"(lat, lon)\""))?;
    Ok(Position::new(lat.trim().parse()?, lon.trim().parse()?))
}

#[derive(Debug, Clone, Default)]
pub struct TrainTopology {
    stations: HashMap<u32, Station>,
    stop_to_station: HashMap<u32, u32>,
}

impl TrainTopology {
    /// Parse from any reader holding the stops CSV export.
    pub fn from_reader<R: Read>(r: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(r);
        let mut stations: HashMap<u32, Station> = HashMap::new();

        for result in rdr.deserialize() {
            let row: StopRow = result?;
            let station_id = row.map_id;
            let station_name = row.station_name.clone();
            let stop = row.into_stop()?;

            stations
                .entry(station_id)
                .or_insert_with(|| Station {
                    id: station_id,
                    name: station_name,
                    stops: Vec::new(),
                })
                .stops
                .push(stop);
        }

        let mut topology = TrainTopology::default();
        for mut station in stations.into_values() {
            station.stops.sort_by_key(|s| s.id);
            topology.insert_station(station);
        }

        debug!(
            stations = topology.stations.len(),
            stops = topology.stop_to_station.len(),
            "Train topology loaded"
        );
        Ok(topology)
    }

    /// Convenience wrapper for plain files.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path).with_context(|| format!("opening {:?}", path.as_ref()))?;
        Self::from_reader(file)
    }

    /// Adds or replaces a station and indexes its stops.
    pub fn insert_station(&mut self, station: Station) {
        for stop in &station.stops {
            self.stop_to_station.insert(stop.id, station.id);
        }
        self.stations.insert(station.id, station);
    }

    pub fn station(&self, id: u32) -> Option<&Station> {
        self.stations.get(&id)
    }

    pub fn stop(&self, id: u32) -> Option<&Stop> {
        let station_id = self.stop_to_station.get(&id)?;
        self.stations.get(station_id)?.stop(id)
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
