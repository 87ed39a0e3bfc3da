use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Position;

/// An "L" line, as identified by the Train Tracker route codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainLine {
    Red,
    Blue,
    Brown,
    Green,
    Orange,
    Pink,
    Purple,
    Yellow,
    #[default]
    Na,
}

impl TrainLine {
    pub const ALL: [TrainLine; 8] = [
        TrainLine::Red,
        TrainLine::Blue,
        TrainLine::Brown,
        TrainLine::Green,
        TrainLine::Orange,
        TrainLine::Pink,
        TrainLine::Purple,
        TrainLine::Yellow,
    ];

    /// Maps a feed route code (`Brn`, `G`, `Pexp`, `red`...) to a line.
    ///
    /// Matching is case-insensitive; unknown codes map to [`TrainLine::Na`].
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "red" => TrainLine::Red,
            "blue" => TrainLine::Blue,
            "brn" | "brown" => TrainLine::Brown,
            "g" | "green" => TrainLine::Green,
            "org" | "o" | "orange" => TrainLine::Orange,
            "pink" | "pnk" => TrainLine::Pink,
            "p" | "pexp" | "purple" => TrainLine::Purple,
            "y" | "yellow" => TrainLine::Yellow,
            _ => TrainLine::Na,
        }
    }

    /// The code the Train Tracker API expects in `rt=` parameters.
    pub fn code(self) -> &'static str {
        match self {
            TrainLine::Red => "red",
            TrainLine::Blue => "blue",
            TrainLine::Brown => "brn",
            TrainLine::Green => "g",
            TrainLine::Orange => "org",
            TrainLine::Pink => "pink",
            TrainLine::Purple => "p",
            TrainLine::Yellow => "y",
            TrainLine::Na => "na",
        }
    }
}

/// Platform direction of a stop, from the reference dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainDirection {
    North,
    South,
    East,
    West,
    #[default]
    Unknown,
}

impl TrainDirection {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "N" | "n" => TrainDirection::North,
            "S" | "s" => TrainDirection::South,
            "E" | "e" => TrainDirection::East,
            "W" | "w" => TrainDirection::West,
            _ => TrainDirection::Unknown,
        }
    }
}

/// One platform of a station.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stop {
    pub id: u32,
    pub station_id: u32,
    pub direction: TrainDirection,
    pub description: String,
    pub lines: Vec<TrainLine>,
    pub position: Option<Position>,
    pub ada: bool,
}

impl Stop {
    /// A stop the reference dataset does not know about.
    pub fn placeholder(id: u32, station_id: u32) -> Self {
        Self {
            id,
            station_id,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Station {
    pub id: u32,
    pub name: String,
    pub stops: Vec<Stop>,
}

impl Station {
    pub fn stop(&self, stop_id: u32) -> Option<&Stop> {
        self.stops.iter().find(|s| s.id == stop_id)
    }
}

/// One predicted arrival of one train at one stop.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Eta {
    pub station_id: u32,
    pub station_name: String,
    pub stop: Stop,
    pub line: TrainLine,
    pub run_number: String,
    pub destination_station_id: u32,
    pub destination_name: String,
    pub direction_code: u8,
    pub predicted_at: Option<NaiveDateTime>,
    pub arrives_at: Option<NaiveDateTime>,
    pub is_approaching: bool,
    pub is_scheduled: bool,
    pub is_delayed: bool,
    pub is_fault: bool,
    pub heading: Option<u16>,
    pub position: Option<Position>,
}

/// All the etas reported for one station, keyed by station id in
/// [`crate::decoder::TrainArrivals`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainArrival {
    pub station_id: u32,
    pub station_name: String,
    pub etas: Vec<Eta>,
}

/// A train in service, from the positions feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Train {
    pub run_number: String,
    pub line: TrainLine,
    pub destination_station_id: u32,
    pub destination_name: String,
    pub direction_code: u8,
    pub next_station_id: u32,
    pub next_stop_id: u32,
    pub next_station_name: String,
    pub predicted_at: Option<NaiveDateTime>,
    pub arrives_at: Option<NaiveDateTime>,
    pub is_approaching: bool,
    pub is_delayed: bool,
    pub position: Position,
    pub heading: Option<u16>,
}
