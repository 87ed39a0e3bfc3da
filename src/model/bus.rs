use chrono::NaiveDateTime;
use serde::Serialize;

use super::Position;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BusRoute {
    pub id: String,
    pub name: String,
}

/// Travel direction of a bus route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum BusDirection {
    Northbound,
    Southbound,
    Eastbound,
    Westbound,
}

impl BusDirection {
    /// Recognizes the spellings the Bus Tracker feeds use
    /// (`Northbound`, `North Bound`, `NORTHBOUND`, `north`).
    pub fn from_feed(text: &str) -> Option<Self> {
        let folded: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.strip_suffix("bound").unwrap_or(folded.as_str()) {
            "north" => Some(BusDirection::Northbound),
            "south" => Some(BusDirection::Southbound),
            "east" => Some(BusDirection::Eastbound),
            "west" => Some(BusDirection::Westbound),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BusDirection::Northbound => "Northbound",
            BusDirection::Southbound => "Southbound",
            BusDirection::Eastbound => "Eastbound",
            BusDirection::Westbound => "Westbound",
        }
    }

    /// Canonical spelling of a feed direction; unrecognized text is kept as-is.
    pub fn normalize(text: &str) -> String {
        Self::from_feed(text)
            .map(|d| d.as_str().to_string())
            .unwrap_or_else(|| text.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BusStop {
    pub id: u32,
    pub name: String,
    pub position: Position,
}

/// Whether a pattern point is a served stop or only a shape waypoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PointKind {
    Stop,
    #[default]
    Waypoint,
}

impl PointKind {
    pub fn from_code(code: &str) -> Self {
        if code.trim() == "S" {
            PointKind::Stop
        } else {
            PointKind::Waypoint
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatternPoint {
    pub sequence: u32,
    pub position: Position,
    pub kind: PointKind,
    pub stop_id: Option<u32>,
    pub stop_name: Option<String>,
    pub distance: Option<f64>,
}

impl PatternPoint {
    pub fn is_stop(&self) -> bool {
        self.kind == PointKind::Stop
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BusPattern {
    pub id: u32,
    pub length: f64,
    pub direction: String,
    pub points: Vec<PatternPoint>,
}

impl BusPattern {
    /// Points that carry a stop, in sequence order.
    pub fn stops(&self) -> impl Iterator<Item = &PatternPoint> {
        self.points.iter().filter(|p| p.is_stop())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PredictionKind {
    Arrival,
    Departure,
}

impl PredictionKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "A" => Some(PredictionKind::Arrival),
            "D" => Some(PredictionKind::Departure),
            _ => None,
        }
    }
}

/// One predicted bus arrival at a stop.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BusArrival {
    pub timestamp: Option<NaiveDateTime>,
    pub kind: Option<PredictionKind>,
    pub stop_name: String,
    pub stop_id: u32,
    pub vehicle_id: u32,
    pub distance_to_stop: Option<u32>,
    pub route_id: String,
    pub route_direction: String,
    pub destination: String,
    pub predicted_at: Option<NaiveDateTime>,
    pub is_delayed: bool,
}

/// A bus in service, from the vehicles feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Bus {
    pub id: u32,
    pub timestamp: Option<NaiveDateTime>,
    pub position: Position,
    pub heading: Option<u16>,
    pub pattern_id: u32,
    pub pattern_distance: Option<f64>,
    pub route_id: String,
    pub destination: String,
    pub is_delayed: bool,
}
