//! Records produced by the feed decoder.
//!
//! Every record is built fresh per decode call and handed to the caller; the
//! decoder never touches a record again once it has been appended to the
//! output collection.

mod bus;
mod train;

pub use bus::{Bus, BusArrival, BusDirection, BusPattern, BusRoute, BusStop, PatternPoint, PointKind, PredictionKind};
pub use train::{Eta, Station, Stop, Train, TrainArrival, TrainDirection, TrainLine};

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate as reported by the feeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}
