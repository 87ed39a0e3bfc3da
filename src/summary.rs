//! Per-decode summary rows, appended to a CSV log by the CLI.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::decoder::{Decoded, FeedKind};
use crate::model::Eta;

/// One flat row describing a decode attempt, appended to a CSV log.
#[derive(Debug, Default, Serialize)]
pub struct DecodeSummary {
    pub timestamp: DateTime<Utc>,
    pub kind: Option<String>,
    pub source: Option<String>,

    // top-level records (stations for arrivals)
    pub records: usize,
    pub etas: usize,
    pub pattern_points: usize,
    pub pattern_stops: usize,

    // record fields
    pub delayed: usize,
    pub approaching: usize,
    pub with_position: usize,

    // error tracking
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl DecodeSummary {
    pub fn from_decoded(decoded: &Decoded) -> Self {
        let mut s = DecodeSummary {
            timestamp: Utc::now(),
            kind: Some(decoded.kind().to_string()),
            records: decoded.len(),
            ..Default::default()
        };

        match decoded {
            Decoded::TrainArrivals(arrivals) => {
                for arrival in arrivals.values() {
                    s.count_etas(&arrival.etas);
                }
            }
            Decoded::TrainFollow(etas) => s.count_etas(etas),
            Decoded::TrainPositions(trains) => {
                for train in trains {
                    if train.is_delayed {
                        s.delayed += 1;
                    }
                    if train.is_approaching {
                        s.approaching += 1;
                    }
                    s.with_position += 1;
                }
            }
            Decoded::BusPatterns(patterns) => {
                for pattern in patterns {
                    s.pattern_points += pattern.points.len();
                    s.pattern_stops += pattern.stops().count();
                }
            }
            Decoded::BusArrivals(arrivals) => {
                s.delayed = arrivals.iter().filter(|a| a.is_delayed).count();
            }
            Decoded::BusVehicles(buses) => {
                s.delayed = buses.iter().filter(|b| b.is_delayed).count();
                s.with_position = buses.len();
            }
            Decoded::BusStops(stops) => s.with_position = stops.len(),
            Decoded::BusRoutes(_) | Decoded::BusDirections(_) => {}
        }

        s
    }

    fn count_etas(&mut self, etas: &[Eta]) {
        for eta in etas {
            self.etas += 1;
            if eta.is_delayed {
                self.delayed += 1;
            }
            if eta.is_approaching {
                self.approaching += 1;
            }
            if eta.position.is_some() {
                self.with_position += 1;
            }
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of delayed etas (train feeds) or records (everything else).
    pub fn delayed_pct(&self) -> f64 {
        let total = if self.etas > 0 { self.etas } else { self.records };
        Self::pct(self.delayed, total)
    }

    /// Create an error record with timestamp and error information
    pub fn from_error(error_type: &str, error_message: &str) -> Self {
        DecodeSummary {
            timestamp: Utc::now(),
            error_type: Some(error_type.to_string()),
            error_message: Some(error_message.to_string()),
            ..Default::default()
        }
    }

    /// Set what was decoded and where it came from
    pub fn with_source(mut self, kind: FeedKind, source: &str) -> Self {
        self.kind = Some(kind.to_string());
        self.source = Some(source.to_string());
        self
    }
}
