//! Request URLs for the Train Tracker and Bus Tracker endpoints.
//!
//! URLs are built without the API key; [`crate::fetch::fetch_feed`] appends
//! it as the `key` query parameter.

use anyhow::Result;
use reqwest::Url;

use crate::config::CtaConfig;
use crate::decoder::FeedKind;
use crate::model::{BusDirection, TrainLine};

#[derive(Debug, Clone, PartialEq)]
pub enum CtaRequest {
    TrainArrivals { station_id: u32 },
    TrainPositions { lines: Vec<TrainLine> },
    TrainFollow { run_number: String },
    BusRoutes,
    BusDirections { route: String },
    BusStops { route: String, direction: BusDirection },
    BusPatterns { route: String },
    BusArrivals { route: String, stop_id: u32 },
    BusVehicles { route: String },
}

impl CtaRequest {
    /// The feed kind the response must be decoded as.
    pub fn kind(&self) -> FeedKind {
        match self {
            CtaRequest::TrainArrivals { .. } => FeedKind::TrainArrivals,
            CtaRequest::TrainPositions { .. } => FeedKind::TrainPositions,
            CtaRequest::TrainFollow { .. } => FeedKind::TrainFollow,
            CtaRequest::BusRoutes => FeedKind::BusRoutes,
            CtaRequest::BusDirections { .. } => FeedKind::BusDirections,
            CtaRequest::BusStops { .. } => FeedKind::BusStops,
            CtaRequest::BusPatterns { .. } => FeedKind::BusPatterns,
            CtaRequest::BusArrivals { .. } => FeedKind::BusArrivals,
            CtaRequest::BusVehicles { .. } => FeedKind::BusVehicles,
        }
    }

    fn is_train(&self) -> bool {
        matches!(
            self,
            CtaRequest::TrainArrivals { .. } | CtaRequest::TrainPositions { .. } | CtaRequest::TrainFollow { .. }
        )
    }

    /// The key for the tracker this request goes to.
    pub fn api_key<'a>(&self, config: &'a CtaConfig) -> Result<&'a str> {
        if self.is_train() {
            config.require_train_key()
        } else {
            config.require_bus_key()
        }
    }

    pub fn url(&self, config: &CtaConfig) -> Result<Url> {
        let (endpoint, params): (&str, Vec<(&str, String)>) = match self {
            CtaRequest::TrainArrivals { station_id } => ("ttarrivals.aspx", vec![("mapid", station_id.to_string())]),
            CtaRequest::TrainPositions { lines } => {
                let codes: Vec<&str> = lines.iter().map(|l| l.code()).collect();
                ("ttpositions.aspx", vec![("rt", codes.join(","))])
            }
            CtaRequest::TrainFollow { run_number } => ("ttfollow.aspx", vec![("runnumber", run_number.clone())]),
            CtaRequest::BusRoutes => ("getroutes", vec![]),
            CtaRequest::BusDirections { route } => ("getdirections", vec![("rt", route.clone())]),
            CtaRequest::BusStops { route, direction } => (
                "getstops",
                vec![("rt", route.clone()), ("dir", direction.as_str().to_string())],
            ),
            CtaRequest::BusPatterns { route } => ("getpatterns", vec![("rt", route.clone())]),
            CtaRequest::BusArrivals { route, stop_id } => (
                "getpredictions",
                vec![("rt", route.clone()), ("stpid", stop_id.to_string())],
            ),
            CtaRequest::BusVehicles { route } => ("getvehicles", vec![("rt", route.clone())]),
        };

        let base = if self.is_train() {
            &config.train_base_url
        } else {
            &config.bus_base_url
        };
        let url = Url::parse_with_params(&format!("{}/{}", base.trim_end_matches('/'), endpoint), &params)?;
        Ok(url)
    }
}
