pub mod arrivals;
pub mod config;
pub mod decoder;
pub mod error;
pub mod fetch;
pub mod model;
pub mod output;
pub mod requests;
pub mod summary;
pub mod topology;

pub use decoder::{Decoded, FeedKind, TrainArrivals, decode};
pub use error::DecodeError;
pub use topology::TrainTopology;
