//! Train Tracker feeds: arrivals, follow and positions.

use std::io::BufRead;

use quick_xml::events::BytesStart;
use tracing::{debug, trace};

use super::fields::{boolean, number, train_time};
use super::{FeedHandler, Records, TrainArrivals, attribute, run};
use crate::error::DecodeError;
use crate::model::{Eta, Position, Stop, Train, TrainArrival, TrainLine};
use crate::topology::TrainTopology;

/// Destinations shown as "Loop": (line, destination as sent, whether the
/// eta's stop must be a Loop stop).
const LOOP_DESTINATIONS: [(TrainLine, &str, bool); 3] = [
    (TrainLine::Brown, "See train", true),
    (TrainLine::Green, "See train", true),
    (TrainLine::Brown, "Loop, Midway", false),
];

fn destination_name(line: TrainLine, stop_description: &str, destination: &str) -> String {
    let on_loop = stop_description.contains("Loop");
    let rewrite = LOOP_DESTINATIONS
        .iter()
        .any(|&(l, d, needs_loop_stop)| l == line && d == destination && (on_loop || !needs_loop_stop));
    if rewrite {
        "Loop".to_string()
    } else {
        destination.to_string()
    }
}

/// Wraps a Train Tracker handler with the `<errCd>`/`<errNm>` status header
/// every train feed carries. A non-zero code fails the decode with the
/// feed's error name.
struct TrainFeed<H> {
    inner: H,
    error_code: Option<String>,
}

impl<H> TrainFeed<H> {
    fn new(inner: H) -> Self {
        Self {
            inner,
            error_code: None,
        }
    }
}

impl<H: FeedHandler> FeedHandler for TrainFeed<H> {
    type Output = H::Output;

    fn start(&mut self, tag: &str, element: &BytesStart<'_>) -> Result<(), DecodeError> {
        self.inner.start(tag, element)
    }

    fn text(&mut self, tag: &str, text: &str) -> Result<(), DecodeError> {
        match tag {
            "errCd" => {
                let code = text.trim();
                if code != "0" {
                    self.error_code = Some(code.to_string());
                }
                Ok(())
            }
            "errNm" if self.error_code.is_some() => Err(DecodeError::Feed(text.trim().to_string())),
            "errNm" => Ok(()),
            _ => self.inner.text(tag, text),
        }
    }

    fn end(&mut self, tag: &str) -> Result<(), DecodeError> {
        self.inner.end(tag)
    }

    fn finish(self) -> Result<Self::Output, DecodeError> {
        if let Some(code) = self.error_code {
            return Err(DecodeError::Feed(format!("error code {code}")));
        }
        self.inner.finish()
    }
}

/// Builds per-station arrivals. Shared by the arrivals and follow feeds,
/// which use the same `<eta>` schema.
struct ArrivalsHandler<'a> {
    topology: &'a TrainTopology,
    arrivals: TrainArrivals,
    current: Option<Eta>,
}

impl<'a> ArrivalsHandler<'a> {
    fn new(topology: &'a TrainTopology) -> Self {
        Self {
            topology,
            arrivals: TrainArrivals::new(),
            current: None,
        }
    }

    fn begin_eta(&mut self, station_id: u32) {
        self.flush();

        let station_name = match self.topology.station(station_id) {
            Some(station) => station.name.clone(),
            None => {
                debug!(station_id, "Station not in topology, using placeholder");
                String::new()
            }
        };
        self.current = Some(Eta {
            station_id,
            station_name,
            stop: Stop::placeholder(0, station_id),
            ..Default::default()
        });
    }

    /// Appends the eta being filled to its station's arrival.
    fn flush(&mut self) {
        let Some(eta) = self.current.take() else {
            return;
        };
        self.arrivals
            .entry(eta.station_id)
            .or_insert_with(|| TrainArrival {
                station_id: eta.station_id,
                station_name: eta.station_name.clone(),
                etas: Vec::new(),
            })
            .etas
            .push(eta);
    }

    fn resolve_stop(&self, stop_id: u32, station_id: u32) -> Stop {
        match self.topology.stop(stop_id) {
            Some(stop) => stop.clone(),
            None => {
                debug!(stop_id, station_id, "Stop not in topology, using placeholder");
                Stop::placeholder(stop_id, station_id)
            }
        }
    }
}

impl FeedHandler for ArrivalsHandler<'_> {
    type Output = TrainArrivals;

    fn text(&mut self, tag: &str, text: &str) -> Result<(), DecodeError> {
        if tag == "staId" {
            self.begin_eta(number(tag, text)?);
            return Ok(());
        }

        let stop = match tag {
            "stpId" => {
                let station_id = self.current.as_ref().map(|e| e.station_id);
                match station_id {
                    Some(station_id) => Some(self.resolve_stop(number(tag, text)?, station_id)),
                    None => None,
                }
            }
            _ => None,
        };

        let Some(eta) = self.current.as_mut() else {
            trace!(tag, "Field outside of an eta, ignored");
            return Ok(());
        };

        match tag {
            "stpId" => {
                if let Some(stop) = stop {
                    eta.stop = stop;
                }
            }
            "staNm" => eta.station_name = text.to_string(),
            "stpDe" => eta.stop.description = text.to_string(),
            "rn" => eta.run_number = text.trim().to_string(),
            "rt" => eta.line = TrainLine::from_code(text),
            "destSt" => eta.destination_station_id = number(tag, text)?,
            "destNm" => eta.destination_name = destination_name(eta.line, &eta.stop.description, text),
            "trDr" => eta.direction_code = number(tag, text)?,
            "prdt" => eta.predicted_at = Some(train_time(tag, text)?),
            "arrT" => eta.arrives_at = Some(train_time(tag, text)?),
            "isApp" => eta.is_approaching = boolean(tag, text)?,
            "isSch" => eta.is_scheduled = boolean(tag, text)?,
            "isDly" => eta.is_delayed = boolean(tag, text)?,
            "isFlt" => eta.is_fault = boolean(tag, text)?,
            "lat" => eta.position.get_or_insert_with(Position::default).latitude = number(tag, text)?,
            "lon" => eta.position.get_or_insert_with(Position::default).longitude = number(tag, text)?,
            "heading" => eta.heading = Some(number(tag, text)?),
            _ => trace!(tag, "Unhandled tag"),
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Self::Output, DecodeError> {
        self.flush();
        Ok(self.arrivals)
    }
}

/// Decodes an arrivals (`ttarrivals`) feed into per-station arrivals.
///
/// Several `<eta>` blocks for the same station accumulate into one
/// [`TrainArrival`], in document order. Sorting and filtering are left to
/// the caller (see [`TrainArrival::filtered`]).
///
/// Station and stop ids missing from `topology` decode to placeholders: an
/// empty station name (unless the feed carries `staNm`) and a stop with an
/// unknown direction.
pub fn decode_train_arrivals<R: BufRead>(input: R, topology: &TrainTopology) -> Result<TrainArrivals, DecodeError> {
    let arrivals = run(input, TrainFeed::new(ArrivalsHandler::new(topology)))?;
    debug!(
        kind = "train-arrivals",
        stations = arrivals.len(),
        etas = arrivals.values().map(|a| a.etas.len()).sum::<usize>(),
        "Feed decoded"
    );
    Ok(arrivals)
}

/// Decodes a follow (`ttfollow`) feed: the upcoming stations of one run.
///
/// Keeps the first eta of each station and returns them sorted by arrival
/// time.
pub fn decode_train_follow<R: BufRead>(input: R, topology: &TrainTopology) -> Result<Vec<Eta>, DecodeError> {
    let arrivals = run(input, TrainFeed::new(ArrivalsHandler::new(topology)))?;
    let mut etas: Vec<Eta> = arrivals
        .into_values()
        .filter_map(|arrival| arrival.etas.into_iter().next())
        .collect();
    etas.sort_by_key(|eta| eta.arrives_at);
    debug!(kind = "train-follow", etas = etas.len(), "Feed decoded");
    Ok(etas)
}

#[derive(Default)]
struct PositionsHandler {
    line: TrainLine,
    trains: Records<Train>,
}

impl FeedHandler for PositionsHandler {
    type Output = Vec<Train>;

    fn start(&mut self, tag: &str, element: &BytesStart<'_>) -> Result<(), DecodeError> {
        match tag {
            "route" => {
                self.line = attribute(element, "name")?
                    .map(|name| TrainLine::from_code(&name))
                    .unwrap_or_default();
            }
            "train" => self.trains.begin(Train {
                line: self.line,
                ..Default::default()
            }),
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, tag: &str, text: &str) -> Result<(), DecodeError> {
        let Some(train) = self.trains.current() else {
            trace!(tag, "Field outside of a train, ignored");
            return Ok(());
        };

        match tag {
            "rn" => train.run_number = text.trim().to_string(),
            "destSt" => train.destination_station_id = number(tag, text)?,
            "destNm" => train.destination_name = text.to_string(),
            "trDr" => train.direction_code = number(tag, text)?,
            "nextStaId" => train.next_station_id = number(tag, text)?,
            "nextStpId" => train.next_stop_id = number(tag, text)?,
            "nextStaNm" => train.next_station_name = text.to_string(),
            "prdt" => train.predicted_at = Some(train_time(tag, text)?),
            "arrT" => train.arrives_at = Some(train_time(tag, text)?),
            "isApp" => train.is_approaching = boolean(tag, text)?,
            "isDly" => train.is_delayed = boolean(tag, text)?,
            "lat" => train.position.latitude = number(tag, text)?,
            "lon" => train.position.longitude = number(tag, text)?,
            "heading" => train.heading = Some(number(tag, text)?),
            _ => trace!(tag, "Unhandled tag"),
        }
        Ok(())
    }

    fn finish(self) -> Result<Self::Output, DecodeError> {
        Ok(self.trains.finish())
    }
}

/// Decodes a positions (`ttpositions`) feed into the trains in service, in
/// document order. Each train takes its line from the enclosing
/// `<route name="...">`.
pub fn decode_train_positions<R: BufRead>(input: R) -> Result<Vec<Train>, DecodeError> {
    let trains = run(input, TrainFeed::new(PositionsHandler::default()))?;
    debug!(kind = "train-positions", trains = trains.len(), "Feed decoded");
    Ok(trains)
}
