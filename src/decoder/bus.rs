//! Bus Tracker feeds: routes, directions, stops, patterns, predictions and
//! vehicles.

use std::io::BufRead;

use quick_xml::events::BytesStart;
use tracing::{debug, trace};

use super::fields::{boolean, bus_time, number};
use super::{FeedHandler, Records, run};
use crate::error::DecodeError;
use crate::model::{
    Bus, BusArrival, BusDirection, BusPattern, BusRoute, BusStop, PatternPoint, PointKind, PredictionKind,
};

const MISSING_ERROR_MESSAGE: &str = "feed reported an error without a message";

/// Wraps a Bus Tracker handler with error payload detection: any `<msg>`
/// text, or an `<error>` element that closes without one, fails the decode.
struct BusFeed<H>(H);

impl<H: FeedHandler> FeedHandler for BusFeed<H> {
    type Output = H::Output;

    fn start(&mut self, tag: &str, element: &BytesStart<'_>) -> Result<(), DecodeError> {
        self.0.start(tag, element)
    }

    fn text(&mut self, tag: &str, text: &str) -> Result<(), DecodeError> {
        if tag == "msg" {
            return Err(DecodeError::Feed(text.trim().to_string()));
        }
        self.0.text(tag, text)
    }

    fn end(&mut self, tag: &str) -> Result<(), DecodeError> {
        if tag == "error" {
            return Err(DecodeError::Feed(MISSING_ERROR_MESSAGE.to_string()));
        }
        self.0.end(tag)
    }

    fn finish(self) -> Result<Self::Output, DecodeError> {
        self.0.finish()
    }
}

#[derive(Default)]
struct RoutesHandler(Records<BusRoute>);

impl FeedHandler for RoutesHandler {
    type Output = Vec<BusRoute>;

    fn start(&mut self, tag: &str, _element: &BytesStart<'_>) -> Result<(), DecodeError> {
        if tag == "route" {
            self.0.begin(BusRoute::default());
        }
        Ok(())
    }

    fn text(&mut self, tag: &str, text: &str) -> Result<(), DecodeError> {
        let Some(route) = self.0.current() else {
            trace!(tag, "Field outside of a route, ignored");
            return Ok(());
        };
        match tag {
            "rt" => route.id = text.trim().to_string(),
            "rtnm" => route.name = text.to_string(),
            _ => trace!(tag, "Unhandled tag"),
        }
        Ok(())
    }

    fn finish(self) -> Result<Self::Output, DecodeError> {
        Ok(self.0.finish())
    }
}

/// Decodes a `getroutes` feed.
pub fn decode_bus_routes<R: BufRead>(input: R) -> Result<Vec<BusRoute>, DecodeError> {
    let routes = run(input, BusFeed(RoutesHandler::default()))?;
    debug!(kind = "bus-routes", routes = routes.len(), "Feed decoded");
    Ok(routes)
}

#[derive(Default)]
struct DirectionsHandler(Vec<BusDirection>);

impl FeedHandler for DirectionsHandler {
    type Output = Vec<BusDirection>;

    fn text(&mut self, tag: &str, text: &str) -> Result<(), DecodeError> {
        match BusDirection::from_feed(text) {
            Some(direction) => self.0.push(direction),
            None => trace!(tag, text, "Not a direction, ignored"),
        }
        Ok(())
    }

    fn finish(self) -> Result<Self::Output, DecodeError> {
        Ok(self.0)
    }
}

/// Decodes a `getdirections` feed. Every text node is tried as a direction
/// and the ones that are not are skipped.
pub fn decode_bus_directions<R: BufRead>(input: R) -> Result<Vec<BusDirection>, DecodeError> {
    let directions = run(input, BusFeed(DirectionsHandler::default()))?;
    debug!(kind = "bus-directions", directions = directions.len(), "Feed decoded");
    Ok(directions)
}

#[derive(Default)]
struct StopsHandler(Records<BusStop>);

impl FeedHandler for StopsHandler {
    type Output = Vec<BusStop>;

    fn text(&mut self, tag: &str, text: &str) -> Result<(), DecodeError> {
        if tag == "stpid" {
            self.0.begin(BusStop {
                id: number(tag, text)?,
                ..Default::default()
            });
            return Ok(());
        }
        let Some(stop) = self.0.current() else {
            trace!(tag, "Field outside of a stop, ignored");
            return Ok(());
        };
        match tag {
            "stpnm" => stop.name = text.to_string(),
            "lat" => stop.position.latitude = number(tag, text)?,
            "lon" => stop.position.longitude = number(tag, text)?,
            _ => trace!(tag, "Unhandled tag"),
        }
        Ok(())
    }

    fn finish(self) -> Result<Self::Output, DecodeError> {
        Ok(self.0.finish())
    }
}

/// Decodes a `getstops` feed.
pub fn decode_bus_stops<R: BufRead>(input: R) -> Result<Vec<BusStop>, DecodeError> {
    let stops = run(input, BusFeed(StopsHandler::default()))?;
    debug!(kind = "bus-stops", stops = stops.len(), "Feed decoded");
    Ok(stops)
}

/// A pattern under construction; it only becomes a [`BusPattern`] once the
/// feed has given it a `pid`.
#[derive(Default)]
struct PatternBuilder {
    id: Option<u32>,
    length: f64,
    direction: String,
    points: Vec<PatternPoint>,
}

impl PatternBuilder {
    fn build(self) -> Option<BusPattern> {
        Some(BusPattern {
            id: self.id?,
            length: self.length,
            direction: self.direction,
            points: self.points,
        })
    }
}

#[derive(Default)]
struct PatternsHandler(Records<PatternBuilder>);

impl FeedHandler for PatternsHandler {
    type Output = Vec<BusPattern>;

    fn start(&mut self, tag: &str, _element: &BytesStart<'_>) -> Result<(), DecodeError> {
        match tag {
            "ptr" => self.0.begin(PatternBuilder::default()),
            "pt" => match self.0.current() {
                Some(pattern) => pattern.points.push(PatternPoint::default()),
                None => trace!("Point outside of a pattern, ignored"),
            },
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, tag: &str, text: &str) -> Result<(), DecodeError> {
        let Some(pattern) = self.0.current() else {
            trace!(tag, "Field outside of a pattern, ignored");
            return Ok(());
        };

        match tag {
            "pid" => {
                pattern.id = Some(number(tag, text)?);
                return Ok(());
            }
            "ln" => {
                pattern.length = number(tag, text)?;
                return Ok(());
            }
            "rtdir" => {
                pattern.direction = BusDirection::normalize(text);
                return Ok(());
            }
            _ => {}
        }

        let Some(point) = pattern.points.last_mut() else {
            trace!(tag, "Field outside of a point, ignored");
            return Ok(());
        };
        match tag {
            "seq" => point.sequence = number(tag, text)?,
            "lat" => point.position.latitude = number(tag, text)?,
            "lon" => point.position.longitude = number(tag, text)?,
            "typ" => point.kind = PointKind::from_code(text),
            "stpid" => point.stop_id = Some(number(tag, text)?),
            "stpnm" => point.stop_name = Some(text.to_string()),
            "pdist" => point.distance = Some(number(tag, text)?),
            _ => trace!(tag, "Unhandled tag"),
        }
        Ok(())
    }

    fn finish(self) -> Result<Self::Output, DecodeError> {
        let builders = self.0.finish();
        let total = builders.len();
        let patterns: Vec<BusPattern> = builders.into_iter().filter_map(PatternBuilder::build).collect();
        if patterns.len() < total {
            debug!(dropped = total - patterns.len(), "Patterns without pid dropped");
        }
        Ok(patterns)
    }
}

/// Decodes a `getpatterns` feed. A `<ptr>` block without a `pid` is dropped.
pub fn decode_bus_patterns<R: BufRead>(input: R) -> Result<Vec<BusPattern>, DecodeError> {
    let patterns = run(input, BusFeed(PatternsHandler::default()))?;
    debug!(kind = "bus-patterns", patterns = patterns.len(), "Feed decoded");
    Ok(patterns)
}

#[derive(Default)]
struct ArrivalsHandler(Records<BusArrival>);

impl FeedHandler for ArrivalsHandler {
    type Output = Vec<BusArrival>;

    fn text(&mut self, tag: &str, text: &str) -> Result<(), DecodeError> {
        if tag == "tmstmp" {
            self.0.begin(BusArrival {
                timestamp: Some(bus_time(tag, text)?),
                ..Default::default()
            });
            return Ok(());
        }
        let Some(arrival) = self.0.current() else {
            trace!(tag, "Field outside of a prediction, ignored");
            return Ok(());
        };
        match tag {
            "typ" => arrival.kind = PredictionKind::from_code(text),
            "stpnm" => arrival.stop_name = text.to_string(),
            "stpid" => arrival.stop_id = number(tag, text)?,
            "vid" => arrival.vehicle_id = number(tag, text)?,
            "dstp" => arrival.distance_to_stop = Some(number(tag, text)?),
            "rt" => arrival.route_id = text.trim().to_string(),
            "rtdir" => arrival.route_direction = BusDirection::normalize(text),
            "des" => arrival.destination = text.to_string(),
            "prdtm" => arrival.predicted_at = Some(bus_time(tag, text)?),
            "dly" => arrival.is_delayed = boolean(tag, text)?,
            _ => trace!(tag, "Unhandled tag"),
        }
        Ok(())
    }

    fn finish(self) -> Result<Self::Output, DecodeError> {
        Ok(self.0.finish())
    }
}

/// Decodes a `getpredictions` feed.
pub fn decode_bus_arrivals<R: BufRead>(input: R) -> Result<Vec<BusArrival>, DecodeError> {
    let arrivals = run(input, BusFeed(ArrivalsHandler::default()))?;
    debug!(kind = "bus-arrivals", arrivals = arrivals.len(), "Feed decoded");
    Ok(arrivals)
}

#[derive(Default)]
struct VehiclesHandler(Records<Bus>);

impl FeedHandler for VehiclesHandler {
    type Output = Vec<Bus>;

    fn start(&mut self, tag: &str, _element: &BytesStart<'_>) -> Result<(), DecodeError> {
        if tag == "vehicle" {
            self.0.begin(Bus::default());
        }
        Ok(())
    }

    fn text(&mut self, tag: &str, text: &str) -> Result<(), DecodeError> {
        let Some(bus) = self.0.current() else {
            trace!(tag, "Field outside of a vehicle, ignored");
            return Ok(());
        };
        match tag {
            "vid" => bus.id = number(tag, text)?,
            "tmstmp" => bus.timestamp = Some(bus_time(tag, text)?),
            "lat" => bus.position.latitude = number(tag, text)?,
            "lon" => bus.position.longitude = number(tag, text)?,
            "hdg" => bus.heading = Some(number(tag, text)?),
            "pid" => bus.pattern_id = number(tag, text)?,
            "pdist" => bus.pattern_distance = Some(number(tag, text)?),
            "rt" => bus.route_id = text.trim().to_string(),
            "des" => bus.destination = text.to_string(),
            "dly" => bus.is_delayed = boolean(tag, text)?,
            _ => trace!(tag, "Unhandled tag"),
        }
        Ok(())
    }

    fn finish(self) -> Result<Self::Output, DecodeError> {
        Ok(self.0.finish())
    }
}

/// Decodes a `getvehicles` feed.
///
/// An error payload fails the decode like every other feed kind; callers that
/// treat "no vehicles reported" as an empty list can match on
/// [`DecodeError::Feed`].
pub fn decode_bus_vehicles<R: BufRead>(input: R) -> Result<Vec<Bus>, DecodeError> {
    let buses = run(input, BusFeed(VehiclesHandler::default()))?;
    debug!(kind = "bus-vehicles", vehicles = buses.len(), "Feed decoded");
    Ok(buses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;

    #[test]
    fn test_routes() {
        let xml = "<bustime-response>\
            <route><rt>1</rt><rtnm>Bronzeville/Union Station</rtnm></route>\
            <route><rt>X9</rt><rtnm>Ashland Express</rtnm></route>\
            </bustime-response>";
        let routes = decode_bus_routes(xml.as_bytes()).unwrap();
        assert_eq!(
            routes,
            vec![
                BusRoute {
                    id: "1".into(),
                    name: "Bronzeville/Union Station".into()
                },
                BusRoute {
                    id: "X9".into(),
                    name: "Ashland Express".into()
                },
            ]
        );
    }

    #[test]
    fn test_routes_error_message() {
        let xml = "<bustime-response><msg>Invalid API key</msg></bustime-response>";
        let err = decode_bus_routes(xml.as_bytes()).unwrap_err();
        assert_eq!(err.feed_message(), Some("Invalid API key"));
    }

    #[test]
    fn test_directions_skip_unrecognized_text() {
        let xml = "<bustime-response><dir>East Bound</dir><note>Howard</note><dir>Westbound</dir></bustime-response>";
        let directions = decode_bus_directions(xml.as_bytes()).unwrap();
        assert_eq!(directions, vec![BusDirection::Eastbound, BusDirection::Westbound]);
    }

    #[test]
    fn test_stops() {
        let xml = "<bustime-response>\
            <stop><stpid>1836</stpid><stpnm>Clark &amp; Belmont</stpnm><lat>41.939</lat><lon>-87.651</lon></stop>\
            <stop><stpid>1837</stpid><stpnm>Clark &amp; School</stpnm><lat>41.941</lat><lon>-87.652</lon></stop>\
            </bustime-response>";
        let stops = decode_bus_stops(xml.as_bytes()).unwrap();
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].id, 1836);
        assert_eq!(stops[0].name, "Clark & Belmont");
        assert_eq!(stops[1].position, Position::new(41.941, -87.652));
    }

    #[test]
    fn test_stops_error_inside_error_element() {
        let xml = "<bustime-response><error><rt>22</rt><msg>No data found for parameter</msg></error></bustime-response>";
        let err = decode_bus_stops(xml.as_bytes()).unwrap_err();
        assert_eq!(err.feed_message(), Some("No data found for parameter"));
    }

    #[test]
    fn test_patterns() {
        let xml = "<bustime-response>\
            <ptr><pid>954</pid><ln>35569.0</ln><rtdir>North Bound</rtdir>\
              <pt><seq>1</seq><lat>41.87</lat><lon>-87.63</lon><typ>S</typ><stpid>1836</stpid><stpnm>Clark &amp; Harrison</stpnm><pdist>0.0</pdist></pt>\
              <pt><seq>2</seq><lat>41.88</lat><lon>-87.63</lon><typ>W</typ><pdist>120.5</pdist></pt>\
            </ptr>\
            </bustime-response>";
        let patterns = decode_bus_patterns(xml.as_bytes()).unwrap();
        assert_eq!(patterns.len(), 1);

        let pattern = &patterns[0];
        assert_eq!(pattern.id, 954);
        assert_eq!(pattern.length, 35569.0);
        assert_eq!(pattern.direction, "Northbound");
        assert_eq!(pattern.points.len(), 2);
        assert!(pattern.points[0].is_stop());
        assert_eq!(pattern.points[0].stop_id, Some(1836));
        assert_eq!(pattern.points[0].stop_name.as_deref(), Some("Clark & Harrison"));
        assert_eq!(pattern.points[1].kind, PointKind::Waypoint);
        assert_eq!(pattern.points[1].stop_id, None);
        assert_eq!(pattern.points[1].distance, Some(120.5));
    }

    #[test]
    fn test_pattern_without_pid_is_dropped() {
        let xml = "<bustime-response>\
            <ptr><ln>100.0</ln><rtdir>Eastbound</rtdir><pt><seq>1</seq></pt></ptr>\
            <ptr><pid>955</pid><ln>200.0</ln><rtdir>Westbound</rtdir></ptr>\
            </bustime-response>";
        let patterns = decode_bus_patterns(xml.as_bytes()).unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].id, 955);
    }

    #[test]
    fn test_arrivals() {
        let xml = "<bustime-response>\
            <prd><tmstmp>20240618 23:26</tmstmp><typ>A</typ><stpnm>Clark &amp; Belmont</stpnm><stpid>1836</stpid>\
              <vid>1966</vid><dstp>3150</dstp><rt>22</rt><rtdir>Northbound</rtdir><des>Howard</des>\
              <prdtm>20240618 23:35</prdtm><dly>false</dly></prd>\
            <prd><tmstmp>20240618 23:26</tmstmp><stpnm>Clark &amp; Belmont</stpnm><stpid>1836</stpid>\
              <vid>1970</vid><rt>22</rt><rtdir>North Bound</rtdir><des>Howard</des>\
              <prdtm>20240618 23:44</prdtm><dly>1</dly></prd>\
            </bustime-response>";
        let arrivals = decode_bus_arrivals(xml.as_bytes()).unwrap();
        assert_eq!(arrivals.len(), 2);
        assert_eq!(arrivals[0].kind, Some(PredictionKind::Arrival));
        assert_eq!(arrivals[0].vehicle_id, 1966);
        assert_eq!(arrivals[0].distance_to_stop, Some(3150));
        assert!(!arrivals[0].is_delayed);
        assert_eq!(arrivals[1].kind, None);
        assert_eq!(arrivals[1].route_direction, "Northbound");
        assert!(arrivals[1].is_delayed);
    }

    #[test]
    fn test_vehicles() {
        let xml = "<bustime-response>\
            <vehicle><vid>1966</vid><tmstmp>20240618 23:25</tmstmp><lat>41.93</lat><lon>-87.64</lon>\
              <hdg>358</hdg><pid>954</pid><pdist>8000</pdist><rt>22</rt><des>Howard</des><dly>false</dly></vehicle>\
            <vehicle><vid>1970</vid><lat>41.90</lat><lon>-87.63</lon><hdg>1</hdg><pid>954</pid><rt>22</rt></vehicle>\
            </bustime-response>";
        let buses = decode_bus_vehicles(xml.as_bytes()).unwrap();
        assert_eq!(buses.len(), 2);
        assert_eq!(buses[0].id, 1966);
        assert_eq!(buses[0].heading, Some(358));
        assert_eq!(buses[0].pattern_distance, Some(8000.0));
        assert_eq!(buses[1].position, Position::new(41.90, -87.63));
    }

    #[test]
    fn test_vehicles_error_payload_fails() {
        let xml = "<bustime-response><error><msg>No data found for parameter</msg></error></bustime-response>";
        let err = decode_bus_vehicles(xml.as_bytes()).unwrap_err();
        assert_eq!(err.feed_message(), Some("No data found for parameter"));
    }

    #[test]
    fn test_empty_error_element_fails() {
        let xml = "<bustime-response><error /></bustime-response>";
        let err = decode_bus_vehicles(xml.as_bytes()).unwrap_err();
        assert_eq!(err.feed_message(), Some(MISSING_ERROR_MESSAGE));
    }

    #[test]
    fn test_invalid_number_fails() {
        let xml = "<bustime-response><stop><stpid>abc</stpid></stop></bustime-response>";
        let err = decode_bus_stops(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidNumber { .. }));
    }
}
