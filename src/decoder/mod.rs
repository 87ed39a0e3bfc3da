//! Streaming decoder for the CTA Train Tracker and Bus Tracker XML feeds.
//!
//! Each feed kind is a [`FeedHandler`] fed by one pass of `quick-xml`'s pull
//! reader: start tags may open a new record, text is dispatched on the name of
//! the element that is currently open, end tags close it. The record being
//! filled lives inside the handler, which is created per decode call, so
//! decoding needs no shared state and any number of decodes can run at once.

mod bus;
mod fields;
mod train;

use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Serialize;

use crate::error::DecodeError;
use crate::model::{Bus, BusArrival, BusDirection, BusPattern, BusRoute, BusStop, Eta, Train, TrainArrival};
use crate::topology::TrainTopology;

pub use bus::{
    decode_bus_arrivals, decode_bus_directions, decode_bus_patterns, decode_bus_routes, decode_bus_stops,
    decode_bus_vehicles,
};
pub use train::{decode_train_arrivals, decode_train_follow, decode_train_positions};

/// Decoded arrivals, one entry per station id.
pub type TrainArrivals = BTreeMap<u32, TrainArrival>;

/// The CTA endpoints this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedKind {
    TrainArrivals,
    TrainPositions,
    TrainFollow,
    BusRoutes,
    BusDirections,
    BusStops,
    BusPatterns,
    BusArrivals,
    BusVehicles,
}

impl FeedKind {
    pub const ALL: [FeedKind; 9] = [
        FeedKind::TrainArrivals,
        FeedKind::TrainPositions,
        FeedKind::TrainFollow,
        FeedKind::BusRoutes,
        FeedKind::BusDirections,
        FeedKind::BusStops,
        FeedKind::BusPatterns,
        FeedKind::BusArrivals,
        FeedKind::BusVehicles,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeedKind::TrainArrivals => "train-arrivals",
            FeedKind::TrainPositions => "train-positions",
            FeedKind::TrainFollow => "train-follow",
            FeedKind::BusRoutes => "bus-routes",
            FeedKind::BusDirections => "bus-directions",
            FeedKind::BusStops => "bus-stops",
            FeedKind::BusPatterns => "bus-patterns",
            FeedKind::BusArrivals => "bus-arrivals",
            FeedKind::BusVehicles => "bus-vehicles",
        }
    }

    /// Whether decoding this kind consults the train reference dataset.
    pub fn needs_topology(self) -> bool {
        matches!(self, FeedKind::TrainArrivals | FeedKind::TrainFollow)
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeedKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = FeedKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown feed kind '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// The result of [`decode`], one variant per [`FeedKind`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Decoded {
    TrainArrivals(TrainArrivals),
    TrainPositions(Vec<Train>),
    TrainFollow(Vec<Eta>),
    BusRoutes(Vec<BusRoute>),
    BusDirections(Vec<BusDirection>),
    BusStops(Vec<BusStop>),
    BusPatterns(Vec<BusPattern>),
    BusArrivals(Vec<BusArrival>),
    BusVehicles(Vec<Bus>),
}

impl Decoded {
    pub fn kind(&self) -> FeedKind {
        match self {
            Decoded::TrainArrivals(_) => FeedKind::TrainArrivals,
            Decoded::TrainPositions(_) => FeedKind::TrainPositions,
            Decoded::TrainFollow(_) => FeedKind::TrainFollow,
            Decoded::BusRoutes(_) => FeedKind::BusRoutes,
            Decoded::BusDirections(_) => FeedKind::BusDirections,
            Decoded::BusStops(_) => FeedKind::BusStops,
            Decoded::BusPatterns(_) => FeedKind::BusPatterns,
            Decoded::BusArrivals(_) => FeedKind::BusArrivals,
            Decoded::BusVehicles(_) => FeedKind::BusVehicles,
        }
    }

    /// Number of top-level records (stations for arrivals).
    pub fn len(&self) -> usize {
        match self {
            Decoded::TrainArrivals(v) => v.len(),
            Decoded::TrainPositions(v) => v.len(),
            Decoded::TrainFollow(v) => v.len(),
            Decoded::BusRoutes(v) => v.len(),
            Decoded::BusDirections(v) => v.len(),
            Decoded::BusStops(v) => v.len(),
            Decoded::BusPatterns(v) => v.len(),
            Decoded::BusArrivals(v) => v.len(),
            Decoded::BusVehicles(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decodes `input` as a feed of the given kind.
///
/// `topology` is only consulted for [`FeedKind::TrainArrivals`] and
/// [`FeedKind::TrainFollow`]; pass an empty one for the other kinds.
pub fn decode<R: BufRead>(kind: FeedKind, input: R, topology: &TrainTopology) -> Result<Decoded, DecodeError> {
    Ok(match kind {
        FeedKind::TrainArrivals => Decoded::TrainArrivals(decode_train_arrivals(input, topology)?),
        FeedKind::TrainPositions => Decoded::TrainPositions(decode_train_positions(input)?),
        FeedKind::TrainFollow => Decoded::TrainFollow(decode_train_follow(input, topology)?),
        FeedKind::BusRoutes => Decoded::BusRoutes(decode_bus_routes(input)?),
        FeedKind::BusDirections => Decoded::BusDirections(decode_bus_directions(input)?),
        FeedKind::BusStops => Decoded::BusStops(decode_bus_stops(input)?),
        FeedKind::BusPatterns => Decoded::BusPatterns(decode_bus_patterns(input)?),
        FeedKind::BusArrivals => Decoded::BusArrivals(decode_bus_arrivals(input)?),
        FeedKind::BusVehicles => Decoded::BusVehicles(decode_bus_vehicles(input)?),
    })
}

/// Receives the tag events of one feed and builds its result.
pub(crate) trait FeedHandler {
    type Output;

    fn start(&mut self, _tag: &str, _element: &BytesStart<'_>) -> Result<(), DecodeError> {
        Ok(())
    }

    /// Text directly inside the currently open element `tag`.
    fn text(&mut self, tag: &str, text: &str) -> Result<(), DecodeError>;

    fn end(&mut self, _tag: &str) -> Result<(), DecodeError> {
        Ok(())
    }

    fn finish(self) -> Result<Self::Output, DecodeError>;
}

/// Drives `handler` over every event of `input` in a single pass.
pub(crate) fn run<R: BufRead, H: FeedHandler>(input: R, mut handler: H) -> Result<H::Output, DecodeError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut open: Vec<String> = Vec::new();
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let tag = tag_name(e.name().as_ref());
                handler.start(&tag, &e)?;
                open.push(tag.clone());
                seen_root = true;
                current = Some(tag);
            }
            Event::Empty(e) => {
                let tag = tag_name(e.name().as_ref());
                handler.start(&tag, &e)?;
                handler.end(&tag)?;
                seen_root = true;
                current = None;
            }
            Event::Text(e) => {
                if let Some(tag) = current.as_deref() {
                    let text = e.unescape()?;
                    handler.text(tag, &text)?;
                }
            }
            Event::CData(e) => {
                if let Some(tag) = current.as_deref() {
                    let text = e.decode().map_err(quick_xml::Error::from)?;
                    handler.text(tag, text.trim())?;
                }
            }
            Event::End(e) => {
                let tag = tag_name(e.name().as_ref());
                handler.end(&tag)?;
                open.pop();
                current = None;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(tag) = open.last() {
        return Err(DecodeError::Incomplete(format!("input ended inside <{tag}>")));
    }
    if !seen_root {
        return Err(DecodeError::Incomplete("no root element".to_string()));
    }

    handler.finish()
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// Reads one attribute of a start tag, unescaped.
pub(crate) fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, DecodeError> {
    let attr = element
        .try_get_attribute(name)
        .map_err(quick_xml::Error::from)?;
    match attr {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// The output list of one repeating group plus the record currently being
/// filled. A record is appended when the next one begins or the feed ends,
/// and is never touched again after that.
pub(crate) struct Records<T> {
    done: Vec<T>,
    current: Option<T>,
}

impl<T> Default for Records<T> {
    fn default() -> Self {
        Self {
            done: Vec::new(),
            current: None,
        }
    }
}

impl<T> Records<T> {
    pub(crate) fn begin(&mut self, record: T) {
        if let Some(previous) = self.current.replace(record) {
            self.done.push(previous);
        }
    }

    pub(crate) fn current(&mut self) -> Option<&mut T> {
        self.current.as_mut()
    }

    pub(crate) fn finish(mut self) -> Vec<T> {
        self.done.extend(self.current.take());
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every event as a line, to check what the driver delivers.
    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl FeedHandler for Recorder {
        type Output = Vec<String>;

        fn start(&mut self, tag: &str, element: &BytesStart<'_>) -> Result<(), DecodeError> {
            match attribute(element, "name")? {
                Some(name) => self.0.push(format!("start {tag} name={name}")),
                None => self.0.push(format!("start {tag}")),
            }
            Ok(())
        }

        fn text(&mut self, tag: &str, text: &str) -> Result<(), DecodeError> {
            self.0.push(format!("text {tag}={text}"));
            Ok(())
        }

        fn end(&mut self, tag: &str) -> Result<(), DecodeError> {
            self.0.push(format!("end {tag}"));
            Ok(())
        }

        fn finish(self) -> Result<Self::Output, DecodeError> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_driver_events() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<root>
  <route name="red"><rn>004</rn></route>
  <flags/>
  <destNm>Harlem &amp; Lake</destNm>
</root>"#;
        let events = run(&xml[..], Recorder::default()).unwrap();
        assert_eq!(
            events,
            vec![
                "start root",
                "start route name=red",
                "start rn",
                "text rn=004",
                "end rn",
                "end route",
                "start flags",
                "end flags",
                "start destNm",
                "text destNm=Harlem & Lake",
                "end destNm",
                "end root",
            ]
        );
    }

    #[test]
    fn test_driver_rejects_mismatched_tags() {
        let err = run(&b"<ctatt><eta></ctatt>"[..], Recorder::default()).unwrap_err();
        assert!(matches!(err, DecodeError::Xml(_)));
    }

    #[test]
    fn test_driver_rejects_unclosed_root() {
        let err = run(&b"<ctatt><tmst>20240618 23:26:50</tmst>"[..], Recorder::default()).unwrap_err();
        assert!(matches!(err, DecodeError::Incomplete(ref msg) if msg == "input ended inside <ctatt>"));
    }

    #[test]
    fn test_driver_rejects_empty_input() {
        for input in [&b""[..], &b"<?xml version=\"1.0\"?>\n"[..]] {
            let err = run(input, Recorder::default()).unwrap_err();
            assert!(matches!(err, DecodeError::Incomplete(_)));
        }
    }

    #[test]
    fn test_driver_accepts_empty_root() {
        let events = run(&b"<bustime-response/>"[..], Recorder::default()).unwrap();
        assert_eq!(events, vec!["start bustime-response", "end bustime-response"]);
    }

    #[test]
    fn test_driver_cdata_text() {
        let xml = b"<root><des><![CDATA[ Harlem & Lake ]]></des></root>";
        let events = run(&xml[..], Recorder::default()).unwrap();
        assert!(events.contains(&"text des=Harlem & Lake".to_string()));
    }

    #[test]
    fn test_records_appends_on_next_begin() {
        let mut records = Records::default();
        assert!(records.current().is_none());
        records.begin(1);
        records.begin(2);
        if let Some(r) = records.current() {
            *r += 10;
        }
        assert_eq!(records.finish(), vec![1, 12]);
    }

    #[test]
    fn test_feed_kind_names() {
        for kind in FeedKind::ALL {
            assert_eq!(kind.as_str().parse::<FeedKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.as_str());
        }
        assert!("trains".parse::<FeedKind>().is_err());
        assert!(FeedKind::TrainFollow.needs_topology());
        assert!(!FeedKind::BusRoutes.needs_topology());
    }

    #[test]
    fn test_decode_dispatches_by_kind() {
        let xml = b"<bustime-response><route><rt>22</rt><rtnm>Clark</rtnm></route></bustime-response>";
        let decoded = decode(FeedKind::BusRoutes, &xml[..], &TrainTopology::default()).unwrap();
        assert_eq!(decoded.kind(), FeedKind::BusRoutes);
        assert_eq!(decoded.len(), 1);
        assert!(!decoded.is_empty());
    }
}
