use cta_feeds::arrivals::ArrivalFilter;
use cta_feeds::decoder::{
    decode_bus_patterns, decode_bus_routes, decode_bus_vehicles, decode_train_arrivals, decode_train_follow,
};
use cta_feeds::model::{TrainDirection, TrainLine};
use cta_feeds::summary::DecodeSummary;
use cta_feeds::{DecodeError, FeedKind, TrainTopology, decode};

fn topology() -> TrainTopology {
    TrainTopology::from_reader(&include_bytes!("fixtures/l_stops.csv")[..]).expect("Failed to load topology")
}

#[test]
fn test_arrivals_one_entry_per_station() {
    let bytes = include_bytes!("fixtures/train_arrivals.xml");
    let arrivals = decode_train_arrivals(&bytes[..], &topology()).expect("Failed to parse feed");

    assert_eq!(arrivals.len(), 2);
    assert_eq!(arrivals[&40380].etas.len(), 3);
    assert_eq!(arrivals[&40460].etas.len(), 1);
    assert_eq!(arrivals[&40380].station_name, "Clark/Lake");
}

#[test]
fn test_arrivals_loop_destination() {
    let bytes = include_bytes!("fixtures/train_arrivals.xml");
    let arrivals = decode_train_arrivals(&bytes[..], &topology()).expect("Failed to parse feed");

    let eta = &arrivals[&40460].etas[0];
    assert_eq!(eta.line, TrainLine::Brown);
    assert_eq!(eta.destination_name, "Loop");
    assert!(eta.is_scheduled);
}

#[test]
fn test_arrivals_filter_and_sort() {
    let bytes = include_bytes!("fixtures/train_arrivals.xml");
    let arrivals = decode_train_arrivals(&bytes[..], &topology()).expect("Failed to parse feed");
    let clark = &arrivals[&40380];

    let all = clark.filtered(&ArrivalFilter::default());
    let runs: Vec<&str> = all.iter().map(|e| e.run_number.as_str()).collect();
    assert_eq!(runs, vec!["005", "716", "412"]);

    // 30075 is the westbound (Outer Loop) platform
    let mut filter = ArrivalFilter::default();
    filter.exclude(40380, TrainLine::Pink, TrainDirection::West);
    let shown = clark.filtered(&filter);
    let runs: Vec<&str> = shown.iter().map(|e| e.run_number.as_str()).collect();
    assert_eq!(runs, vec!["005", "412"]);
}

#[test]
fn test_follow_sorted_by_arrival() {
    let bytes = include_bytes!("fixtures/train_follow.xml");
    let etas = decode_train_follow(&bytes[..], &topology()).expect("Failed to parse feed");

    let stations: Vec<u32> = etas.iter().map(|e| e.station_id).collect();
    assert_eq!(stations, vec![40460, 40710]);
    assert!(etas.iter().all(|e| e.line == TrainLine::Brown));
    // the follow feed's <position> block is not an eta
    assert!(etas.iter().all(|e| e.position.is_none()));
}

#[test]
fn test_decoding_twice_gives_equal_results() {
    let bytes = include_bytes!("fixtures/train_arrivals.xml");
    let topology = topology();
    let first = decode(FeedKind::TrainArrivals, &bytes[..], &topology).expect("Failed to parse feed");
    let second = decode(FeedKind::TrainArrivals, &bytes[..], &topology).expect("Failed to parse feed");
    assert_eq!(first, second);
}

#[test]
fn test_pattern_without_pid_dropped() {
    let bytes = include_bytes!("fixtures/bus_patterns.xml");
    let patterns = decode_bus_patterns(&bytes[..]).expect("Failed to parse feed");

    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].id, 954);
    assert_eq!(patterns[0].direction, "Northbound");
    assert_eq!(patterns[0].stops().count(), 2);
}

#[test]
fn test_routes_error_payload() {
    let bytes = include_bytes!("fixtures/bus_routes_error.xml");
    let err = decode_bus_routes(&bytes[..]).unwrap_err();
    assert!(matches!(err, DecodeError::Feed(ref msg) if msg == "Invalid API key"));
}

#[test]
fn test_vehicles_error_payload_is_a_failure() {
    let bytes = include_bytes!("fixtures/bus_vehicles_error.xml");
    let err = decode_bus_vehicles(&bytes[..]).unwrap_err();
    assert_eq!(err.feed_message(), Some("No data found for parameter"));
}

#[test]
fn test_malformed_xml() {
    let err = decode_bus_routes(&b"<bustime-response><route></bustime-response>"[..]).unwrap_err();
    assert!(matches!(err, DecodeError::Xml(_)));
}

#[test]
fn test_summary_from_fixture() {
    let bytes = include_bytes!("fixtures/train_arrivals.xml");
    let decoded = decode(FeedKind::TrainArrivals, &bytes[..], &topology()).expect("Failed to parse feed");
    let summary = DecodeSummary::from_decoded(&decoded);

    assert_eq!(summary.records, 2);
    assert_eq!(summary.etas, 4);
    assert_eq!(summary.delayed, 1);
    assert_eq!(summary.approaching, 1);
    assert_eq!(summary.with_position, 4);
}

#[test]
fn test_truncated_route_list_fails() {
    let xml = b"<bustime-response><route><rt>22</rt><rtnm>Clark</rtnm>";
    let err = decode_bus_routes(&xml[..]).unwrap_err();
    assert!(matches!(err, DecodeError::Incomplete(_)));
}

#[test]
fn test_cut_off_eta_fails() {
    let xml = b"<ctatt><errCd>0</errCd><eta><staId>40380</staId><rn>4";
    let err = decode_train_arrivals(&xml[..], &topology()).unwrap_err();
    assert!(matches!(err, DecodeError::Incomplete(_)));
    assert_eq!(err.kind(), "incomplete_document");
}

#[test]
fn test_empty_body_fails_for_every_kind() {
    let topology = topology();
    for kind in FeedKind::ALL {
        let err = decode(kind, &b""[..], &topology).unwrap_err();
        assert!(matches!(err, DecodeError::Incomplete(_)), "{kind} accepted an empty body");
    }
}
