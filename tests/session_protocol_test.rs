//! End-to-end exchanges against the mock instrument.

use atlas_daq::mock::{FrameBuilder, MockLink};
use atlas_daq::protocol::{FrameState, RawSample};
use atlas_daq::{AtlasError, InstrumentSession};

fn session(link: MockLink) -> InstrumentSession<MockLink> {
    InstrumentSession::from_link("mock", link)
}

fn ohms(samples: Vec<RawSample>) -> Vec<u32> {
    samples.into_iter().map(u32::from).collect()
}

#[test]
fn test_resistances_in_emission_order() {
    let frame = FrameBuilder::new()
        .header_line("Atlas")
        .ohms([100, 5_000, 10_000, 262_136]);
    let mut atlas = session(MockLink::new(&frame));

    assert_eq!(
        ohms(atlas.read_resistances().unwrap()),
        vec![100, 5_000, 10_000, 262_136]
    );
}

#[test]
fn test_byte_at_a_time_delivery() {
    let mut atlas = session(MockLink::new(&FrameBuilder::demo()).with_chunk_size(1));

    let frame = atlas.read_frame().unwrap();
    assert_eq!(frame.header, vec!["Atlas thermistor array", "fw 1.4 ch 4"]);
    assert_eq!(frame.footer[2], "ref 2.048");
    assert_eq!(ohms(frame.samples), vec![10_000, 9_500, 0, 12_000]);
}

#[test]
fn test_sentinel_ends_the_batch() {
    let frame = FrameBuilder::new()
        .ohms([400])
        .word([0xFF, 0xFF])
        .ohms([800]);
    let mut atlas = session(MockLink::new(&frame));

    assert_eq!(ohms(atlas.read_resistances().unwrap()), vec![400]);
}

#[test]
fn test_empty_payload() {
    let mut atlas = session(MockLink::new(&FrameBuilder::new()));
    assert!(atlas.read_resistances().unwrap().is_empty());
    assert!(atlas.read_celsius(2).unwrap().is_empty());
}

#[test]
fn test_celsius_rounding_and_out_of_range() {
    let frame = FrameBuilder::new().ohms([10_000, 100, 96, 100_000]);
    let mut atlas = session(MockLink::new(&frame));

    assert_eq!(
        atlas.read_celsius(1).unwrap(),
        vec![Some(24.7), Some(197.6), None, Some(-26.6)]
    );
}

#[test]
fn test_repeated_reads_are_independent() {
    let mut atlas = session(MockLink::new(&FrameBuilder::demo()));

    let first = atlas.read_celsius(2).unwrap();
    let second = atlas.read_celsius(2).unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0], Some(24.68));
    assert_eq!(first[2], None);
    assert_eq!(atlas.link().written(), b"rr");
}

#[test]
fn test_timeout_mid_payload_returns_no_samples() {
    // 11 bytes of terminator and footer, then one word of the two
    let frame = FrameBuilder::new().ohms([10_000, 12_000]);
    let mut atlas = session(MockLink::new(&frame).cut_after(13));

    let err = atlas.read_resistances().unwrap_err();
    assert!(matches!(
        err,
        AtlasError::ProtocolTimeout {
            phase: FrameState::ReadingPayload
        }
    ));
    assert!(err.is_retryable());
}

#[test]
fn test_timeout_mid_word() {
    let frame = FrameBuilder::new().ohms([10_000]);
    let mut atlas = session(MockLink::new(&frame).cut_after(12));

    assert!(matches!(
        atlas.read_resistances(),
        Err(AtlasError::ProtocolTimeout {
            phase: FrameState::ReadingPayload
        })
    ));
}

#[test]
fn test_timeout_in_footer_reports_remaining_lines() {
    let frame = FrameBuilder::new().footer(["a", "b", "c", "d"]);
    // terminator plus two footer lines
    let mut atlas = session(MockLink::new(&frame).cut_after(9));

    let err = atlas.read_resistances().unwrap_err();
    assert!(matches!(
        err,
        AtlasError::ProtocolTimeout {
            phase: FrameState::ReadingFooter { remaining: 2 }
        }
    ));
    assert!(err.to_string().contains("2 lines left"));
}

#[test]
fn test_missing_sentinel_times_out() {
    let frame = FrameBuilder::new().ohms([10_000]).unterminated();
    let mut atlas = session(MockLink::new(&frame));

    assert!(matches!(
        atlas.read_resistances(),
        Err(AtlasError::ProtocolTimeout {
            phase: FrameState::ReadingPayload
        })
    ));
}
