//! Block check character tests, including property tests over random frames.

use iec62056_rs::error::Iec62056Error;
use iec62056_rs::iec::bcc::{add_bcc, bcc_valid, calculate_bcc, verify_bcc};
use proptest::prelude::*;

#[test]
fn test_break_message_bcc() {
    // SOH B 0 ETX -> 'B' ^ '0' ^ ETX = 0x71
    assert_eq!(calculate_bcc(b"\x01B0\x03"), 0x71);
    assert_eq!(add_bcc(b"\x01B0\x03").unwrap(), b"\x01B0\x03\x71".to_vec());
}

#[test]
fn test_span_starts_after_first_start_char() {
    // Leading bytes before SOH do not count.
    assert_eq!(calculate_bcc(b"\x7f\x01B0\x03"), calculate_bcc(b"\x01B0\x03"));
    // A command carrying a data block starts at SOH, not at the inner STX.
    let frame = add_bcc(b"\x01R1\x021.8.0(1)\x03").unwrap();
    assert!(bcc_valid(&frame));
}

#[test]
fn test_high_bit_is_ignored() {
    assert_eq!(calculate_bcc(b"\x02\xc1\x03"), calculate_bcc(b"\x02\x41\x03"));
}

#[test]
fn test_verify_reports_expected_and_calculated() {
    let mut frame = add_bcc(b"\x02(1)\x03").unwrap();
    let good = *frame.last().unwrap();
    *frame.last_mut().unwrap() ^= 0x01;

    match verify_bcc(&frame) {
        Err(Iec62056Error::Checksum {
            expected,
            calculated,
            raw,
        }) => {
            assert_eq!(expected, good ^ 0x01);
            assert_eq!(calculated, good);
            assert_eq!(raw, frame);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_frame_without_start_char() {
    assert!(matches!(
        add_bcc(b"no start"),
        Err(Iec62056Error::Framing { .. })
    ));
    assert!(!bcc_valid(b"(1)\x03\x00"));
}

proptest! {
    #[test]
    fn prop_added_bcc_validates(body in proptest::collection::vec(0x20u8..0x7f, 0..64)) {
        let mut message = vec![0x02];
        message.extend(&body);
        message.push(0x03);
        let frame = add_bcc(&message).unwrap();
        prop_assert!(bcc_valid(&frame));
    }

    #[test]
    fn prop_single_bit_flip_is_detected(
        body in proptest::collection::vec(0x20u8..0x7f, 1..64),
        index in any::<prop::sample::Index>(),
        bit in 0u8..7,
    ) {
        let mut message = vec![0x02];
        message.extend(&body);
        message.push(0x03);
        let mut frame = add_bcc(&message).unwrap();

        // anything after the STX, BCC included
        let i = 1 + index.index(frame.len() - 1);
        frame[i] ^= 1 << bit;
        prop_assert!(!bcc_valid(&frame));
    }
}
