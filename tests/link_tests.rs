//! Framed reads over mocked byte streams: partial blocks, noise, EOF and
//! inter-character timeouts.

use iec62056_rs::error::Iec62056Error;
use iec62056_rs::iec::bcc::{add_bcc, bcc_valid};
use iec62056_rs::iec::link::{read_frame, Link};
use iec62056_rs::iec::message::{AnswerDataMessage, WireMessage};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_test::io::Builder;

const WAIT: Duration = Duration::from_secs(1);

const ACK: &[u8] = &[0x06];
const NAK: &[u8] = &[0x15];

#[tokio::test]
async fn test_partial_blocks_are_acknowledged_and_joined() {
    let first = add_bcc(b"\x021.8.0(0001234.5*kWh)\x04").unwrap();
    let last = add_bcc(b"\x022.8.0(0000012.0*kWh)\r\n!\r\n\x03").unwrap();

    let mut mock = Builder::new()
        .read(&first)
        .write(ACK)
        .read(&last)
        .build();

    let frame = read_frame(&mut mock, WAIT).await.unwrap();
    assert!(bcc_valid(&frame));
    assert_eq!(
        frame,
        add_bcc(b"\x021.8.0(0001234.5*kWh)2.8.0(0000012.0*kWh)\r\n!\r\n\x03").unwrap()
    );

    let answer = AnswerDataMessage::from_bytes(&frame).unwrap();
    assert_eq!(answer.data.len(), 2);
    assert_eq!(answer.data[1].address.as_deref(), Some("2.8.0"));
}

#[tokio::test]
async fn test_value_split_across_blocks_is_joined_whole() {
    let first = add_bcc(b"\x021.8.0(00012\x04").unwrap();
    let last = add_bcc(b"\x0234.5*kWh)\r\n!\r\n\x03").unwrap();

    let mut mock = Builder::new().read(&first).write(ACK).read(&last).build();

    let frame = read_frame(&mut mock, WAIT).await.unwrap();
    let answer = AnswerDataMessage::from_bytes(&frame).unwrap();
    assert_eq!(answer.data.len(), 1);
    assert_eq!(answer.data[0].value, "0001234.5");
    assert_eq!(answer.data[0].unit.as_deref(), Some("kWh"));
}

#[tokio::test]
async fn test_corrupt_partial_block_is_repeated() {
    let good = add_bcc(b"\x02(1)\x04").unwrap();
    let mut bad = good.clone();
    bad[2] ^= 0x01;
    let last = add_bcc(b"\x02(2)\x03").unwrap();

    let mut mock = Builder::new()
        .read(&bad)
        .write(NAK)
        .read(&good)
        .write(ACK)
        .read(&last)
        .build();

    let frame = read_frame(&mut mock, WAIT).await.unwrap();
    let answer = AnswerDataMessage::from_bytes(&frame).unwrap();
    let values: Vec<&str> = answer.data.iter().map(|d| d.value.as_str()).collect();
    assert_eq!(values, vec!["1", "2"]);
}

#[tokio::test]
async fn test_corrupt_final_block_is_checksum_error() {
    let first = add_bcc(b"\x02(1)\x04").unwrap();
    let mut last = add_bcc(b"\x02(2)\x03").unwrap();
    *last.last_mut().unwrap() ^= 0x01;

    let mut mock = Builder::new().read(&first).write(ACK).read(&last).build();

    assert!(matches!(
        read_frame(&mut mock, WAIT).await,
        Err(Iec62056Error::Checksum { .. })
    ));
}

#[tokio::test]
async fn test_command_frame_ends_the_read() {
    let challenge = add_bcc(b"\x01P0\x02(1234567)\x03").unwrap();
    let mut mock = Builder::new().read(&challenge).build();
    assert_eq!(read_frame(&mut mock, WAIT).await.unwrap(), challenge);
}

#[tokio::test]
async fn test_link_times_out_on_silent_meter() {
    let (near, _far) = tokio::io::duplex(64);
    let mut link = Link::new(Duration::from_millis(50));
    link.attach(near);

    match link.read().await {
        Err(Iec62056Error::Timeout { operation }) => assert_eq!(operation, "read"),
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn test_link_requires_connection() {
    let mut link: Link<tokio::io::DuplexStream> = Link::new(Duration::from_millis(50));
    assert!(!link.is_connected());
    assert!(matches!(
        link.send(b"/?!\r\n").await,
        Err(Iec62056Error::Transport(_))
    ));
}

#[tokio::test]
async fn test_link_recv_exact() {
    let (near, mut far) = tokio::io::duplex(64);
    let mut link = Link::new(Duration::from_secs(1));
    link.attach(near);

    far.write_all(&[0x06, 0x15]).await.unwrap();
    assert_eq!(link.recv(1).await.unwrap(), vec![0x06]);
    assert_eq!(link.recv(1).await.unwrap(), vec![0x15]);
}

#[tokio::test]
async fn test_slow_meter_within_inter_char_timeout_is_read() {
    let frame = add_bcc(b"\x021.8.0(0001234.5*kWh)\x03").unwrap();
    let (near, mut far) = tokio::io::duplex(64);
    let mut link = Link::new(Duration::from_millis(300));
    link.attach(near);

    let expected = frame.clone();
    let writer = tokio::spawn(async move {
        for byte in frame {
            far.write_all(&[byte]).await.unwrap();
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        far
    });

    // the whole frame takes far longer than the timeout to arrive
    assert!(expected.len() as u64 * 30 > 300);
    assert_eq!(link.read().await.unwrap(), expected);
    drop(writer.await.unwrap());
}

#[tokio::test]
async fn test_meter_going_quiet_mid_frame_times_out() {
    let (near, mut far) = tokio::io::duplex(64);
    let mut link = Link::new(Duration::from_millis(50));
    link.attach(near);

    far.write_all(b"\x02(1").await.unwrap();
    match link.read().await {
        Err(Iec62056Error::Timeout { operation }) => assert_eq!(operation, "read"),
        other => panic!("unexpected result {other:?}"),
    }
}
