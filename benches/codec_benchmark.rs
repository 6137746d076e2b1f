use criterion::{black_box, criterion_group, criterion_main, Criterion};
use iec62056_rs::iec::bcc::{add_bcc, bcc_valid};
use iec62056_rs::iec::message::{AnswerDataMessage, WireMessage};
use iec62056_rs::payload::profile::arrange;

fn readout_frame(registers: usize) -> Vec<u8> {
    let mut message = vec![0x02];
    for i in 0..registers {
        message.extend(format!("1.8.{}({:010.3}*kWh)\r\n", i % 10, i as f64 * 1.5).bytes());
    }
    message.extend(b"!\r\n\x03");
    add_bcc(&message).unwrap()
}

fn benchmark_decode_answer(c: &mut Criterion) {
    let frame = readout_frame(64);

    c.bench_function("decode_answer_64", |b| {
        b.iter(|| {
            let answer = AnswerDataMessage::from_bytes(black_box(&frame));
            let _ = black_box(answer);
        })
    });

    c.bench_function("bcc_valid_64", |b| b.iter(|| bcc_valid(black_box(&frame))));
}

fn benchmark_arrange_profile(c: &mut Criterion) {
    let mut message = b"\x02P.01(0)\r\n".to_vec();
    for row in 0..96 {
        message.extend(format!("(21010{}{:02}{:02})", 5, row / 4, (row % 4) * 15).bytes());
        for value in 0..8 {
            message.extend(format!("({value}.{row})").bytes());
        }
        message.extend(b"\r\n");
    }
    message.push(0x03);
    let answer = AnswerDataMessage::from_bytes(&add_bcc(&message).unwrap()).unwrap();

    c.bench_function("arrange_makel_day", |b| {
        b.iter(|| {
            let records = arrange("MSY", black_box(&answer.data));
            let _ = black_box(records);
        })
    });
}

criterion_group!(benches, benchmark_decode_answer, benchmark_arrange_profile);
criterion_main!(benches);
