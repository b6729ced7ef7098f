//! Benchmark for PPMP payload construction, serialization and validation.
//!
//! Builds a measurement payload and a process payload holding a large
//! number of samples plus a message payload with one message per hundred
//! samples, then times encoding, decoding and the `problems()` walk over
//! the decoded tree.

use std::time::Instant;

use chrono::{DateTime, FixedOffset};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use ppmp::payload::process::{
    Measurement as PhaseMeasurement, Process, ProcessPayload, Program, SpecialValue,
};
use ppmp::payload::{Device, Measurement, MeasurementPayload, Message, MessagePayload};
use ppmp::util::datetime::{add_millis, local_now};
use ppmp::{Entity, dumps, loads};

const SAMPLES_PER_MEASUREMENT: usize = 1_000;
const DIMENSIONS: [&str; 3] = ["temperature", "pressure", "force"];

fn device() -> Device {
    let mut device = Device::with_id(Uuid::new_v4().to_string()).expect("Failed to create device");
    device
        .insert_meta("swVersion", env!("CARGO_PKG_VERSION"))
        .expect("Failed to set metaData");
    device
}

fn reading(i: usize) -> [(&'static str, f64); 3] {
    let x = i as f64;
    [
        ("temperature", 45.0 + (x / 100.0).sin()),
        ("pressure", 52.4 - (x / 250.0).cos()),
        ("force", 24.0 + (i % 7) as f64),
    ]
}

fn build_measurement_payload(start: DateTime<FixedOffset>, samples: usize) -> MeasurementPayload {
    let mut payload = MeasurementPayload::for_device(device()).expect("Failed to create payload");
    let mut taken = 0;
    while taken < samples {
        let count = SAMPLES_PER_MEASUREMENT.min(samples - taken);
        let mut measurement =
            Measurement::with_dimensions(None, DIMENSIONS).expect("Failed to create measurement");
        let offset = (taken as i64) * 10;
        for i in 0..count {
            let ts = add_millis(&start, offset + (i as i64) * 10).expect("Timestamp out of range");
            measurement
                .add_sample(ts, reading(taken + i))
                .expect("Failed to add sample");
        }
        let limit = measurement
            .limits_mut()
            .and_then(|limits| limits.dimension_mut("temperature"))
            .expect("Failed to create limit");
        limit.set("upperError", 50.0).expect("Failed to set limit");
        limit.set("lowerError", 40.0).expect("Failed to set limit");

        payload
            .push_measurement(measurement)
            .expect("Failed to push measurement");
        taken += count;
    }
    payload
}

fn build_process_payload(start: DateTime<FixedOffset>, samples: usize) -> ProcessPayload {
    let mut process = Process::started(Some(start)).expect("Failed to create process");
    process
        .set("program", Program::named("1", "Bench program").expect("Failed to create program"))
        .expect("Failed to set program");
    process
        .set("externalProcessId", Uuid::new_v4().to_string())
        .expect("Failed to set process id");

    let mut payload = ProcessPayload::for_process(device(), process).expect("Failed to create payload");
    let mut phase = PhaseMeasurement::with_dimensions(Some(start), DIMENSIONS)
        .expect("Failed to create phase");
    phase.set("phase", "phase 1").expect("Failed to set phase");
    for i in 0..samples {
        phase
            .add_sample(
                add_millis(&start, (i as i64) * 5).expect("Timestamp out of range"),
                reading(i),
            )
            .expect("Failed to add sample");
    }
    phase
        .push_special_value(
            SpecialValue::with_values([("force", 30.0)]).expect("Failed to create special value"),
        )
        .expect("Failed to push special value");
    payload.push_measurement(phase).expect("Failed to push phase");
    payload
}

fn build_message_payload(start: DateTime<FixedOffset>, count: usize) -> MessagePayload {
    const SEVERITIES: [&str; 3] = ["HIGH", "MEDIUM", "LOW"];

    let mut payload = MessagePayload::for_device(device()).expect("Failed to create payload");
    for i in 0..count {
        let mut message = Message::with_code(format!("E{:05}", i)).expect("Failed to create message");
        message
            .set("ts", add_millis(&start, (i as i64) * 1_000).expect("Timestamp out of range"))
            .expect("Failed to set ts");
        message
            .set("type", if i % 2 == 0 { "DEVICE" } else { "TECHNICAL_INFO" })
            .expect("Failed to set type");
        message
            .set("severity", SEVERITIES[i % SEVERITIES.len()])
            .expect("Failed to set severity");
        message
            .set("title", format!("Synthetic message {}", i))
            .expect("Failed to set title");
        payload.push_message(message).expect("Failed to push message");
    }
    payload
}

fn bench(label: &str, payload: &dyn Entity) {
    let encode_start = Instant::now();
    let text = dumps(payload).expect("Failed to encode");
    let encode_time = encode_start.elapsed();

    println!("\n=== {} ===", label);
    println!("Encoded: {} bytes in {:?}", text.len(), encode_time);
    println!(
        "  Throughput: {:.2} MB/s",
        (text.len() as f64 / 1_000_000.0) / encode_time.as_secs_f64()
    );

    let decode_start = Instant::now();
    let decoded = loads(&text, false).expect("Failed to decode");
    let decode_time = decode_start.elapsed();
    println!("Decoded in {:?}", decode_time);
    println!(
        "  Throughput: {:.2} MB/s",
        (text.len() as f64 / 1_000_000.0) / decode_time.as_secs_f64()
    );

    let validate_start = Instant::now();
    let problems = decoded.problems();
    let validate_time = validate_start.elapsed();
    println!("Validated in {:?} ({} problems)", validate_time, problems.len());

    if decoded.fields() != payload.fields() {
        println!("  WARNING: decoded payload differs from the original");
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let samples: usize = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(100_000);
    let start = local_now();
    info!(samples, "building payloads");

    let build_start = Instant::now();
    let measurement = build_measurement_payload(start, samples);
    println!(
        "Built measurement payload: {} measurements, {} samples in {:?}",
        measurement.measurements().count(),
        samples,
        build_start.elapsed()
    );

    let build_start = Instant::now();
    let process = build_process_payload(start, samples);
    println!(
        "Built process payload: {} samples in {:?}",
        samples,
        build_start.elapsed()
    );

    let build_start = Instant::now();
    let messages = build_message_payload(start, (samples / 100).max(1));
    println!(
        "Built message payload: {} messages in {:?}",
        messages.messages().count(),
        build_start.elapsed()
    );

    bench("Measurement payload", &measurement);
    bench("Process payload", &process);
    bench("Message payload", &messages);
}
