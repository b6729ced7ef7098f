//! Simple inspector for PPMP payload files.

use std::fs;

use ppmp::payload::process::ProcessPayload;
use ppmp::payload::{MeasurementPayload, MessagePayload};
use ppmp::{CONTENT_SPEC_KEY, Entity, Value, loads};
use tracing_subscriber::EnvFilter;

fn format_value(v: &Value) -> String {
    match v {
        Value::Text(s) => {
            let preview: String = s.chars().take(60).collect();
            if s.chars().count() > 60 {
                format!("\"{}...\"", preview)
            } else {
                format!("\"{}\"", preview)
            }
        }
        Value::List(items) => format!("[{} items]", items.len()),
        Value::Map(map) => format!("{{{} keys}}", map.len()),
        Value::Entity(entity) => entity.type_name().to_string(),
        other => other.to_string(),
    }
}

fn print_fields(indent: &str, entity: &dyn Entity) {
    for (key, value) in entity.fields() {
        println!("{}{} = {}", indent, key, format_value(value));
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/data/measurement.json".to_string());

    println!("Reading: {}", path);

    let text = fs::read_to_string(&path).expect("Failed to read file");
    println!("File size: {} bytes", text.len());

    let payload = loads(&text, false).expect("Failed to decode");

    println!("\n=== Payload ===");
    println!("Type: {}", payload.type_name());
    if let Some(spec) = payload.fields().get(CONTENT_SPEC_KEY).and_then(Value::as_str) {
        println!("Content spec: {}", spec);
    }
    print_fields("  ", payload.as_ref());

    if let Some(measurement) = payload.downcast_ref::<MeasurementPayload>() {
        println!("\n=== Measurements ({}) ===", measurement.measurements().count());
        for (i, m) in measurement.measurements().enumerate() {
            let series = m.series();
            let dims: Vec<&str> = series.map(|s| s.dimensions().collect()).unwrap_or_default();
            println!(
                "[{}] ts={} samples={} dimensions={:?}",
                i,
                m.get("ts").map(format_value).unwrap_or_default(),
                series.map_or(0, |s| s.sample_count()),
                dims
            );
            for sample in m.samples().take(5) {
                println!("      {} {:?}", sample.ts, sample.values);
            }
        }
    } else if let Some(message) = payload.downcast_ref::<MessagePayload>() {
        println!("\n=== Messages ({}) ===", message.messages().count());
        for (i, m) in message.messages().enumerate() {
            println!(
                "[{}] {} {}",
                i,
                m.code().unwrap_or("?"),
                m.title().unwrap_or_default()
            );
            print_fields("      ", m);
        }
    } else if let Some(process) = payload.downcast_ref::<ProcessPayload>() {
        if let Some(p) = process.process() {
            println!("\n=== Process ===");
            print_fields("  ", p);
        }
        println!("\n=== Phases ({}) ===", process.measurements().count());
        for (i, m) in process.measurements().enumerate() {
            println!(
                "[{}] {} samples={}",
                i,
                m.phase().unwrap_or("-"),
                m.series().map_or(0, |s| s.sample_count())
            );
        }
    }

    let problems = payload.problems();
    println!("\n=== Problems ({}) ===", problems.len());
    for problem in &problems {
        println!("  - {}", problem);
    }
}
