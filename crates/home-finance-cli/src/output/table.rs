use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::leaf_to_string;

/// Format output as tables using the tabled crate. The result envelope's
/// scalar fields form the headline table; nested objects and arrays of
/// objects get their own sections; warnings and methodology trail at the
/// end.
pub fn print_table(value: &Value) {
    let envelope = value.as_object();
    let result = envelope
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => {
            print_scalars(map);
            for (key, nested) in map {
                match nested {
                    Value::Object(inner) => {
                        println!("\n{key}:");
                        print_scalars(inner);
                    }
                    Value::Array(items) if items.first().map_or(false, |v| v.is_object()) => {
                        println!("\n{key}:");
                        print_grid(items);
                    }
                    _ => {}
                }
            }
        }
        Value::Array(items) => print_grid(items),
        other => println!("{other}"),
    }

    if let Some(map) = envelope {
        if let Some(Value::Array(warnings)) = map.get("warnings") {
            if !warnings.is_empty() {
                println!("\nWarnings:");
                for warning in warnings {
                    if let Value::String(text) = warning {
                        println!("  - {text}");
                    }
                }
            }
        }
        if let Some(Value::String(methodology)) = map.get("methodology") {
            println!("\nMethodology: {methodology}");
        }
    }
}

/// Two-column table of an object's scalar fields.
fn print_scalars(map: &serde_json::Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut any = false;
    for (key, val) in map {
        if val.is_object() || val.is_array() {
            continue;
        }
        builder.push_record([key.as_str(), &leaf_to_string(val)]);
        any = true;
    }
    if any {
        println!("{}", Table::from(builder));
    }
}

/// Grid table for an array of uniform objects.
fn print_grid(items: &[Value]) {
    let Some(Value::Object(first)) = items.first() else {
        for item in items {
            println!("{}", leaf_to_string(item));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in items {
        if let Value::Object(map) = item {
            builder.push_record(
                headers
                    .iter()
                    .map(|h| map.get(h).map(leaf_to_string).unwrap_or_default()),
            );
        }
    }
    println!("{}", Table::from(builder));
}
