use serde_json::Value;
use std::io;

use super::leaf_to_string;

/// Write output as CSV to stdout. Objects become field,value rows; arrays
/// of objects become a grid with a header row.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut writer = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => {
            let _ = writer.write_record(["field", "value"]);
            for (key, val) in map {
                if val.is_object() || val.is_array() {
                    continue;
                }
                let _ = writer.write_record([key.as_str(), &leaf_to_string(val)]);
            }
        }
        Value::Array(items) => write_grid(&mut writer, items),
        other => {
            let _ = writer.write_record([&leaf_to_string(other)]);
        }
    }

    let _ = writer.flush();
}

fn write_grid(writer: &mut csv::Writer<io::StdoutLock<'_>>, items: &[Value]) {
    let Some(Value::Object(first)) = items.first() else {
        for item in items {
            let _ = writer.write_record([&leaf_to_string(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = writer.write_record(&headers);
    for item in items {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(leaf_to_string).unwrap_or_default())
                .collect();
            let _ = writer.write_record(&row);
        }
    }
}
