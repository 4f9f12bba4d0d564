use serde_json::Value;
use std::io;

use super::{as_grid, result_of, scalar_text};

/// Write output as CSV to stdout.
///
/// Inspection results print their extracted table grids, one after another
/// separated by an empty record; answer lists print one row per answer.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(stdout.lock());

    match result_of(value) {
        Value::Object(map) => {
            let grids = map
                .get("tables")
                .and_then(Value::as_array)
                .and_then(|a| a.iter().map(as_grid).collect::<Option<Vec<_>>>());
            if let Some(grids) = grids {
                for (i, grid) in grids.iter().enumerate() {
                    if i > 0 {
                        let _ = wtr.write_record([""]);
                    }
                    for row in grid {
                        let _ = wtr.write_record(row);
                    }
                }
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &scalar_text(val)]);
                }
            }
        }
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        other => {
            let _ = wtr.write_record([&scalar_text(other)]);
        }
    }

    let _ = wtr.flush();
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    // Extract headers from first object
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(scalar_text).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&scalar_text(item)]);
        }
    }
}
