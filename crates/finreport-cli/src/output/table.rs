use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{as_grid, result_of, scalar_text};

/// Format output as tables using the tabled crate.
///
/// Scalar result fields go into a Field/Value table; arrays of records and
/// extracted grids each get a table of their own.
pub fn print_table(value: &Value) {
    match result_of(value) {
        Value::Object(map) => print_result_object(map),
        Value::Array(arr) => print_array_table(arr),
        other => println!("{}", scalar_text(other)),
    }

    if let Some(envelope) = value.as_object() {
        print_footer(envelope);
    }
}

fn print_result_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut nested = Vec::new();
    for (key, val) in map {
        match val {
            Value::Array(arr) if arr.iter().any(|v| v.is_object() || v.is_array()) => {
                nested.push((key, val));
            }
            _ => builder.push_record([key.as_str(), &scalar_text(val)]),
        }
    }
    println!("{}", Table::from(builder));

    for (key, val) in nested {
        println!("\n{}:", key);
        if let Some(grids) = val.as_array().and_then(|a| {
            a.iter().map(as_grid).collect::<Option<Vec<_>>>()
        }) {
            for grid in grids {
                print_grid(&grid);
            }
        } else if let Some(arr) = val.as_array() {
            print_array_table(arr);
        }
    }
}

fn print_grid(grid: &[Vec<String>]) {
    let mut builder = Builder::default();
    for row in grid {
        builder.push_record(row.clone());
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    // Collect all keys from first object for headers
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(scalar_text).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", scalar_text(item));
        }
    }
}

fn print_footer(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
