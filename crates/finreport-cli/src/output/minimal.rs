use serde_json::Value;

use super::{result_of, scalar_text};

/// Print just the key answer from the output.
///
/// Answer lists print one answer per line; other results print the first
/// well-known field present, falling back to the first field.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    if let Value::Array(items) = result {
        for item in items {
            match item.get("answer") {
                Some(answer) => println!("{}", scalar_text(answer)),
                None => println!("{}", scalar_text(item)),
            }
        }
        return;
    }

    let priority_keys = ["output_path", "page_count"];

    if let Value::Object(map) = result {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", scalar_text(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, scalar_text(val));
            return;
        }
    }

    println!("{}", scalar_text(result));
}
