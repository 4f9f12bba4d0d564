pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Pull the `result` payload out of the standard envelope.
pub(crate) fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Render a scalar for a single cell.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) if arr.iter().all(|v| !v.is_object() && !v.is_array()) => {
            let items: Vec<String> = arr.iter().map(scalar_text).collect();
            items.join("; ")
        }
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// A JSON array of string arrays, i.e. an extracted table grid.
pub(crate) fn as_grid(value: &Value) -> Option<Vec<Vec<String>>> {
    value
        .as_array()?
        .iter()
        .map(|row| row.as_array().map(|cells| cells.iter().map(scalar_text).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_of_envelope() {
        let v = json!({"result": {"page_count": 3}, "warnings": []});
        assert_eq!(result_of(&v), &json!({"page_count": 3}));
        assert_eq!(result_of(&json!([1, 2])), &json!([1, 2]));
    }

    #[test]
    fn test_grid_detection() {
        let grid = json!([["Quarter", "Revenue ($M)"], ["Q1 2024", "2,450"]]);
        assert_eq!(
            as_grid(&grid),
            Some(vec![
                vec!["Quarter".to_string(), "Revenue ($M)".to_string()],
                vec!["Q1 2024".to_string(), "2,450".to_string()],
            ])
        );
        assert_eq!(as_grid(&json!([{"tag": "H1"}])), None);
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&json!("2,847")), "2,847");
        assert_eq!(scalar_text(&json!(null)), "");
        assert_eq!(scalar_text(&json!(["a", "b"])), "a; b");
    }
}
