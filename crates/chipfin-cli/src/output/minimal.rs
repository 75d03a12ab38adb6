use serde_json::Value;

/// Print just the key answer value from the output.
///
/// Object results: the first non-null priority field, else the first field.
/// Row results: the row count.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = ["inventory_turnover", "artifact", "records", "rows"];

    match result {
        Value::Object(map) => {
            for key in &priority_keys {
                if let Some(val) = map.get(*key).filter(|v| !v.is_null()) {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
            if let Some((key, val)) = map.iter().next() {
                println!("{}: {}", key, format_minimal(val));
            }
        }
        Value::Array(rows) => println!("{}", rows.len()),
        other => println!("{}", format_minimal(other)),
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
