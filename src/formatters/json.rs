use crate::formatters::LineHandler;
use serde_json::{Map, Value};

fn to_object(names: &[String], values: &[String]) -> Value {
    let mut map = Map::with_capacity(names.len());
    for (name, value) in names.iter().zip(values) {
        map.insert(name.clone(), Value::String(value.clone()));
    }
    Value::Object(map)
}

/// One compact JSON object per line, fields in record order.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonHandler;

impl LineHandler for JsonHandler {
    fn handle(
        &self,
        names: &[String],
        values: &[String],
        _index: usize,
        _has_line_number: bool,
        _is_first_line: bool,
    ) -> anyhow::Result<String> {
        Ok(serde_json::to_string(&to_object(names, values))?)
    }
}

/// Indented JSON, one object per record.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrettyJsonHandler;

impl LineHandler for PrettyJsonHandler {
    fn handle(
        &self,
        names: &[String],
        values: &[String],
        _index: usize,
        _has_line_number: bool,
        _is_first_line: bool,
    ) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&to_object(names, values))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_json_preserves_field_order() {
        let names = strings(&["status", "method", "no"]);
        let values = strings(&["200", "GET", "1"]);
        let out = JsonHandler.handle(&names, &values, 1, false, true).unwrap();
        assert_eq!(out, r#"{"status":"200","method":"GET","no":"1"}"#);
    }

    #[test]
    fn test_json_escapes_values() {
        let names = strings(&["ua"]);
        let values = strings(&["say \"hi\""]);
        let out = JsonHandler.handle(&names, &values, 1, false, true).unwrap();
        assert_eq!(out, r#"{"ua":"say \"hi\""}"#);
    }

    #[test]
    fn test_pretty_json() {
        let names = strings(&["a"]);
        let values = strings(&["1"]);
        let out = PrettyJsonHandler
            .handle(&names, &values, 1, false, true)
            .unwrap();
        assert_eq!(out, "{\n  \"a\": \"1\"\n}");
    }
}
