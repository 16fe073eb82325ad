use crate::formatters::LineHandler;

/// `name="value"` pairs separated by spaces; every value is quoted.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyValueHandler;

impl KeyValueHandler {
    fn format_pair(name: &str, value: &str) -> String {
        format!("{}=\"{}\"", name, Self::escape_quotes(value))
    }

    fn escape_quotes(value: &str) -> String {
        value.replace('\\', "\\\\").replace('"', "\\\"")
    }
}

impl LineHandler for KeyValueHandler {
    fn handle(
        &self,
        names: &[String],
        values: &[String],
        _index: usize,
        _has_line_number: bool,
        _is_first_line: bool,
    ) -> anyhow::Result<String> {
        let pairs: Vec<String> = names
            .iter()
            .zip(values)
            .map(|(name, value)| Self::format_pair(name, value))
            .collect();
        Ok(pairs.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_quotes_everything() {
        let names = vec!["method".to_string(), "ua".to_string()];
        let values = vec!["GET".to_string(), "say \"hi\"".to_string()];
        let out = KeyValueHandler
            .handle(&names, &values, 1, false, false)
            .unwrap();
        assert_eq!(out, r#"method="GET" ua="say \"hi\"""#);
    }
}
