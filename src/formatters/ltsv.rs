use crate::formatters::LineHandler;

/// `name:value` pairs joined by tabs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LtsvHandler;

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\t', "\\t")
        .replace('\n', "\\n")
}

impl LineHandler for LtsvHandler {
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
            .map(|(name, value)| format!("{}:{}", name, escape(value)))
            .collect();
        Ok(pairs.join("\t"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ltsv_output() {
        let names = vec!["host".to_string(), "ua".to_string()];
        let values = vec!["192.0.2.1".to_string(), "a\tb".to_string()];
        let out = LtsvHandler.handle(&names, &values, 1, false, false).unwrap();
        assert_eq!(out, "host:192.0.2.1\tua:a\\tb");
    }
}
