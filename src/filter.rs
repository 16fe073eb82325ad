// src/filter.rs - "field operator value" filter expressions over decoded records
use crate::error::{ConfigError, ProcessingError};
use crate::input_format::Record;
use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    EqIgnoreCase,
    Ne,
    NeIgnoreCase,
    Match,
    MatchIgnoreCase,
    NotMatch,
    NotMatchIgnoreCase,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Operator {
    pub fn parse(token: &str) -> Option<Self> {
        let op = match token {
            "==" => Operator::Eq,
            "==*" => Operator::EqIgnoreCase,
            "!=" => Operator::Ne,
            "!=*" => Operator::NeIgnoreCase,
            "=~" => Operator::Match,
            "=~*" => Operator::MatchIgnoreCase,
            "!~" => Operator::NotMatch,
            "!~*" => Operator::NotMatchIgnoreCase,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            _ => return None,
        };
        Some(op)
    }
}

/// Operator-specific comparison value, prepared at compile time.
#[derive(Debug, Clone)]
enum Comparand {
    Text(String),
    FoldedText(String),
    Pattern(Regex),
    Number(f64),
}

#[derive(Debug, Clone)]
pub struct Filter {
    field: String,
    operator: Operator,
    comparand: Comparand,
}

impl Filter {
    pub fn parse(expression: &str, known_fields: Option<&[String]>) -> Result<Self, ConfigError> {
        let tokens: Vec<&str> = expression.split_whitespace().collect();
        let (field, operator, value) = match tokens.as_slice() {
            [field, operator, value] => (*field, *operator, *value),
            _ => return Err(ConfigError::MalformedExpression(expression.to_string())),
        };

        if let Some(known) = known_fields {
            if !known.iter().any(|name| name == field) {
                return Err(ConfigError::UnknownField {
                    field: field.to_string(),
                    expression: expression.to_string(),
                });
            }
        }

        let operator = Operator::parse(operator).ok_or_else(|| ConfigError::UnknownOperator {
            operator: operator.to_string(),
            expression: expression.to_string(),
        })?;

        let comparand = match operator {
            Operator::Eq | Operator::Ne => Comparand::Text(value.to_string()),
            Operator::EqIgnoreCase | Operator::NeIgnoreCase => {
                Comparand::FoldedText(value.to_lowercase())
            }
            Operator::Match
            | Operator::NotMatch
            | Operator::MatchIgnoreCase
            | Operator::NotMatchIgnoreCase => {
                let case_insensitive = matches!(
                    operator,
                    Operator::MatchIgnoreCase | Operator::NotMatchIgnoreCase
                );
                let regex = RegexBuilder::new(value)
                    .case_insensitive(case_insensitive)
                    .build()
                    .map_err(|e| ConfigError::InvalidRegex {
                        expression: expression.to_string(),
                        message: e.to_string(),
                    })?;
                Comparand::Pattern(regex)
            }
            Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => {
                let number = value
                    .parse::<f64>()
                    .map_err(|_| ConfigError::InvalidNumber {
                        expression: expression.to_string(),
                        value: value.to_string(),
                    })?;
                Comparand::Number(number)
            }
        };

        Ok(Filter {
            field: field.to_string(),
            operator,
            comparand,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn evaluate(&self, record: &Record, line: usize) -> Result<bool, ProcessingError> {
        let value = record
            .get(&self.field)
            .ok_or_else(|| ProcessingError::FieldMissing {
                field: self.field.clone(),
                line,
            })?;

        let passed = match (&self.comparand, self.operator) {
            (Comparand::Text(expected), Operator::Eq) => value == expected,
            (Comparand::Text(expected), _) => value != expected,
            (Comparand::FoldedText(expected), Operator::EqIgnoreCase) => {
                value.to_lowercase() == *expected
            }
            (Comparand::FoldedText(expected), _) => value.to_lowercase() != *expected,
            (Comparand::Pattern(regex), Operator::Match | Operator::MatchIgnoreCase) => {
                regex.is_match(value)
            }
            (Comparand::Pattern(regex), _) => !regex.is_match(value),
            (Comparand::Number(threshold), operator) => {
                let actual = value.trim().parse::<f64>().map_err(|_| {
                    ProcessingError::NotNumeric {
                        field: self.field.clone(),
                        value: value.to_string(),
                        line,
                    }
                })?;
                match operator {
                    Operator::Gt => actual > *threshold,
                    Operator::Ge => actual >= *threshold,
                    Operator::Lt => actual < *threshold,
                    _ => actual <= *threshold,
                }
            }
        };
        Ok(passed)
    }
}

/// All filters of one parse call. A record passes only if every filter
/// passes; an empty set passes everything.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilters {
    filters: Vec<Filter>,
}

impl CompiledFilters {
    pub fn compile<S: AsRef<str>>(
        expressions: &[S],
        known_fields: Option<&[String]>,
    ) -> Result<Self, ConfigError> {
        let filters = expressions
            .iter()
            .map(|expression| Filter::parse(expression.as_ref(), known_fields))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CompiledFilters { filters })
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn evaluate(&self, record: &Record, line: usize) -> Result<bool, ProcessingError> {
        for filter in &self.filters {
            if !filter.evaluate(record, line)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        Record::new(
            pairs.iter().map(|(n, _)| n.to_string()).collect(),
            pairs.iter().map(|(_, v)| v.to_string()).collect(),
        )
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_filters_are_anded() {
        let known = fields(&["status", "size"]);
        let filters =
            CompiledFilters::compile(&["status == 200", "size > 100"], Some(&known)).unwrap();

        let small = record(&[("status", "200"), ("size", "50")]);
        let not_found = record(&[("status", "404"), ("size", "500")]);
        let good = record(&[("status", "200"), ("size", "500")]);

        assert!(!filters.evaluate(&small, 1).unwrap());
        assert!(!filters.evaluate(&not_found, 2).unwrap());
        assert!(filters.evaluate(&good, 3).unwrap());
    }

    #[test]
    fn test_no_filters_pass_everything() {
        let filters = CompiledFilters::compile::<&str>(&[], None).unwrap();
        assert!(filters.is_empty());
        assert!(filters.evaluate(&record(&[]), 1).unwrap());
    }

    #[test]
    fn test_case_insensitive_string_operators() {
        let r = record(&[("state", "active")]);
        let eq = CompiledFilters::compile(&["state ==* Active"], None).unwrap();
        assert!(eq.evaluate(&r, 1).unwrap());

        let ne = CompiledFilters::compile(&["state !=* ACTIVE"], None).unwrap();
        assert!(!ne.evaluate(&r, 1).unwrap());

        let strict = CompiledFilters::compile(&["state == Active"], None).unwrap();
        assert!(!strict.evaluate(&r, 1).unwrap());
    }

    #[test]
    fn test_regex_operators() {
        let r = record(&[("uri", "/api/Users/42")]);
        let cases = [
            ("uri =~ ^/api/", true),
            ("uri =~ users", false),
            ("uri =~* users", true),
            ("uri !~ users", true),
            ("uri !~* users", false),
        ];
        for (expression, expected) in cases {
            let filters = CompiledFilters::compile(&[expression], None).unwrap();
            assert_eq!(filters.evaluate(&r, 1).unwrap(), expected, "{}", expression);
        }
    }

    #[test]
    fn test_numeric_operators() {
        let r = record(&[("time", "0.25")]);
        let cases = [
            ("time > 0.1", true),
            ("time >= 0.25", true),
            ("time < 0.25", false),
            ("time <= 0.25", true),
        ];
        for (expression, expected) in cases {
            let filters = CompiledFilters::compile(&[expression], None).unwrap();
            assert_eq!(filters.evaluate(&r, 1).unwrap(), expected, "{}", expression);
        }
    }

    #[test]
    fn test_compile_errors() {
        let known = fields(&["status"]);
        assert!(matches!(
            CompiledFilters::compile(&["status =="], Some(&known)),
            Err(ConfigError::MalformedExpression(_))
        ));
        assert!(matches!(
            CompiledFilters::compile(&["status == 200 extra"], Some(&known)),
            Err(ConfigError::MalformedExpression(_))
        ));
        assert!(matches!(
            CompiledFilters::compile(&["size > 10"], Some(&known)),
            Err(ConfigError::UnknownField { .. })
        ));
        assert!(matches!(
            CompiledFilters::compile(&["status <> 200"], Some(&known)),
            Err(ConfigError::UnknownOperator { .. })
        ));
        assert!(matches!(
            CompiledFilters::compile(&["status =~ ("], Some(&known)),
            Err(ConfigError::InvalidRegex { .. })
        ));
        assert!(matches!(
            CompiledFilters::compile(&["status > abc"], Some(&known)),
            Err(ConfigError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_runtime_errors() {
        let filters = CompiledFilters::compile(&["size > 10"], None).unwrap();
        let missing = record(&[("status", "200")]);
        assert!(matches!(
            filters.evaluate(&missing, 4),
            Err(ProcessingError::FieldMissing { line: 4, .. })
        ));

        let dash = record(&[("size", "-")]);
        assert!(matches!(
            filters.evaluate(&dash, 5),
            Err(ProcessingError::NotNumeric { line: 5, .. })
        ));
    }
}
