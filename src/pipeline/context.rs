use serde::Serialize;

/// Audit entry for a line no pattern could decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    /// Archive member the line came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
    pub line_number: usize,
    pub line: String,
}

/// What happened to one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Line number was in the skip set
    Skipped,
    /// No decoder match; `output` holds the raw line when unmatched lines are emitted
    Unmatched {
        error: ErrorRecord,
        output: Option<String>,
    },
    /// Decoded, but rejected by a filter
    Excluded,
    /// Decoded, kept and formatted
    Matched(String),
}

impl LineOutcome {
    pub fn output(&self) -> Option<&str> {
        match self {
            LineOutcome::Matched(text) => Some(text),
            LineOutcome::Unmatched { output, .. } => output.as_deref(),
            LineOutcome::Skipped | LineOutcome::Excluded => None,
        }
    }
}

/// Final accounting of one parse call.
///
/// `total == matched + unmatched + excluded + skipped` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseResult {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub excluded: usize,
    pub skipped: usize,
    pub source: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub archive_entries: Vec<String>,
    pub errors: Vec<ErrorRecord>,
}

/// Running counters for a parse call in progress.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    total: usize,
    matched: usize,
    unmatched: usize,
    excluded: usize,
    skipped: usize,
    archive_entries: Vec<String>,
    errors: Vec<ErrorRecord>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: LineOutcome) {
        self.total += 1;
        match outcome {
            LineOutcome::Skipped => self.skipped += 1,
            LineOutcome::Unmatched { error, .. } => {
                self.unmatched += 1;
                self.errors.push(error);
            }
            LineOutcome::Excluded => self.excluded += 1,
            LineOutcome::Matched(_) => self.matched += 1,
        }
    }

    /// Fold in the counters of one archive entry.
    pub fn merge(&mut self, other: ResultAggregator, entry_name: &str) {
        self.total += other.total;
        self.matched += other.matched;
        self.unmatched += other.unmatched;
        self.excluded += other.excluded;
        self.skipped += other.skipped;
        self.errors
            .extend(other.errors.into_iter().map(|error| ErrorRecord {
                entry: Some(entry_name.to_string()),
                ..error
            }));
        self.archive_entries.push(entry_name.to_string());
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn finalize(self, source: &str) -> ParseResult {
        ParseResult {
            total: self.total,
            matched: self.matched,
            unmatched: self.unmatched,
            excluded: self.excluded,
            skipped: self.skipped,
            source: source.to_string(),
            archive_entries: self.archive_entries,
            errors: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unmatched(line_number: usize) -> LineOutcome {
        LineOutcome::Unmatched {
            error: ErrorRecord {
                entry: None,
                line_number,
                line: format!("bad {}", line_number),
            },
            output: None,
        }
    }

    #[test]
    fn test_record_counts_each_outcome_once() {
        let mut agg = ResultAggregator::new();
        agg.record(LineOutcome::Skipped);
        agg.record(unmatched(2));
        agg.record(LineOutcome::Excluded);
        agg.record(LineOutcome::Matched("{}".to_string()));
        agg.record(LineOutcome::Matched("{}".to_string()));

        let result = agg.finalize("stdin");
        assert_eq!(result.total, 5);
        assert_eq!(result.matched, 2);
        assert_eq!(result.unmatched, 1);
        assert_eq!(result.excluded, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].line_number, 2);
        assert_eq!(result.source, "stdin");
    }

    #[test]
    fn test_merge_tags_errors_with_entry() {
        let mut first = ResultAggregator::new();
        first.record(LineOutcome::Matched("x".to_string()));

        let mut second = ResultAggregator::new();
        second.record(unmatched(1));
        second.record(LineOutcome::Excluded);

        let mut total = ResultAggregator::new();
        total.merge(first, "a.log");
        total.merge(second, "b.log");

        let result = total.finalize("logs.tar");
        assert_eq!(result.total, 3);
        assert_eq!(result.archive_entries, vec!["a.log", "b.log"]);
        assert_eq!(result.errors[0].entry.as_deref(), Some("b.log"));
        assert_eq!(result.errors[0].line_number, 1);
    }

    #[test]
    fn test_outcome_output() {
        assert_eq!(LineOutcome::Matched("m".into()).output(), Some("m"));
        assert_eq!(LineOutcome::Excluded.output(), None);
        assert_eq!(unmatched(1).output(), None);
    }

    #[test]
    fn test_result_serializes_without_empty_entries() {
        let result = ResultAggregator::new().finalize("stdin");
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"total":0,"matched":0,"unmatched":0,"excluded":0,"skipped":0,"source":"stdin","errors":[]}"#
        );
    }
}
