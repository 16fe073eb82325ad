/// Turns the fields of one processed line into its output text.
///
/// `index` is the 1-based line number, `has_line_number` tells whether a
/// leading `no` field was added and `is_first_line` is set for the first
/// record a parse call hands to the handler.
pub trait LineHandler: Send + Sync {
    fn handle(
        &self,
        names: &[String],
        values: &[String],
        index: usize,
        has_line_number: bool,
        is_first_line: bool,
    ) -> anyhow::Result<String>;
}

impl<F> LineHandler for F
where
    F: Fn(&[String], &[String], usize, bool, bool) -> anyhow::Result<String> + Send + Sync,
{
    fn handle(
        &self,
        names: &[String],
        values: &[String],
        index: usize,
        has_line_number: bool,
        is_first_line: bool,
    ) -> anyhow::Result<String> {
        self(names, values, index, has_line_number, is_first_line)
    }
}

pub mod json;
pub mod logfmt;
pub mod ltsv;
pub mod tsv;

pub use json::{JsonHandler, PrettyJsonHandler};
pub use logfmt::KeyValueHandler;
pub use ltsv::LtsvHandler;
pub use tsv::TsvHandler;
