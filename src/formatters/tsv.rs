use crate::formatters::LineHandler;

/// Tab-separated values. The first record is preceded by a header row
/// made of its field names.
#[derive(Debug, Default, Clone, Copy)]
pub struct TsvHandler;

impl TsvHandler {
    fn write_rows(rows: &[&[String]]) -> anyhow::Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(Vec::new());
        for row in rows {
            writer.write_record(*row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flushing TSV row: {}", e))?;
        let mut text = String::from_utf8(bytes)?;
        if text.ends_with('\n') {
            text.pop();
        }
        Ok(text)
    }
}

impl LineHandler for TsvHandler {
    fn handle(
        &self,
        names: &[String],
        values: &[String],
        _index: usize,
        _has_line_number: bool,
        is_first_line: bool,
    ) -> anyhow::Result<String> {
        if is_first_line {
            Self::write_rows(&[names, values])
        } else {
            Self::write_rows(&[values])
        }
    }
}
