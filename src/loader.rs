use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use anyhow::{bail, Context, Result};
/// Columns of one measurement file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SweepData {
    pub voltage: Vec<f64>,
    pub current: Vec<f64>,
    pub time: Option<Vec<f64>>,
}
/// Reads a delimited text file: one header row, then 2 or 3 numeric columns
/// (voltage, current, optional time). Blank lines and `#` comments are skipped.
pub fn read_data_file(path: impl AsRef<Path>) -> Result<SweepData> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let data = parse_lines(BufReader::new(file).lines())
        .with_context(|| format!("parsing {}", path.display()))?;
    log::info!("loaded {} rows from {}", data.voltage.len(), path.display());
    Ok(data)
}
pub fn parse_data(text: &str) -> Result<SweepData> {
    parse_lines(text.lines().map(|l| Ok(l.to_string())))
}
fn parse_lines(lines: impl Iterator<Item = std::io::Result<String>>) -> Result<SweepData> {
    let mut data = SweepData::default();
    let mut time = Vec::new();
    let mut columns = None;
    let mut header_seen = false;
    for (idx, line) in lines.enumerate() {
        let line = line.context("reading line")?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if !header_seen {
            header_seen = true;
            continue;
        }
        let fields: Vec<&str> = trimmed
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
            .filter(|f| !f.is_empty())
            .collect();
        let width = *columns.get_or_insert(fields.len());
        if !(2..=3).contains(&width) {
            bail!("line {}: expected 2 or 3 columns, found {}", idx + 1, width);
        }
        if fields.len() != width {
            bail!("line {}: expected {} columns, found {}", idx + 1, width, fields.len());
        }
        let mut values = fields.iter().map(|f| {
            f.parse::<f64>()
                .with_context(|| format!("line {}: invalid number {f:?}", idx + 1))
        });
        if let (Some(v), Some(i)) = (values.next(), values.next()) {
            data.voltage.push(v?);
            data.current.push(i?);
        }
        if let Some(t) = values.next() {
            time.push(t?);
        }
    }
    if data.voltage.is_empty() {
        bail!("no data rows after the header");
    }
    if columns == Some(3) {
        data.time = Some(time);
    }
    Ok(data)
}
