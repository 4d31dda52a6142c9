use std::collections::HashMap;
use std::io::Read;
use std::time::Instant;

use csv::{ByteRecord, ReaderBuilder, Trim};

use crate::error::CsvError;
use crate::models::descriptor::{PanelDescriptor, Visualization};

/// Header aliases for the visualization column, in priority order.
const VISUALIZATION_COLUMNS: &[&str] = &["visualization", "panel_type", "chart_type", "viewtype"];
const WIDTH_COLUMNS: &[&str] = &["w", "width"];
const HEIGHT_COLUMNS: &[&str] = &["h", "height"];

/// Case-insensitive header name → column position. The first occurrence of
/// a duplicated header wins.
struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    fn new(headers: &ByteRecord) -> Self {
        let mut positions = HashMap::new();
        for (i, raw) in headers.iter().enumerate() {
            let name = String::from_utf8_lossy(raw);
            let name = name.trim_start_matches('\u{feff}').trim().to_lowercase();
            positions.entry(name).or_insert(i);
        }
        Self { positions }
    }

    /// Trimmed cell value; missing columns, short rows and blank cells are `None`.
    fn get(&self, record: &ByteRecord, column: &str) -> Option<String> {
        let idx = *self.positions.get(column)?;
        let value = String::from_utf8_lossy(record.get(idx)?);
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    fn first_of(&self, record: &ByteRecord, columns: &[&str]) -> Option<String> {
        columns.iter().find_map(|c| self.get(record, c))
    }

    fn descriptor(&self, record: &ByteRecord) -> PanelDescriptor {
        PanelDescriptor {
            title: self.get(record, "title"),
            datasource: self.get(record, "datasource"),
            query: self.get(record, "query"),
            visualization: self
                .first_of(record, VISUALIZATION_COLUMNS)
                .map(|v| Visualization::from_label(&v))
                .unwrap_or_default(),
            unit: self.get(record, "unit"),
            thresholds: self.get(record, "thresholds"),
            width: parse_int(self.first_of(record, WIDTH_COLUMNS)),
            height: parse_int(self.first_of(record, HEIGHT_COLUMNS)),
            time_from: self.get(record, "timefrom"),
            time_shift: self.get(record, "timeshift"),
            color: self.get(record, "color"),
        }
    }
}

fn parse_int(value: Option<String>) -> Option<i64> {
    value?.parse().ok()
}

/// Parse a CSV stream with a header row into panel descriptors, one per
/// data row, in input order.
pub fn parse<R: Read>(reader: R) -> Result<Vec<PanelDescriptor>, CsvError> {
    let start = Instant::now();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.byte_headers().map_err(CsvError::Header)?.clone();
    let columns = ColumnIndex::new(&headers);

    let mut descriptors = Vec::new();
    let mut record = ByteRecord::new();
    loop {
        match rdr.read_byte_record(&mut record) {
            Ok(true) => descriptors.push(columns.descriptor(&record)),
            Ok(false) => break,
            Err(source) => {
                return Err(CsvError::Record {
                    record: descriptors.len() + 1,
                    source,
                });
            }
        }
    }

    tracing::info!(
        "csv parsed: {} records in {} ms",
        descriptors.len(),
        start.elapsed().as_millis()
    );
    Ok(descriptors)
}
