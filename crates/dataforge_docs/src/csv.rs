use dataforge_core::{ReadError, TabularRecord};

/// Parse CSV text into a record.
///
/// The first record is the header row, taken verbatim; every later record is
/// a data row. Records may differ in length and are padded. Text with no
/// records at all yields an empty record.
pub fn parse_csv(input: &str) -> Result<TabularRecord, ReadError> {
    if input.trim().is_empty() {
        return Ok(TabularRecord::empty());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input.as_bytes());

    let mut records = reader.records();

    let headers: Vec<String> = match records.next() {
        Some(result) => result.map_err(malformed)?.iter().map(String::from).collect(),
        None => return Ok(TabularRecord::empty()),
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(malformed)?;
        let row: Vec<String> = record.iter().map(String::from).collect();
        rows.push(row);
    }

    Ok(TabularRecord::new(headers, rows))
}

fn malformed(err: csv::Error) -> ReadError {
    ReadError::malformed("CSV", err)
}
