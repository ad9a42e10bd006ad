//! CSV ingestion and serialization with encoding and delimiter auto-detection.
//!
//! Reads an upload into a [`Table`] of text rows, each stamped with its
//! position in the file. No IntelliDealer logic here.

pub mod amount;

pub use amount::{amount_or_zero, format_amount, parse_amount, round_cents};

use serde_json::{Map, Value};
use std::path::Path;

use crate::api::logs::log_warning;
use crate::error::{CsvError, CsvResult};
use crate::models::{Row, Table};

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows with their headers
    pub table: Table,
    /// Detected encoding
    pub encoding: String,
    /// Detected delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        // WHATWG decodes the Latin-1 labels as windows-1252, a superset over 0xA0-0xFF
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    decoded.trim_start_matches('\u{feff}').to_string()
}

/// Detect the delimiter by counting occurrences in the header line.
///
/// Falls back to `,` when the header holds none of the candidates.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// Headers are trimmed. Short rows are padded with empty values; a row with
/// more fields than the header is a parse error. Rows whose fields are all
/// blank are skipped and get no position.
///
/// # Example
/// ```ignore
/// let table = parse_str("Invoice #,GL Amt\nA1,$10.00", ',')?;
/// assert_eq!(table.rows[0].get_raw("GL Amt"), "$10.00");
/// assert_eq!(table.rows[0].position, Some(0));
/// ```
pub fn parse_str(content: &str, delimiter: char) -> CsvResult<Table> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    // First occurrence of each header wins
    let mut columns: Vec<(usize, &str)> = Vec::with_capacity(headers.len());
    for (i, header) in headers.iter().enumerate() {
        if columns.iter().any(|(_, h)| *h == header.as_str()) {
            if !header.is_empty() {
                log_warning(format!("Duplicate column '{}' (column {}) ignored", header, i + 1));
            }
            continue;
        }
        columns.push((i, header.as_str()));
    }

    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

        if record.len() > headers.len() {
            return Err(CsvError::parse(
                line,
                format!("expected {} fields, found {}", headers.len(), record.len()),
            ));
        }

        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }

        let mut row = Row::new(rows.len());
        for (i, header) in &columns {
            row.set_raw(header, record.get(*i).unwrap_or(""));
        }
        rows.push(row);
    }

    let unique_headers = columns.iter().map(|(_, h)| h.to_string()).collect();
    Ok(Table::new(unique_headers, rows))
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    if bytes.is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let table = parse_str(&content, delimiter)?;

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
    })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Serialize rows as a complete comma-separated CSV (header + rows).
pub fn write_csv<'a>(headers: &[String], rows: impl IntoIterator<Item = &'a Row>) -> CsvResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row.values_for(headers))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::WriteError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CsvError::WriteError(e.to_string()))
}

/// Rows as JSON objects in header order, for previews.
pub fn table_to_json(table: &Table) -> Vec<Value> {
    table
        .rows
        .iter()
        .map(|row| {
            let obj: Map<String, Value> = table
                .headers
                .iter()
                .map(|h| (h.clone(), Value::String(row.get_raw(h).to_string())))
                .collect();
            Value::Object(obj)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;

    #[test]
    fn test_simple_csv() {
        let table = parse_str("Invoice #,GL Amt\nA1,10\nA2,20", ',').unwrap();

        assert_eq!(table.headers, vec!["Invoice #", "GL Amt"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].get(Column::InvoiceNumber), "A1");
        assert_eq!(table.rows[1].get(Column::GlAmt), "20");
        assert_eq!(table.rows[1].position, Some(1));
    }

    #[test]
    fn test_quoted_amount_with_thousands() {
        let csv = "Invoice #,GL Amt\nA1,\"$1,234.56\"";
        let table = parse_str(csv, ',').unwrap();
        assert_eq!(table.rows[0].get(Column::GlAmt), "$1,234.56");
    }

    #[test]
    fn test_headers_trimmed() {
        let table = parse_str(" Invoice # , Location \nA1,1", ',').unwrap();
        assert_eq!(table.headers, vec!["Invoice #", "Location"]);
        assert_eq!(table.rows[0].get(Column::Location), "1");
    }

    #[test]
    fn test_blank_rows_skipped() {
        let table = parse_str("a,b\n1,2\n\n,\n3,4\n", ',').unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1].position, Some(1));
        assert_eq!(table.rows[1].get_raw("a"), "3");
    }

    #[test]
    fn test_short_rows_padded() {
        let table = parse_str("a,b,c\n1", ',').unwrap();
        assert_eq!(table.rows[0].get_raw("a"), "1");
        assert_eq!(table.rows[0].get_raw("c"), "");
        assert_eq!(table.rows[0].fields().len(), 3);
    }

    #[test]
    fn test_extra_fields_rejected() {
        let err = parse_str("a,b\n1,2,3", ',').unwrap_err();
        assert!(err.to_string().contains("expected 2 fields, found 3"));
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_str("", ','), Err(CsvError::EmptyFile)));
        assert!(matches!(parse_bytes_auto(b""), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_auto_parse() {
        let csv = "Invoice #;Vendor\nA1;ACME\nA2;Globex";
        let result = parse_bytes_auto(csv.as_bytes()).unwrap();

        assert_eq!(result.delimiter, ';');
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.table.len(), 2);
        assert_eq!(result.table.rows[1].get(Column::Vendor), "Globex");
    }

    #[test]
    fn test_bom_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"Invoice #,GL Amt\nA1,5");
        let result = parse_bytes_auto(&bytes).unwrap();
        assert_eq!(result.table.headers[0], "Invoice #");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_latin1_symbols_keep_their_code_points() {
        // 1½ ¤ ¼´ : bytes where ISO-8859-15 differs from Latin-1
        let bytes: &[u8] = &[0x31, 0xBD, 0x20, 0xA4, 0x20, 0xBC, 0xB4];
        assert_eq!(decode_content(bytes, "iso-8859-1"), "1½ ¤ ¼´");
        assert_eq!(decode_content(bytes, "windows-1252"), "1½ ¤ ¼´");
    }

    #[test]
    fn test_duplicate_header_keeps_first_column() {
        let table = parse_str("Vendor,GL Amt,Vendor\nACME,5,Globex", ',').unwrap();

        assert_eq!(table.headers, vec!["Vendor", "GL Amt"]);
        assert_eq!(table.rows[0].get(Column::Vendor), "ACME");
        assert_eq!(table.rows[0].fields().len(), 2);
    }

    #[test]
    fn test_write_csv_quotes_and_order() {
        let mut row = Row::new(0);
        row.set_raw("Vendor", "ACME, INC");
        row.set_raw("GL Amt", "10.00");
        let headers = vec!["GL Amt".to_string(), "Vendor".to_string(), "Extra".to_string()];

        let csv = write_csv(&headers, [&row]).unwrap();
        assert_eq!(csv, "GL Amt,Vendor,Extra\n10.00,\"ACME, INC\",\n");
    }

    #[test]
    fn test_table_to_json() {
        let table = parse_str("a,b\n1,2", ',').unwrap();
        let json = table_to_json(&table);
        assert_eq!(json[0]["a"], "1");
        assert_eq!(json[0]["b"], "2");
    }
}
