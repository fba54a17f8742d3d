//! CSV parsing with encoding and delimiter auto-detection.
//!
//! Produces either a [`WideTable`] (first row is the header) or a
//! header-less [`RawGrid`] for staggered files. No reshaping logic here.

use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::{RawGrid, WideTable};

const BOM: char = '\u{feff}';

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed table
    pub table: WideTable,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

impl ParseResult {
    pub fn headers(&self) -> &[String] {
        self.table.headers()
    }
}

/// Result of parsing a header-less grid with metadata
#[derive(Debug, Clone)]
pub struct GridParseResult {
    pub grid: RawGrid,
    pub encoding: String,
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Unknown encodings fall back to lossy UTF-8. A leading BOM is removed.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    Ok(decoded.trim_start_matches(BOM).to_string())
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Ties keep the earlier candidate; a line without any candidate yields `,`.
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

fn delimiter_byte(delimiter: char) -> CsvResult<u8> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(CsvError::ParseError {
            line: 0,
            message: format!("delimiter '{}' is not an ASCII character", delimiter),
        })
    }
}

/// Read every record of `content` as raw string cells.
fn read_records(content: &str, delimiter: char) -> CsvResult<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter_byte(delimiter)?)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    Ok(rows)
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

/// Parse CSV text into a wide table.
///
/// The first non-blank row is the header. Header names and cells are trimmed,
/// blank rows are skipped, short rows are padded and extra cells ignored.
///
/// # Example
/// ```
/// use passboard::parser::parse_table;
///
/// let table = parse_table("Region,Pass,Fail\nCentral,48,84\n", ',').unwrap();
///
/// assert_eq!(table.headers(), ["Region", "Pass", "Fail"]);
/// assert_eq!(table.rows()[0][1], "48");
/// ```
pub fn parse_table(content: &str, delimiter: char) -> CsvResult<WideTable> {
    let mut rows = read_records(content, delimiter)?
        .into_iter()
        .filter(|row| !is_blank(row));

    let header_row = rows.next().ok_or(CsvError::EmptyFile)?;
    let headers: Vec<String> = header_row
        .iter()
        .map(|h| h.trim_matches(BOM).trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let body = rows
        .map(|row| row.into_iter().map(|c| c.trim().to_string()).collect())
        .collect();

    WideTable::new(headers, body)
}

/// Parse CSV text into a header-less grid, keeping row positions.
///
/// Empty content gives an empty grid.
pub fn parse_grid(content: &str, delimiter: char) -> CsvResult<RawGrid> {
    Ok(RawGrid::new(read_records(content, delimiter)?))
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    let table = parse_table(&content, delimiter)?;

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
    })
}

/// Parse CSV bytes into a grid with auto-detection of encoding and delimiter.
pub fn parse_grid_bytes_auto(bytes: &[u8]) -> CsvResult<GridParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    let grid = parse_grid(&content, delimiter)?;

    Ok(GridParseResult {
        grid,
        encoding,
        delimiter,
    })
}

/// Parse a CSV file into a wide table with auto-detection.
///
/// # Example
/// ```ignore
/// let result = parse_file_auto("regional.csv")?;
/// println!("Encoding: {}, Delimiter: '{}'", result.encoding, result.delimiter);
/// println!("Rows: {}", result.table.len());
/// ```
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Parse a CSV file into a grid with auto-detection.
pub fn parse_grid_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<GridParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_grid_bytes_auto(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let table = parse_table("Region,Pass\nCentral,48\nNorthern,64", ',').unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0], vec!["Central", "48"]);
        assert_eq!(table.rows()[1], vec!["Northern", "64"]);
    }

    #[test]
    fn test_semicolon_delimiter() {
        let table = parse_table("a;b;c\n1;2;3", ';').unwrap();
        assert_eq!(table.headers(), ["a", "b", "c"]);
        assert_eq!(table.rows()[0], vec!["1", "2", "3"]);
    }

    #[test]
    fn test_quoted_values() {
        let csv = "Result,Central\n\"Apple Watch, Series 9 (Pass)\",11";
        let table = parse_table(csv, ',').unwrap();

        assert_eq!(table.rows()[0][0], "Apple Watch, Series 9 (Pass)");
    }

    #[test]
    fn test_header_whitespace_trimmed() {
        let table = parse_table("Result,Sarawak \niPhone (Pass),23", ',').unwrap();
        assert_eq!(table.headers(), ["Result", "Sarawak"]);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let table = parse_table("a,b\n1,2\n\n,\n3,4\n", ',').unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_missing_and_extra_values() {
        let table = parse_table("a,b,c\n1,,3\n4\n5,6,7,8", ',').unwrap();

        assert_eq!(table.rows()[0], vec!["1", "", "3"]);
        assert_eq!(table.rows()[1], vec!["4", "", ""]);
        assert_eq!(table.rows()[2], vec!["5", "6", "7"]);
    }

    #[test]
    fn test_header_only_is_empty_table() {
        let table = parse_table("Region,Pass,Fail\n", ',').unwrap();
        assert!(table.is_empty());
        assert_eq!(table.headers().len(), 3);
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_table("", ','), Err(CsvError::EmptyFile)));
        assert!(matches!(parse_table("\n\n", ','), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_duplicate_header_error() {
        let result = parse_table("Region,Pass,Pass\nCentral,1,2", ',');
        assert!(matches!(result, Err(CsvError::DuplicateColumn(_))));
    }

    #[test]
    fn test_grid_keeps_ragged_rows() {
        let grid = parse_grid("a,b,c\n,,\nx\n", ',').unwrap();
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.cell(0, 2), "c");
        assert_eq!(grid.cell(2, 0), "x");
        assert_eq!(grid.cell(2, 2), "");
    }

    #[test]
    fn test_empty_grid_is_not_an_error() {
        let grid = parse_grid("", ',').unwrap();
        assert_eq!(grid.row_count(), 0);
        assert_eq!(grid.width(), 0);
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
        let csv = "Outlet;Pass;Fail\nMT;4;2\nPY;5;3";
        let result = parse_bytes_auto(csv.as_bytes()).unwrap();

        assert_eq!(result.delimiter, ';');
        assert_eq!(result.table.len(), 2);
        assert_eq!(result.headers(), ["Outlet", "Pass", "Fail"]);
    }

    #[test]
    fn test_bom_stripped() {
        let bytes = "\u{feff}Region,Pass\nCentral,1".as_bytes();
        let result = parse_bytes_auto(bytes).unwrap();
        assert_eq!(result.headers()[0], "Region");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert!(decoded.contains("Soci"));
    }

    #[test]
    fn test_latin1_decodes_every_byte() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let decoded = decode_content(&bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded.chars().count(), 256);
    }
}
