//! Reading uploaded CSV statements

use crate::error::{HandlerError, RowError};
use chrono::{DateTime, NaiveDate};
use csv::{ReaderBuilder, StringRecord, Trim};
use finuchet_repo::csv_repo::CsvRecord;
use finuchet_repo::transaction_repo::TransactionKind;
use rust_decimal::Decimal;
use std::str::FromStr;

struct Columns {
    date: usize,
    kind: usize,
    amount: usize,
    category: Option<usize>,
    description: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Columns, HandlerError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| {
            find(name).ok_or_else(|| {
                HandlerError::bad_request(format!("CSV is missing the {} column", name))
            })
        };
        Ok(Columns {
            date: required("date")?,
            kind: required("type")?,
            amount: required("amount")?,
            category: find("category"),
            description: find("description"),
        })
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|d| d.date_naive()))
        .ok()
}

/// Accepts `,` as the decimal separator and ignores spaces used as thousands separators
fn parse_amount(value: &str) -> Option<Decimal> {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    Decimal::from_str(&normalized).ok()
}

fn optional(record: &StringRecord, column: Option<usize>) -> Option<String> {
    column
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn parse_record(record: &StringRecord, columns: &Columns) -> Result<CsvRecord, String> {
    let field = |i: usize| record.get(i).map(str::trim).unwrap_or_default();

    let date = field(columns.date);
    let date = parse_date(date).ok_or_else(|| format!("Invalid date '{}'", date))?;
    let kind = field(columns.kind);
    let kind = TransactionKind::from_str(kind)
        .map_err(|_| format!("Invalid type '{}', expected income or expense", kind))?;
    let amount = field(columns.amount);
    let amount = parse_amount(amount)
        .filter(|a| *a > Decimal::ZERO)
        .ok_or_else(|| format!("Invalid amount '{}'", amount))?;

    Ok(CsvRecord {
        date,
        kind,
        category: optional(record, columns.category),
        amount,
        description: optional(record, columns.description),
    })
}

/// Parses a statement with a header row. Every invalid row is reported, the statement is only
/// accepted when all rows are valid.
pub fn parse_statement(data: &[u8]) -> Result<Vec<CsvRecord>, HandlerError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| HandlerError::bad_request(format!("Unable to read CSV header: {}", e)))?
        .clone();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(HandlerError::bad_request("CSV file is empty"));
    }
    let columns = Columns::from_headers(&headers)?;

    let mut records = Vec::new();
    let mut errors = Vec::new();
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                errors.push(RowError {
                    line: e.position().map_or(0, |p| p.line()),
                    message: e.to_string(),
                });
                continue;
            }
        };
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        match parse_record(&record, &columns) {
            Ok(parsed) => records.push(parsed),
            Err(message) => errors.push(RowError {
                line: record.position().map_or(0, |p| p.line()),
                message,
            }),
        }
    }

    if !errors.is_empty() {
        return Err(HandlerError::InvalidRows(errors));
    }
    if records.is_empty() {
        return Err(HandlerError::bad_request("CSV file contains no rows"));
    }
    Ok(records)
}
