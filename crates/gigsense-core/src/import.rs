//! Bank statement CSV import
//!
//! One fixed format: `Date, Description, Amount, Type` with a header row,
//! where Type is `credit` or `debit`. Credits are stored positive and debits
//! negative regardless of how the bank signed the Amount column. Rows that
//! are missing a field or fail to parse are dropped, not errors; the caller
//! gets a count of what was skipped.

use chrono::NaiveDate;
use csv::ReaderBuilder;
use sha2::{Digest, Sha256};
use std::io::Read;
use tracing::debug;

use crate::error::Result;
use crate::models::{NewTransaction, TransactionSource};

/// Result of parsing one CSV upload
#[derive(Debug, Clone)]
pub struct CsvBatch {
    pub transactions: Vec<NewTransaction>,
    /// Rows dropped for a missing field or unparseable date/amount/type
    pub skipped: usize,
}

/// Parse statement CSV data into new transactions.
///
/// Blank lines are skipped by the reader; malformed rows are counted in
/// `skipped` and logged at debug level.
pub fn parse_csv<R: Read>(reader: R) -> Result<CsvBatch> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut transactions = Vec::new();
    let mut skipped = 0;

    for result in rdr.records() {
        let record = result?;

        let Some(date_str) = record.get(0) else {
            skipped += 1;
            debug!("Skipping row with no date field");
            continue;
        };
        let Some(description) = record.get(1) else {
            skipped += 1;
            debug!("Skipping row with no description field");
            continue;
        };
        let Some(amount_str) = record.get(2) else {
            skipped += 1;
            debug!("Skipping row with no amount field");
            continue;
        };
        let Some(type_str) = record.get(3) else {
            skipped += 1;
            debug!("Skipping row with no type field");
            continue;
        };

        let Some(date) = parse_date(date_str) else {
            skipped += 1;
            debug!("Skipping row with unparseable date: {}", date_str);
            continue;
        };
        let Some(magnitude) = parse_amount(amount_str) else {
            skipped += 1;
            debug!("Skipping row with unparseable amount: {}", amount_str);
            continue;
        };

        // Sign comes from the Type column alone
        let amount = match type_str.trim().to_lowercase().as_str() {
            "credit" => magnitude.abs(),
            "debit" => -magnitude.abs(),
            other => {
                skipped += 1;
                debug!("Skipping row with unknown type: {}", other);
                continue;
            }
        };

        let description = description.trim().to_string();
        let external_id = generate_hash(&date, &description, amount);

        transactions.push(NewTransaction {
            external_id,
            date,
            posted_at: None,
            description,
            amount,
            merchant_name: None,
            category: None,
            pending: false,
            source: TransactionSource::Csv,
        });
    }

    debug!(
        "Parsed {} transactions ({} rows skipped)",
        transactions.len(),
        skipped
    );
    Ok(CsvBatch {
        transactions,
        skipped,
    })
}

/// Content hash used as the external id for CSV rows, so re-importing the
/// same statement dedupes instead of duplicating
pub fn generate_hash(date: &NaiveDate, description: &str, amount: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(description.as_bytes());
    hasher.update(amount.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Parse a date string in common statement formats
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d", // 2024-06-01
        "%m/%d/%Y", // 06/01/2024
        "%m/%d/%y", // 06/01/24
        "%m-%d-%Y", // 06-01-2024
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    None
}

/// Parse an amount string, handling currency symbols, commas, and parens
fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(
            parse_date("2024-06-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert_eq!(
            parse_date("06/01/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert!(parse_date("June 1st").is_none());
    }

    #[test]
    fn test_parse_amount_cleaning() {
        assert_eq!(parse_amount("$1,234.56").unwrap(), 1234.56);
        assert_eq!(parse_amount("-123.45").unwrap(), -123.45);
        assert_eq!(parse_amount("(100.00)").unwrap(), -100.00);
        assert!(parse_amount("abc").is_none());
    }

    #[test]
    fn test_parse_credit_row() {
        let csv = r#"Date,Description,Amount,Type
2024-06-01,UBER BV WEEKLY EARNINGS,520.50,credit"#;

        let batch = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(batch.transactions.len(), 1);
        assert_eq!(batch.skipped, 0);
        assert_eq!(batch.transactions[0].amount, 520.50);
        assert_eq!(batch.transactions[0].description, "UBER BV WEEKLY EARNINGS");
        assert_eq!(
            batch.transactions[0].date,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
    }

    #[test]
    fn test_debit_stored_negative() {
        let csv = r#"Date,Description,Amount,Type
2024-06-02,SHELL GAS STATION,45.00,debit"#;

        let batch = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(batch.transactions[0].amount, -45.00);
    }

    #[test]
    fn test_type_overrides_csv_sign() {
        // Credit rows come out positive and debit rows negative no matter
        // how the bank signed the Amount column
        let csv = r#"Date,Description,Amount,Type
2024-06-01,LYFT PAYOUT,-300.00,credit
2024-06-02,CARD PAYMENT,-120.00,debit"#;

        let batch = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(batch.transactions[0].amount, 300.00);
        assert_eq!(batch.transactions[1].amount, -120.00);
    }

    #[test]
    fn test_malformed_rows_dropped_silently() {
        let csv = r#"Date,Description,Amount,Type
2024-06-01,UBER PAYOUT,450.00,credit
not-a-date,BAD ROW,10.00,credit
2024-06-03,MISSING TYPE,20.00
2024-06-04,BAD AMOUNT,abc,credit
2024-06-05,BAD TYPE,30.00,transfer
2024-06-06,DOORDASH PAYMENT,320.00,credit"#;

        let batch = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(batch.transactions.len(), 2);
        assert_eq!(batch.skipped, 4);
        assert_eq!(batch.transactions[0].description, "UBER PAYOUT");
        assert_eq!(batch.transactions[1].description, "DOORDASH PAYMENT");
    }

    #[test]
    fn test_blank_lines_skipped() {
        let csv = "Date,Description,Amount,Type\n2024-06-01,UBER,450.00,credit\n\n\n2024-06-02,LYFT,200.00,credit\n";

        let batch = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(batch.transactions.len(), 2);
        assert_eq!(batch.skipped, 0);
    }

    #[test]
    fn test_type_case_insensitive() {
        let csv = r#"Date,Description,Amount,Type
2024-06-01,UBER,450.00,Credit
2024-06-02,GAS,40.00,DEBIT"#;

        let batch = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(batch.transactions[0].amount, 450.00);
        assert_eq!(batch.transactions[1].amount, -40.00);
    }

    #[test]
    fn test_hash_is_stable_and_distinct() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let a = generate_hash(&date, "UBER PAYOUT", 450.0);
        let b = generate_hash(&date, "UBER PAYOUT", 450.0);
        let c = generate_hash(&date, "UBER PAYOUT", 451.0);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_reimport_produces_same_ids() {
        let csv = r#"Date,Description,Amount,Type
2024-06-01,UBER BV WEEKLY EARNINGS,520.50,credit"#;

        let first = parse_csv(csv.as_bytes()).unwrap();
        let second = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(
            first.transactions[0].external_id,
            second.transactions[0].external_id
        );
    }
}
