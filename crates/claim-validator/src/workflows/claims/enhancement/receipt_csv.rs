use std::fs::File;
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::warn;

use super::super::domain::{parse_amount, parse_date};
use super::receipts::{ReceiptQuery, ReceiptRecord, ReceiptSource, ReceiptSourceError};

/// Failure to load a transaction export.
#[derive(Debug)]
pub enum ReceiptImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for ReceiptImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReceiptImportError::Io(err) => write!(f, "failed to read receipt export: {}", err),
            ReceiptImportError::Csv(err) => write!(f, "invalid receipt CSV data: {}", err),
        }
    }
}

impl std::error::Error for ReceiptImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReceiptImportError::Io(err) => Some(err),
            ReceiptImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ReceiptImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ReceiptImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Receipt source backed by a transaction export with the columns
/// `company,merchant,total_amount,date,items,payment_method`.
///
/// Items are separated by `;`. Rows whose amount or date cannot be read are
/// skipped when the export is loaded.
#[derive(Debug, Clone, Default)]
pub struct CsvReceiptSource {
    rows: Vec<(String, ReceiptRecord)>,
}

impl CsvReceiptSource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReceiptImportError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReceiptImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut rows = Vec::new();

        for (line, row) in csv_reader.deserialize::<ReceiptRow>().enumerate() {
            let row = row?;
            match row.into_record() {
                Some(entry) => rows.push(entry),
                None => warn!(row = line + 1, "skipping receipt row with unreadable amount or date"),
            }
        }

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl ReceiptSource for CsvReceiptSource {
    async fn find(&self, query: &ReceiptQuery) -> Result<Vec<ReceiptRecord>, ReceiptSourceError> {
        Ok(self
            .rows
            .iter()
            .filter(|(company, record)| {
                company.eq_ignore_ascii_case(&query.company) && query.window.contains(record.date)
            })
            .map(|(_, record)| record.clone())
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct ReceiptRow {
    company: String,
    merchant: String,
    total_amount: String,
    date: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    items: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    payment_method: Option<String>,
}

impl ReceiptRow {
    fn into_record(self) -> Option<(String, ReceiptRecord)> {
        let total_amount = parse_amount(&self.total_amount)?;
        let date = parse_date(&self.date)?;
        let items = self
            .items
            .map(|items| {
                items
                    .split(';')
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Some((
            self.company.to_ascii_lowercase(),
            ReceiptRecord {
                merchant: self.merchant,
                total_amount,
                date,
                items,
                payment_method: self.payment_method,
            },
        ))
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
