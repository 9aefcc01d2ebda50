use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::LedgerStore;
use crate::domain::{Beneficiary, Transaction, TransactionId, decimal_amount, format_cents};
use crate::storage::KeyValueStore;

/// Full export of ledger and directory
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<'a> {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    #[serde(with = "decimal_amount")]
    pub balance: i64,
    pub transactions: &'a [Transaction],
    pub beneficiaries: &'a [Beneficiary],
}

/// Creation time encoded in a transaction id, as RFC 3339.
pub fn transaction_time(id: TransactionId) -> String {
    DateTime::from_timestamp_millis(id)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

/// Exporter for writing ledger and directory data out as CSV or JSON
pub struct Exporter<'a, S> {
    ledger: &'a LedgerStore<S>,
    beneficiaries: &'a [Beneficiary],
}

impl<'a, S: KeyValueStore> Exporter<'a, S> {
    pub fn new(ledger: &'a LedgerStore<S>, beneficiaries: &'a [Beneficiary]) -> Self {
        Self {
            ledger,
            beneficiaries,
        }
    }

    /// Export transactions to CSV, oldest first
    pub fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["id", "created_at", "amount", "name", "iban"])?;

        let mut count = 0;
        for tx in self.ledger.transactions() {
            csv_writer.write_record([
                tx.id.to_string(),
                transaction_time(tx.id),
                format_cents(tx.amount),
                tx.account.name.clone(),
                tx.account.iban.clone(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export beneficiaries to CSV
    pub fn export_beneficiaries_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["id", "first_name", "last_name", "iban"])?;

        for b in self.beneficiaries {
            csv_writer.write_record([
                b.id.to_string().as_str(),
                b.first_name.as_str(),
                b.last_name.as_str(),
                b.iban.as_str(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(self.beneficiaries.len())
    }

    /// Export transactions as a JSON array, same shape as the stored history
    pub fn export_transactions_json<W: Write>(&self, mut writer: W) -> Result<usize> {
        let transactions = self.ledger.transactions();
        serde_json::to_writer_pretty(&mut writer, transactions)?;
        writer.flush()?;
        Ok(transactions.len())
    }

    /// Export beneficiaries as a JSON array
    pub fn export_beneficiaries_json<W: Write>(&self, mut writer: W) -> Result<usize> {
        serde_json::to_writer_pretty(&mut writer, self.beneficiaries)?;
        writer.flush()?;
        Ok(self.beneficiaries.len())
    }

    /// Export everything as one JSON snapshot
    pub fn export_full_json<W: Write>(&self, mut writer: W) -> Result<Snapshot<'a>> {
        let snapshot = Snapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            balance: self.ledger.balance(),
            transactions: self.ledger.transactions(),
            beneficiaries: self.beneficiaries,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountDetails;
    use crate::storage::MemoryStore;

    async fn ledger_with_two_payments() -> LedgerStore<MemoryStore> {
        let mut ledger = LedgerStore::initialize(MemoryStore::new()).await;
        ledger
            .add_transaction(25050, AccountDetails::new("Jane Doe", "GB29 NWBK 6016 1331 9268 19"))
            .await
            .unwrap();
        ledger
            .add_transaction(1000, AccountDetails::new("John, Jr.", "DE89 3704 0044 0532 0130 00"))
            .await
            .unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_export_transactions_csv() {
        let ledger = ledger_with_two_payments().await;
        let exporter = Exporter::new(&ledger, &[]);

        let mut out = Vec::new();
        let count = exporter.export_transactions_csv(&mut out).unwrap();

        assert_eq!(count, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "id,created_at,amount,name,iban");
        assert!(lines[1].ends_with(",250.50,Jane Doe,GB29 NWBK 6016 1331 9268 19"));
        // comma in the name gets quoted
        assert!(lines[2].contains(r#""John, Jr.""#));
    }

    #[tokio::test]
    async fn test_export_beneficiaries_csv() {
        let ledger = LedgerStore::initialize(MemoryStore::new()).await;
        let beneficiaries = vec![Beneficiary::new(1, "Jane", "Doe", "GB29 NWBK")];
        let exporter = Exporter::new(&ledger, &beneficiaries);

        let mut out = Vec::new();
        assert_eq!(exporter.export_beneficiaries_csv(&mut out).unwrap(), 1);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "id,first_name,last_name,iban\n1,Jane,Doe,GB29 NWBK\n");
    }

    #[tokio::test]
    async fn test_export_full_json() {
        let ledger = ledger_with_two_payments().await;
        let beneficiaries = vec![Beneficiary::new(1, "Jane", "Doe", "GB29 NWBK")];
        let exporter = Exporter::new(&ledger, &beneficiaries);

        let mut out = Vec::new();
        let snapshot = exporter.export_full_json(&mut out).unwrap();
        assert_eq!(snapshot.transactions.len(), 2);

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["balance"], 739.5);
        assert_eq!(value["transactions"][0]["amount"], 250.5);
        assert_eq!(value["beneficiaries"][0]["firstName"], "Jane");
    }

    #[test]
    fn test_transaction_time() {
        assert_eq!(transaction_time(0), "1970-01-01T00:00:00+00:00");
    }
}
