use serde::{Deserialize, Serialize};

use super::{Cents, INITIAL_BALANCE, decimal_amount};

/// Millisecond timestamp at creation; doubles as the transaction id.
pub type TransactionId = i64;

/// Counterparty of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDetails {
    pub name: String,
    /// Formatted IBAN, grouped by four
    pub iban: String,
}

impl AccountDetails {
    pub fn new(name: impl Into<String>, iban: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            iban: iban.into(),
        }
    }
}

/// An outgoing payment. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Amount in cents (always positive), a decimal number on the wire
    #[serde(with = "decimal_amount")]
    pub amount: Cents,
    pub account: AccountDetails,
}

impl Transaction {
    pub fn new(id: TransactionId, amount: Cents, account: AccountDetails) -> Self {
        assert!(amount > 0, "Transaction amount must be positive");
        Self {
            id,
            amount,
            account,
        }
    }
}

/// Balance plus the ordered transaction history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerState {
    pub balance: Cents,
    pub transactions: Vec<Transaction>,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            balance: INITIAL_BALANCE,
            transactions: Vec::new(),
        }
    }
}

impl LedgerState {
    /// Check an amount against the current balance.
    pub fn check_amount(&self, amount: Cents) -> Result<(), AmountError> {
        if amount <= 0 {
            return Err(AmountError::NotPositive);
        }
        if amount > self.balance {
            return Err(AmountError::ExceedsBalance {
                balance: self.balance,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Next transaction id: the current time, bumped past the last id so
    /// history stays ordered even when two payments land in the same
    /// millisecond.
    pub fn next_id(&self, now_millis: TransactionId) -> TransactionId {
        match self.transactions.last() {
            Some(last) if last.id >= now_millis => last.id + 1,
            _ => now_millis,
        }
    }

    /// Append a transaction and debit the balance. The caller validates
    /// the amount first.
    pub fn apply(&mut self, transaction: Transaction) {
        self.balance -= transaction.amount;
        self.transactions.push(transaction);
    }

    /// Sum of everything ever sent.
    pub fn total_spent(&self) -> Cents {
        self.transactions.iter().map(|t| t.amount).sum()
    }

    /// Transactions newest first.
    pub fn history(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().rev()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    NotPositive,
    ExceedsBalance { balance: Cents, requested: Cents },
}

impl std::fmt::Display for AmountError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AmountError::NotPositive => write!(f, "amount must be positive"),
            AmountError::ExceedsBalance { balance, requested } => write!(
                f,
                "amount {} exceeds balance {}",
                super::format_cents(*requested),
                super::format_cents(*balance)
            ),
        }
    }
}

impl std::error::Error for AmountError {}
