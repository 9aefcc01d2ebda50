use chrono::Utc;

use crate::domain::{
    AccountDetails, Cents, INITIAL_BALANCE, LedgerState, Transaction, format_plain,
    parse_stored_amount,
};
use crate::storage::{AMOUNT_KEY, KeyValueStore, TRANSACTIONS_KEY};

use super::AppError;

/// Result of recording a transaction.
#[derive(Debug, Clone)]
pub struct TransactionReceipt {
    pub transaction: Transaction,
    /// Balance after the debit
    pub balance: Cents,
    /// False when writing through to the store failed. The in-memory
    /// ledger keeps the transaction either way.
    pub persisted: bool,
}

/// Owns the balance and transaction history and writes them through to
/// the key-value store after every change.
pub struct LedgerStore<S> {
    store: S,
    state: LedgerState,
}

impl<S: KeyValueStore> LedgerStore<S> {
    /// Load persisted state, seeding the initial balance when none exists.
    /// Storage problems are logged and fall back to a fresh ledger.
    pub async fn initialize(store: S) -> Self {
        let state = Self::restore(&store).await;
        Self { store, state }
    }

    /// Throw away in-memory state and read it again from the store.
    pub async fn reload(&mut self) {
        self.state = Self::restore(&self.store).await;
    }

    async fn restore(store: &S) -> LedgerState {
        match Self::load(store).await {
            Ok((Some(balance), transactions)) => LedgerState {
                balance,
                transactions,
            },
            Ok((None, transactions)) => {
                let seed = format_plain(INITIAL_BALANCE);
                match store.set_item(AMOUNT_KEY, &seed).await {
                    Ok(()) => tracing::debug!("Seeded balance {}", seed),
                    Err(e) => tracing::error!("Failed to seed balance: {:#}", e),
                }
                LedgerState {
                    balance: INITIAL_BALANCE,
                    transactions,
                }
            }
            Err(e) => {
                tracing::warn!("Falling back to an empty ledger: {}", e);
                LedgerState::default()
            }
        }
    }

    async fn load(store: &S) -> Result<(Option<Cents>, Vec<Transaction>), AppError> {
        let stored_balance = store
            .get_item(AMOUNT_KEY)
            .await
            .map_err(AppError::StorageRead)?;
        let stored_transactions = store
            .get_item(TRANSACTIONS_KEY)
            .await
            .map_err(AppError::StorageRead)?;

        let transactions = match stored_transactions {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                AppError::StorageRead(anyhow::Error::new(e).context("Corrupt transaction history"))
            })?,
            None => Vec::new(),
        };

        let balance = stored_balance
            .map(|raw| {
                parse_stored_amount(&raw).map_err(|e| {
                    AppError::StorageRead(anyhow::anyhow!("Corrupt balance {:?}: {}", raw, e))
                })
            })
            .transpose()?;

        Ok((balance, transactions))
    }

    pub fn balance(&self) -> Cents {
        self.state.balance
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.state.transactions
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Transactions newest first.
    pub fn history(&self) -> impl Iterator<Item = &Transaction> {
        self.state.history()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Record an outgoing payment.
    ///
    /// Rejects non-positive amounts and amounts above the balance without
    /// touching state. Otherwise the ledger is updated first and then
    /// written through; a failed write is logged and reported on the
    /// receipt, never rolled back.
    pub async fn add_transaction(
        &mut self,
        amount: Cents,
        account: AccountDetails,
    ) -> Result<TransactionReceipt, AppError> {
        self.state
            .check_amount(amount)
            .map_err(|e| AppError::InvalidAmount(e.to_string()))?;

        let id = self.state.next_id(Utc::now().timestamp_millis());
        let transaction = Transaction::new(id, amount, account);
        self.state.apply(transaction.clone());

        tracing::info!(
            "Recorded transaction {} of {} to {}",
            transaction.id,
            format_plain(amount),
            transaction.account.name
        );

        let persisted = match self.persist().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Error saving ledger: {}", e);
                false
            }
        };

        Ok(TransactionReceipt {
            transaction,
            balance: self.state.balance,
            persisted,
        })
    }

    async fn persist(&self) -> Result<(), AppError> {
        let transactions_json = serde_json::to_string(&self.state.transactions)
            .map_err(|e| AppError::StorageWrite(e.into()))?;

        self.store
            .set_item(AMOUNT_KEY, &format_plain(self.state.balance))
            .await
            .map_err(AppError::StorageWrite)?;
        self.store
            .set_item(TRANSACTIONS_KEY, &transactions_json)
            .await
            .map_err(AppError::StorageWrite)?;
        Ok(())
    }
}
