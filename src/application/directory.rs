use crate::domain::{
    Beneficiary, BeneficiaryId, IbanMode, StoredBeneficiaries, evaluate_iban,
    filter_beneficiaries, next_beneficiary_id,
};
use crate::storage::{BENEFICIARY_KEY, KeyValueStore};

use super::AppError;

/// Outcome of [`BeneficiaryDirectory::remove`].
#[derive(Debug, Clone)]
pub struct BeneficiaryRemoval {
    pub beneficiary: Beneficiary,
    /// False when the shortened list could not be written back. The
    /// cached list has dropped the beneficiary either way.
    pub persisted: bool,
}

/// Saved payees, persisted as one JSON list.
pub struct BeneficiaryDirectory<S> {
    store: S,
    mode: IbanMode,
    cached: Vec<Beneficiary>,
}

impl<S: KeyValueStore> BeneficiaryDirectory<S> {
    pub fn new(store: S, mode: IbanMode) -> Self {
        Self {
            store,
            mode,
            cached: Vec::new(),
        }
    }

    pub fn mode(&self) -> IbanMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: IbanMode) {
        self.mode = mode;
    }

    /// The list as of the last read or write.
    pub fn cached(&self) -> &[Beneficiary] {
        &self.cached
    }

    async fn load(&self) -> Result<Vec<Beneficiary>, AppError> {
        let stored = self
            .store
            .get_item(BENEFICIARY_KEY)
            .await
            .map_err(AppError::StorageRead)?;

        match stored {
            Some(json) => {
                let parsed: StoredBeneficiaries = serde_json::from_str(&json).map_err(|e| {
                    AppError::StorageRead(
                        anyhow::Error::new(e).context("Corrupt beneficiary list"),
                    )
                })?;
                Ok(parsed.into())
            }
            None => Ok(Vec::new()),
        }
    }

    async fn save(&mut self, beneficiaries: Vec<Beneficiary>) -> Result<(), AppError> {
        let json = serde_json::to_string(&beneficiaries)
            .map_err(|e| AppError::StorageWrite(e.into()))?;
        self.store
            .set_item(BENEFICIARY_KEY, &json)
            .await
            .map_err(AppError::StorageWrite)?;
        self.cached = beneficiaries;
        Ok(())
    }

    /// Validate and save a new beneficiary. The IBAN is checked under the
    /// directory's mode and stored in grouped form.
    pub async fn add(
        &mut self,
        first_name: &str,
        last_name: &str,
        iban: &str,
    ) -> Result<Beneficiary, AppError> {
        let first_name = first_name.trim();
        let last_name = last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(AppError::MissingName);
        }

        let input = evaluate_iban(self.mode, iban);
        if !input.is_valid() {
            return Err(AppError::InvalidIban(input.formatted));
        }

        // read-append-write; not atomic against other writers
        let mut beneficiaries = self.load().await?;
        let beneficiary = Beneficiary::new(
            next_beneficiary_id(&beneficiaries),
            first_name,
            last_name,
            input.formatted,
        );
        beneficiaries.push(beneficiary.clone());
        self.save(beneficiaries).await?;

        tracing::info!(
            "Added beneficiary {} ({})",
            beneficiary.id,
            beneficiary.full_name()
        );
        Ok(beneficiary)
    }

    /// Read the full list fresh from the store. When the read fails the
    /// last known list is returned instead, empty if nothing was loaded yet.
    pub async fn list(&mut self) -> Vec<Beneficiary> {
        match self.load().await {
            Ok(beneficiaries) => {
                self.cached = beneficiaries.clone();
                beneficiaries
            }
            Err(e) => {
                tracing::warn!("Failed to fetch beneficiaries: {}", e);
                self.cached.clone()
            }
        }
    }

    /// Beneficiaries whose "first last" name contains `query`, ignoring case.
    pub async fn search(&mut self, query: &str) -> Vec<Beneficiary> {
        let beneficiaries = self.list().await;
        filter_beneficiaries(&beneficiaries, query)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn get(&mut self, id: BeneficiaryId) -> Result<Beneficiary, AppError> {
        self.list()
            .await
            .into_iter()
            .find(|b| b.id == id)
            .ok_or(AppError::BeneficiaryNotFound(id))
    }

    /// Delete a beneficiary by id. The cached list drops it right away; the
    /// write-through is best effort and is not rolled back on failure.
    pub async fn remove(&mut self, id: BeneficiaryId) -> Result<BeneficiaryRemoval, AppError> {
        let beneficiaries = self.list().await;
        let (removed, kept): (Vec<_>, Vec<_>) =
            beneficiaries.into_iter().partition(|b| b.id == id);
        let beneficiary = removed
            .into_iter()
            .next()
            .ok_or(AppError::BeneficiaryNotFound(id))?;

        self.cached = kept;
        tracing::info!(
            "Removed beneficiary {} ({})",
            beneficiary.id,
            beneficiary.full_name()
        );

        let persisted = match self.persist_cached().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Error deleting beneficiary {}: {}", beneficiary.id, e);
                false
            }
        };

        Ok(BeneficiaryRemoval {
            beneficiary,
            persisted,
        })
    }

    async fn persist_cached(&self) -> Result<(), AppError> {
        let json = serde_json::to_string(&self.cached)
            .map_err(|e| AppError::StorageWrite(e.into()))?;
        self.store
            .set_item(BENEFICIARY_KEY, &json)
            .await
            .map_err(AppError::StorageWrite)
    }
}
