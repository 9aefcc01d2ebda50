use serde::{Deserialize, Serialize};

use super::AccountDetails;

pub type BeneficiaryId = i64;

/// A saved payee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beneficiary {
    pub id: BeneficiaryId,
    pub first_name: String,
    pub last_name: String,
    /// Formatted IBAN, grouped by four
    pub iban: String,
}

impl Beneficiary {
    pub fn new(
        id: BeneficiaryId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        iban: impl Into<String>,
    ) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            iban: iban.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Recipient details used to prefill a transaction.
    pub fn to_account(&self) -> AccountDetails {
        AccountDetails::new(self.full_name(), self.iban.clone())
    }

    /// Case-insensitive substring match against the full name.
    pub fn matches(&self, query: &str) -> bool {
        self.full_name()
            .to_lowercase()
            .contains(&query.to_lowercase())
    }
}

/// Persisted payload under the beneficiary key. Older data holds a single
/// object instead of a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredBeneficiaries {
    Many(Vec<Beneficiary>),
    One(Beneficiary),
}

impl From<StoredBeneficiaries> for Vec<Beneficiary> {
    fn from(stored: StoredBeneficiaries) -> Self {
        match stored {
            StoredBeneficiaries::Many(list) => list,
            StoredBeneficiaries::One(single) => vec![single],
        }
    }
}

/// Next id: one past the highest id in use, 1 for an empty directory.
/// Gaps left by deletions are not reused.
pub fn next_beneficiary_id(existing: &[Beneficiary]) -> BeneficiaryId {
    existing.iter().map(|b| b.id).max().unwrap_or(0) + 1
}

/// Filter beneficiaries by name; an empty query keeps everything.
pub fn filter_beneficiaries<'a>(
    beneficiaries: &'a [Beneficiary],
    query: &str,
) -> Vec<&'a Beneficiary> {
    beneficiaries.iter().filter(|b| b.matches(query)).collect()
}
