mod beneficiary;
mod iban;
mod money;
mod transaction;

pub use beneficiary::*;
pub use iban::*;
pub use money::*;
pub use transaction::*;
