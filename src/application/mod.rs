// Application layer - the services screens and commands talk to.
// Both services own their store handle; construct them once and pass
// them to whatever needs them.

pub mod directory;
pub mod error;
pub mod ledger;

pub use directory::*;
pub use error::*;
pub use ledger::*;
