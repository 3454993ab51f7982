//! Ledger persistence port trait.

use crate::domain::error::TpslError;
use crate::domain::ledger::Ledger;

/// Whole-ledger storage: loaded and saved wholesale, no incremental append.
pub trait LedgerPort {
    fn load(&self) -> Result<Ledger, TpslError>;
    fn save(&self, ledger: &Ledger) -> Result<(), TpslError>;
}
