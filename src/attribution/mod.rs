// Attribution metadata: the optional per-file CSV going in, and the audit
// log coming out.
mod error;
pub mod log;
pub mod store;

pub use error::AttributionError;
pub use log::{AttributionLogger, AuditRow};
pub use store::{AttributionEntry, AttributionStore};
