pub mod sync;

pub use sync::{SaveOutcome, SyncService};
