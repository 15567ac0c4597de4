//! SQLite persistence for pathways, traces, temporal patterns and predictions

mod error;
mod pathways;
mod patterns;
mod predictions;
mod store;
mod traces;

pub use error::{Result, StoreError};
pub use store::Store;
pub use traces::{PendingTrace, ResolvedTrace};
