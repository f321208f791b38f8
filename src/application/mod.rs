pub mod balance_monitor;
pub mod balance_retriever;
pub mod credentials_check;

pub use balance_monitor::{BalanceMonitor, RefreshOutcome, RefreshPolicy};
pub use balance_retriever::{BalanceRetriever, SessionState};
pub use credentials_check::{check_credentials, CredentialsCheck};
