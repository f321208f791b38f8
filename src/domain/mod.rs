pub mod balance;
pub mod balance_source;
pub mod error;

pub use balance::{select_most_urgent, BalanceInfo, MONETARY_UNIT};
pub use balance_source::BalanceSource;
pub use error::{AuthenticationFailure, BalanceError};
