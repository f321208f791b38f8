use super::{BalanceError, BalanceInfo};

pub trait BalanceSource {
    /// Fetches a fresh snapshot of the account balance.
    fn fetch_balance(&mut self) -> error_stack::Result<BalanceInfo, BalanceError>;

    /// Drops any established session so the next fetch logs in again.
    fn reset_session(&mut self);
}
