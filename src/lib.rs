//! Reads the outstanding balance of a PGE eBOK account.
//!
//! The portal has no API: [`BalanceRetriever`] logs in through the HTML form,
//! fetches the finance page and scrapes the invoices out of it.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{BalanceRetriever, SessionState};
pub use domain::{AuthenticationFailure, BalanceError, BalanceInfo, BalanceSource};
