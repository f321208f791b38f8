use std::fmt::Debug;
use std::time::Duration;

use error_stack::{bail, Report, Result};
use tracing::{event, instrument, Level};

use crate::domain::{select_most_urgent, BalanceError, BalanceInfo, BalanceSource};
use crate::infrastructure::parsing::{extract_balances, has_no_outstanding_hint};
use crate::infrastructure::portal::{
    Authenticator, Credentials, PortalEndpoints, PortalSession, DEFAULT_TIMEOUT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

/// Single entry point for reading the account balance from the portal.
///
/// Logs in on first use and keeps the session for the rest of the process
/// lifetime; it never logs in again on its own. Calls mutate the session, so
/// concurrent use of one instance must be serialised by the caller.
pub struct BalanceRetriever {
    credentials: Credentials,
    endpoints: PortalEndpoints,
    session: PortalSession,
    state: SessionState,
}

impl Debug for BalanceRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceRetriever")
            .field("credentials", &self.credentials)
            .field("state", &self.state)
            .finish()
    }
}

impl BalanceRetriever {
    pub fn new(username: &str, password: &str) -> Result<Self, BalanceError> {
        Self::with_timeout(username, password, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, BalanceError> {
        Self::with_endpoints(username, password, timeout, PortalEndpoints::default())
    }

    pub fn with_endpoints(
        username: &str,
        password: &str,
        timeout: Duration,
        endpoints: PortalEndpoints,
    ) -> Result<Self, BalanceError> {
        if username.trim().is_empty() || password.is_empty() {
            bail!(BalanceError::InvalidArgument(
                "username and password must be provided".to_owned()
            ));
        }

        Ok(Self {
            credentials: Credentials {
                username: username.to_owned(),
                password: password.to_owned(),
            },
            endpoints,
            session: PortalSession::new(timeout)?,
            state: SessionState::Unauthenticated,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Returns the largest outstanding payment, or a zero balance when the
    /// portal confirms nothing is owed.
    #[instrument(skip(self), fields(username = %self.credentials.username))]
    pub fn get_balance_details(&mut self) -> Result<BalanceInfo, BalanceError> {
        if !self.is_authenticated() {
            Authenticator::new(&self.session, &self.endpoints).login(&self.credentials)?;
            self.state = SessionState::Authenticated;
        }

        let payload = self.fetch_finance_payload()?;
        let balances = extract_balances(&payload);
        event!(Level::DEBUG, count = balances.len(), "Extracted balance entries");

        match select_most_urgent(balances) {
            Some(balance) => Ok(balance),
            None if has_no_outstanding_hint(&payload) => {
                event!(Level::DEBUG, "No outstanding payments detected");
                Ok(BalanceInfo::settled())
            }
            None => Err(Report::new(BalanceError::NoDataFound)
                .attach_printable(format!("Payload length: {}", payload.len()))),
        }
    }

    /// Forgets the current session: cookies are dropped and the next call
    /// logs in again.
    pub fn restart_session(&mut self) -> Result<(), BalanceError> {
        self.session = PortalSession::new(self.session.timeout())?;
        self.state = SessionState::Unauthenticated;
        Ok(())
    }

    /// Tries the primary finance page, then each fallback, returning the
    /// first successful body.
    fn fetch_finance_payload(&self) -> Result<String, BalanceError> {
        let mut failures = Vec::new();

        for (position, url) in self.endpoints.finance.iter().enumerate() {
            match self.session.get(url, Some(&self.endpoints.index)) {
                Ok(response) => {
                    if position > 0 {
                        event!(Level::DEBUG, url = %url, "Using fallback finance endpoint");
                    }
                    return Ok(response.body);
                }
                Err(report) => {
                    let reason = match report.current_context() {
                        BalanceError::HttpStatusError { status, excerpt } => {
                            format!("{} -> {}: {}", url, status, excerpt)
                        }
                        BalanceError::NetworkError(reason) => {
                            format!("{} -> network error: {}", url, reason)
                        }
                        other => format!("{} -> {}", url, other),
                    };
                    event!(Level::DEBUG, %reason, "Finance endpoint failed");
                    failures.push(reason);
                }
            }
        }

        bail!(BalanceError::ScraperError(failures.join("; ")))
    }
}

impl BalanceSource for BalanceRetriever {
    fn fetch_balance(&mut self) -> Result<BalanceInfo, BalanceError> {
        self.get_balance_details()
    }

    fn reset_session(&mut self) {
        if let Err(report) = self.restart_session() {
            event!(Level::WARN, error = ?report, "Failed to reset portal session");
        }
    }
}
