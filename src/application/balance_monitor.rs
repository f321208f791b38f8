use std::time::Duration;

use tracing::{event, instrument, Level};

use crate::domain::{BalanceError, BalanceInfo, BalanceSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub base_interval: Duration,
    /// Used instead of `base_interval` until a refresh succeeds again.
    pub failure_interval: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(8 * 60 * 60),
            failure_interval: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Updated {
        balance: BalanceInfo,
        next_in: Duration,
    },
    Failed {
        error: BalanceError,
        next_in: Duration,
    },
    /// Login was refused; retrying on a timer will not help.
    Halted { error: BalanceError },
}

impl RefreshOutcome {
    pub fn next_in(&self) -> Option<Duration> {
        match self {
            Self::Updated { next_in, .. } | Self::Failed { next_in, .. } => Some(*next_in),
            Self::Halted { .. } => None,
        }
    }
}

/// Periodic refresh bookkeeping for one account.
///
/// The last successful snapshot stays available across failed refreshes.
/// After a failure that looks like a stale session, the source is asked to
/// drop its session so the next refresh starts with a fresh login.
#[derive(Debug)]
pub struct BalanceMonitor<S> {
    source: S,
    policy: RefreshPolicy,
    last_good: Option<BalanceInfo>,
    last_error: Option<BalanceError>,
    interval: Duration,
}

impl<S: BalanceSource> BalanceMonitor<S> {
    pub fn new(source: S, policy: RefreshPolicy) -> Self {
        Self {
            source,
            policy,
            last_good: None,
            last_error: None,
            interval: policy.base_interval,
        }
    }

    #[instrument(skip(self))]
    pub fn refresh(&mut self) -> RefreshOutcome {
        match self.source.fetch_balance() {
            Ok(balance) => {
                event!(Level::INFO, amount = balance.amount, "Balance updated");
                self.last_good = Some(balance.clone());
                self.last_error = None;
                self.interval = self.policy.base_interval;
                RefreshOutcome::Updated {
                    balance,
                    next_in: self.interval,
                }
            }
            Err(report) => {
                let error = report.current_context().clone();
                event!(Level::WARN, error = ?report, "Balance update failed");
                self.last_error = Some(error.clone());

                if error.is_authentication() {
                    return RefreshOutcome::Halted { error };
                }

                if error.suggests_stale_session() {
                    self.source.reset_session();
                }
                self.interval = self.policy.failure_interval;
                RefreshOutcome::Failed {
                    error,
                    next_in: self.interval,
                }
            }
        }
    }

    pub fn last_good(&self) -> Option<&BalanceInfo> {
        self.last_good.as_ref()
    }

    pub fn last_error(&self) -> Option<&BalanceError> {
        self.last_error.as_ref()
    }

    pub fn current_interval(&self) -> Duration {
        self.interval
    }
}
