use tracing::{event, Level};

use crate::domain::{BalanceInfo, BalanceSource};

#[derive(Debug, Clone, PartialEq)]
pub enum CredentialsCheck {
    Valid(BalanceInfo),
    InvalidAuth,
    Unknown,
}

impl CredentialsCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Stable key for callers that localise their own messages.
    pub fn error_key(&self) -> Option<&'static str> {
        match self {
            Self::Valid(_) => None,
            Self::InvalidAuth => Some("invalid_auth"),
            Self::Unknown => Some("unknown"),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Valid(_) => "Credentials accepted",
            Self::InvalidAuth => {
                "Invalid credentials, or the portal asks for additional verification in the browser"
            }
            Self::Unknown => "Unknown error while contacting the portal",
        }
    }
}

/// Confirms credentials with exactly one balance query before they are stored.
pub fn check_credentials<S: BalanceSource>(source: &mut S) -> CredentialsCheck {
    match source.fetch_balance() {
        Ok(balance) => CredentialsCheck::Valid(balance),
        Err(report) if report.current_context().is_authentication() => {
            event!(Level::DEBUG, error = %report, "Credentials rejected");
            CredentialsCheck::InvalidAuth
        }
        Err(report) => {
            event!(Level::WARN, error = ?report, "Credentials check failed");
            CredentialsCheck::Unknown
        }
    }
}
