use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationFailure {
    #[error("incorrect credentials")]
    CredentialsRejected,
    #[error("portal requires additional verification, complete it in the browser first")]
    VerificationRequired,
}

/// Every failure leaving the balance retriever is one of these kinds.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BalanceError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP status error {status}: {excerpt}")]
    HttpStatusError { status: u16, excerpt: String },

    #[error("Login failed: {0}")]
    AuthenticationError(AuthenticationFailure),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Could not find any outstanding payments in response")]
    NoDataFound,

    #[error("Unable to retrieve finance data: {0}")]
    ScraperError(String),
}

impl BalanceError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::AuthenticationError(_))
    }

    /// Failures that usually mean the portal served something other than
    /// the finance page, e.g. because the session went stale.
    pub fn suggests_stale_session(&self) -> bool {
        matches!(self, Self::MalformedPayload(_) | Self::NoDataFound)
    }
}
