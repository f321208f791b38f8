use std::fmt::Debug;
use std::sync::LazyLock;

use error_stack::{bail, Result, ResultExt};
use scraper::{Html, Selector};
use tracing::{event, instrument, Level};

use super::endpoints::PortalEndpoints;
use super::session::{PortalResponse, PortalSession};
use crate::domain::{AuthenticationFailure, BalanceError};

const LOGIN_FORM: &str = "hiddenLoginForm";
const USERNAME_FIELD: &str = "hiddenLoginForm:hiddenLogin";
const PASSWORD_FIELD: &str = "hiddenLoginForm:hiddenPassword";
const SUBMIT_FIELD: &str = "hiddenLoginForm:loginButton";
const SUBMIT_VALUE: &str = "Zaloguj";
const VIEW_STATE_FIELD: &str = "javax.faces.ViewState";

const LOGIN_PATH_MARKER: &str = "logowanie";
const VERIFICATION_MARKER: &str = "weryfikacja";

static VIEW_STATE_INPUT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"input[name="javax.faces.ViewState"]"#)
        .expect("View state selector should parse")
});

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Performs the JSF login handshake on a portal session.
pub struct Authenticator<'a> {
    session: &'a PortalSession,
    endpoints: &'a PortalEndpoints,
}

impl<'a> Authenticator<'a> {
    pub fn new(session: &'a PortalSession, endpoints: &'a PortalEndpoints) -> Self {
        Self { session, endpoints }
    }

    /// Logs in and warms the session up. Returns only once the warm-up
    /// requests are done, whatever their outcome.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub fn login(&self, credentials: &Credentials) -> Result<(), BalanceError> {
        let view_state = self.fetch_view_state()?;

        let form = [
            (LOGIN_FORM, LOGIN_FORM),
            (USERNAME_FIELD, credentials.username.as_str()),
            (PASSWORD_FIELD, credentials.password.as_str()),
            (SUBMIT_FIELD, SUBMIT_VALUE),
            (VIEW_STATE_FIELD, view_state.as_str()),
        ];

        let response = self
            .session
            .post_form(&self.endpoints.login, &form, Some(&self.endpoints.login))
            .attach_printable("Login request failed")?;

        if let Some(failure) = classify_login_response(&response) {
            event!(Level::DEBUG, final_url = %response.url, ?failure, "Login rejected");
            bail!(BalanceError::AuthenticationError(failure));
        }

        self.warm_up();
        event!(Level::INFO, "Logged in to the portal");
        Ok(())
    }

    fn fetch_view_state(&self) -> Result<String, BalanceError> {
        let response = self
            .session
            .get(&self.endpoints.login, None)
            .attach_printable("Unable to load login form")?;

        extract_view_state(&response.body)
            .ok_or_else(|| {
                error_stack::Report::new(BalanceError::MalformedPayload(format!(
                    "missing {} token on login page",
                    VIEW_STATE_FIELD
                )))
            })
            .attach_printable_lazy(|| format!("URL: {}", response.url))
    }

    /// Visits the dashboard and index pages so the portal sets up the state
    /// the finance page relies on. Failures are logged and ignored.
    fn warm_up(&self) {
        for url in [&self.endpoints.dashboard, &self.endpoints.index] {
            match self.session.get(url, None) {
                Ok(response) => {
                    event!(Level::DEBUG, url = %url, status = response.status, "Warmup GET succeeded");
                }
                Err(report) => {
                    event!(Level::DEBUG, url = %url, error = %report, "Warmup GET failed");
                }
            }
        }
    }
}

/// Value of the hidden view-state input, if present and non-empty.
pub fn extract_view_state(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&VIEW_STATE_INPUT)
        .next()
        .and_then(|input| input.value().attr("value"))
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// A login attempt failed when the portal keeps us on the login page, shows
/// the login form again, or redirects to its verification step.
pub fn classify_login_response(response: &PortalResponse) -> Option<AuthenticationFailure> {
    let url = response.url.as_str().to_lowercase();

    if url.contains(VERIFICATION_MARKER) {
        return Some(AuthenticationFailure::VerificationRequired);
    }
    if url.contains(LOGIN_PATH_MARKER) || response.body.contains(USERNAME_FIELD) {
        return Some(AuthenticationFailure::CredentialsRejected);
    }
    None
}
