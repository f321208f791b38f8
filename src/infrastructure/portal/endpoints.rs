use error_stack::{Result, ResultExt};
use reqwest::Url;

use crate::domain::BalanceError;

pub const DEFAULT_BASE_URL: &str = "https://ebok.gkpge.pl/ebok/";

const LOGIN_PATH: &str = "profil/logowanie.xhtml";
const INDEX_PATH: &str = "index.xhtml";
const FINANCE_PATH: &str = "finanse.xhtml";
// The portal sometimes serves the finance view from a nested path.
const FINANCE_FALLBACK_PATHS: [&str; 1] = ["finanse/finanse.xhtml"];

/// URLs of the eBOK pages the retriever talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalEndpoints {
    pub login: Url,
    pub dashboard: Url,
    pub index: Url,
    /// Primary finance page first, then the fallbacks in the order they are tried.
    pub finance: Vec<Url>,
}

impl PortalEndpoints {
    pub fn from_base(base: &str) -> Result<Self, BalanceError> {
        let mut base = Url::parse(base)
            .change_context_lazy(|| invalid_base(base))
            .attach_printable("Portal base URL must be absolute")?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let join = |path: &str| {
            base.join(path)
                .change_context_lazy(|| invalid_base(base.as_str()))
                .attach_printable_lazy(|| format!("Path: {}", path))
        };

        let finance = std::iter::once(FINANCE_PATH)
            .chain(FINANCE_FALLBACK_PATHS)
            .map(|path| join(path))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            login: join(LOGIN_PATH)?,
            dashboard: base.clone(),
            index: join(INDEX_PATH)?,
            finance,
        })
    }
}

impl Default for PortalEndpoints {
    fn default() -> Self {
        Self::from_base(DEFAULT_BASE_URL).expect("Default portal URL should be valid")
    }
}

fn invalid_base(base: &str) -> BalanceError {
    BalanceError::InvalidArgument(format!("invalid portal base URL: {}", base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let endpoints = PortalEndpoints::default();

        assert_eq!(
            endpoints.login.as_str(),
            "https://ebok.gkpge.pl/ebok/profil/logowanie.xhtml"
        );
        assert_eq!(endpoints.dashboard.as_str(), "https://ebok.gkpge.pl/ebok/");
        assert_eq!(endpoints.index.as_str(), "https://ebok.gkpge.pl/ebok/index.xhtml");
        assert_eq!(
            endpoints
                .finance
                .iter()
                .map(Url::as_str)
                .collect::<Vec<_>>(),
            vec![
                "https://ebok.gkpge.pl/ebok/finanse.xhtml",
                "https://ebok.gkpge.pl/ebok/finanse/finanse.xhtml",
            ]
        );
    }

    #[test]
    fn test_base_without_trailing_slash() {
        let endpoints = PortalEndpoints::from_base("http://127.0.0.1:8080/ebok").unwrap();

        assert_eq!(endpoints.index.as_str(), "http://127.0.0.1:8080/ebok/index.xhtml");
    }

    #[test]
    fn test_relative_base_rejected() {
        let error = PortalEndpoints::from_base("ebok/").unwrap_err();

        assert!(matches!(
            error.current_context(),
            BalanceError::InvalidArgument(_)
        ));
    }
}
