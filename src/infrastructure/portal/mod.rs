pub mod authenticator;
pub mod endpoints;
pub mod session;

pub use authenticator::{Authenticator, Credentials};
pub use endpoints::{PortalEndpoints, DEFAULT_BASE_URL};
pub use session::{PortalResponse, PortalSession, DEFAULT_TIMEOUT};
