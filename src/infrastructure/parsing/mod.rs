pub mod amount;
pub mod extractor;
pub mod partial_response;
pub mod settled;

pub use amount::{parse_amount, parse_date};
pub use extractor::extract_balances;
pub use settled::has_no_outstanding_hint;
