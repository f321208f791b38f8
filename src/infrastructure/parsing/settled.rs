use std::sync::LazyLock;

use regex::Regex;

const NO_OUTSTANDING_HINTS: [&str; 8] = [
    "brak należności",
    "brak zaległości",
    "brak dokumentów do zapłaty",
    "brak faktur do zapłaty",
    "brak rachunków do zapłaty",
    "brak płatności do realizacji",
    "wszystkie płatności zostały uregulowane",
    "nie masz żadnych zaległości",
];

// A balance label followed by a zero amount within 80 non-digit characters.
static ZERO_BALANCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(saldo|do zap(?:ł|l)aty|kwota do zap(?:ł|l)aty)[^0-9]{0,80}(0[,.]00)")
        .expect("Zero balance pattern should compile")
});

/// Looks for evidence that the account genuinely owes nothing.
///
/// Only meaningful once extraction found no line items: without such a signal
/// an empty result more likely means the page layout changed.
pub fn has_no_outstanding_hint(payload: &str) -> bool {
    let simplified = payload.to_lowercase();
    if NO_OUTSTANDING_HINTS
        .iter()
        .any(|hint| simplified.contains(hint))
    {
        return true;
    }

    if !simplified.contains("0,00") && !simplified.contains("0.00") {
        return false;
    }

    ZERO_BALANCE_REGEX.is_match(&simplified)
}
