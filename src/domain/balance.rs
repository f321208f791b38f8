use std::fmt::Display;

use chrono::NaiveDate;
use serde::Serialize;

pub const MONETARY_UNIT: &str = "PLN";

/// Snapshot of the account's financial state at query time.
///
/// `amount == 0.0` means nothing is owed. A confirmed zero balance (see
/// [`BalanceInfo::settled`]) carries no dates and no invoice number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceInfo {
    pub amount: f64,
    pub due_date: Option<NaiveDate>,
    pub invoice_number: Option<String>,
    pub issue_date: Option<NaiveDate>,
}

impl BalanceInfo {
    pub fn new(amount: f64) -> Self {
        Self {
            amount,
            due_date: None,
            invoice_number: None,
            issue_date: None,
        }
    }

    /// Zero balance confirmed by the portal.
    pub fn settled() -> Self {
        Self::new(0.0)
    }

    pub fn is_settled(&self) -> bool {
        self.amount == 0.0
    }

    pub fn rounded_amount(&self) -> f64 {
        (self.amount * 100.0).round() / 100.0
    }
}

impl Display for BalanceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_settled() && self.invoice_number.is_none() {
            return write!(f, "No outstanding balance");
        }

        write!(f, "{:.2} {}", self.rounded_amount(), MONETARY_UNIT)?;
        if let Some(due_date) = self.due_date {
            write!(f, ", due {}", due_date)?;
        }
        if let Some(invoice_number) = &self.invoice_number {
            write!(f, ", invoice {}", invoice_number)?;
        }
        if let Some(issue_date) = self.issue_date {
            write!(f, ", issued {}", issue_date)?;
        }
        Ok(())
    }
}

/// Picks the line item with the largest amount. Ties keep the first item seen.
///
/// Several regular invoices may coexist with one seriously overdue one; the
/// largest amount is the one the customer should look at first.
pub fn select_most_urgent(balances: Vec<BalanceInfo>) -> Option<BalanceInfo> {
    balances
        .into_iter()
        .reduce(|best, item| if item.amount > best.amount { item } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice(number: &str, amount: f64) -> BalanceInfo {
        BalanceInfo {
            invoice_number: Some(number.to_owned()),
            ..BalanceInfo::new(amount)
        }
    }

    #[test]
    fn test_select_most_urgent_picks_largest_amount() {
        let selected = select_most_urgent(vec![
            invoice("FV/1", 120.50),
            invoice("FV/2", 980.00),
            invoice("FV/3", 45.10),
        ])
        .unwrap();

        assert_eq!(selected.invoice_number.as_deref(), Some("FV/2"));
    }

    #[test]
    fn test_select_most_urgent_keeps_first_on_tie() {
        let selected =
            select_most_urgent(vec![invoice("FV/1", 300.0), invoice("FV/2", 300.0)]).unwrap();

        assert_eq!(selected.invoice_number.as_deref(), Some("FV/1"));
    }

    #[test]
    fn test_select_most_urgent_empty() {
        assert_eq!(select_most_urgent(vec![]), None);
    }

    #[test]
    fn test_display_settled() {
        assert_eq!(BalanceInfo::settled().to_string(), "No outstanding balance");
    }

    #[test]
    fn test_display_zero_amount_invoice_keeps_number() {
        let info = invoice("FV/2024/04", 0.0);

        assert_eq!(info.to_string(), "0.00 PLN, invoice FV/2024/04");
    }

    #[test]
    fn test_display_with_details() {
        let info = BalanceInfo {
            amount: 250.0,
            due_date: NaiveDate::from_ymd_opt(2024, 3, 15),
            invoice_number: Some("FV/2024/03".to_owned()),
            issue_date: None,
        };

        assert_eq!(
            info.to_string(),
            "250.00 PLN, due 2024-03-15, invoice FV/2024/03"
        );
    }
}
