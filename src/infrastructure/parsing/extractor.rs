//! Turns a finance page (full HTML or a partial-response envelope) into
//! balance line items.
//!
//! HTML is searched by an ordered chain of strategies. Each strategy returns
//! an empty list when it does not recognise the page, and the chain stops at
//! the first strategy that yields anything.

use std::sync::LazyLock;

use error_stack::Result;
use scraper::{ElementRef, Html, Selector};
use tracing::{event, Level};

use super::amount::{parse_amount, parse_date};
use super::partial_response::{is_partial_response, update_fragments};
use crate::domain::{BalanceError, BalanceInfo};

const DUE_DATE_HEADER: &str = "Termin";
const AMOUNT_LABEL_ID_MARKER: &str = "amounttopay";
const AMOUNT_LABEL_CLASSES: [&str; 2] = ["amount-to-pay", "do-zaplaty-label"];
const MIN_INVOICE_CELLS: usize = 4;

static INVOICE_THEAD: LazyLock<Selector> = LazyLock::new(|| selector("thead[id*='fakturaDoZaplaty']"));
static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static THEAD: LazyLock<Selector> = LazyLock::new(|| selector("thead"));
static BODY_ROW: LazyLock<Selector> = LazyLock::new(|| selector("tbody tr"));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("Static selector should parse")
}

type Strategy = fn(&Html) -> Vec<BalanceInfo>;

const HTML_STRATEGIES: [(&str, Strategy); 2] = [
    ("invoice tables", invoice_tables),
    ("amount labels", amount_labels),
];

/// Extracts every recognised line item, in document order.
pub fn extract_balances(payload: &str) -> Vec<BalanceInfo> {
    let mut balances = Vec::new();

    if is_partial_response(payload) {
        match extract_from_partial(payload) {
            Ok(found) => balances = found,
            Err(report) => {
                event!(
                    Level::DEBUG,
                    error = %report,
                    "Partial-response parsing failed, falling back to HTML"
                );
            }
        }
    }

    if balances.is_empty() {
        balances = extract_from_html(payload);
    }

    balances
}

fn extract_from_partial(xml: &str) -> Result<Vec<BalanceInfo>, BalanceError> {
    let balances = update_fragments(xml)?
        .iter()
        .flat_map(|fragment| extract_from_html(fragment))
        .collect();
    Ok(balances)
}

fn extract_from_html(html_payload: &str) -> Vec<BalanceInfo> {
    let document = Html::parse_document(html_payload);

    for (name, strategy) in HTML_STRATEGIES {
        let balances = strategy(&document);
        if !balances.is_empty() {
            event!(Level::TRACE, strategy = name, count = balances.len(), "Extracted balances");
            return balances;
        }
    }

    Vec::new()
}

fn invoice_tables(document: &Html) -> Vec<BalanceInfo> {
    let mut tables = marked_invoice_tables(document);
    if tables.is_empty() {
        tables = document
            .select(&TABLE)
            .filter(|table| {
                first_header(*table)
                    .map(|header| element_text(header).contains(DUE_DATE_HEADER))
                    .unwrap_or(false)
            })
            .collect();
    }

    tables
        .into_iter()
        .filter(|table| match first_header(*table) {
            Some(header) => element_text(header).contains(DUE_DATE_HEADER),
            None => true,
        })
        .flat_map(|table| table.select(&BODY_ROW).filter_map(parse_invoice_row).collect::<Vec<_>>())
        .collect()
}

fn marked_invoice_tables(document: &Html) -> Vec<ElementRef<'_>> {
    let mut tables: Vec<ElementRef<'_>> = Vec::new();
    for thead in document.select(&INVOICE_THEAD) {
        let Some(table) = thead
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|element| element.value().name() == "table")
        else {
            continue;
        };

        if !tables.iter().any(|known| known.id() == table.id()) {
            tables.push(table);
        }
    }
    tables
}

fn first_header(table: ElementRef<'_>) -> Option<ElementRef<'_>> {
    table.select(&THEAD).next()
}

fn parse_invoice_row(row: ElementRef<'_>) -> Option<BalanceInfo> {
    let cells: Vec<String> = row.select(&CELL).map(element_text).collect();
    if cells.len() < MIN_INVOICE_CELLS {
        return None;
    }

    let amount = parse_amount(&cells[3])?;
    let invoice_number = Some(cells[0].clone()).filter(|number| !number.is_empty());

    Some(BalanceInfo {
        amount,
        due_date: parse_date(&cells[2]),
        invoice_number,
        issue_date: parse_date(&cells[1]),
    })
}

fn amount_labels(document: &Html) -> Vec<BalanceInfo> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| is_amount_label(*element))
        .filter_map(|element| parse_amount(&element_text(element)))
        .map(BalanceInfo::new)
        .collect()
}

fn is_amount_label(element: ElementRef<'_>) -> bool {
    let value = element.value();
    let id_matches = value
        .id()
        .map(|id| id.to_lowercase().contains(AMOUNT_LABEL_ID_MARKER))
        .unwrap_or(false);

    id_matches || value.classes().any(|class| AMOUNT_LABEL_CLASSES.contains(&class))
}

/// Text of an element with each text node trimmed and joined by single spaces.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
