//! Reader for the JSF `<partial-response>` envelope.
//!
//! AJAX requests against the portal come back as XML whose `<update>` nodes
//! carry HTML fragments, usually inside CDATA sections.

use error_stack::{Result, ResultExt};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::domain::BalanceError;

const XML_PROLOG: &str = "<?xml";
const PARTIAL_RESPONSE_TAG: &str = "<partial-response";
const SNIFF_WINDOW_CHARS: usize = 200;
const UPDATE_TAG: &[u8] = b"update";

/// True when the payload looks like a partial-response envelope rather than a
/// plain HTML page.
pub fn is_partial_response(payload: &str) -> bool {
    let snapshot = payload.trim_start();
    if snapshot.starts_with(XML_PROLOG) {
        return true;
    }

    let window_end = snapshot
        .char_indices()
        .nth(SNIFF_WINDOW_CHARS)
        .map(|(index, _)| index)
        .unwrap_or(snapshot.len());
    snapshot[..window_end].contains(PARTIAL_RESPONSE_TAG)
}

/// Returns the text content of every `<update>` node, in document order.
pub fn update_fragments(xml: &str) -> Result<Vec<String>, BalanceError> {
    let mut reader = Reader::from_str(xml.trim_start());
    reader.config_mut().trim_text(false);

    let mut fragments = Vec::new();
    let mut current: Option<String> = None;
    let mut depth_in_update = 0usize;

    loop {
        let event = reader
            .read_event()
            .change_context_lazy(|| malformed("finance response is not valid XML"))
            .attach_printable_lazy(|| format!("Position: {}", reader.buffer_position()))?;

        match event {
            Event::Start(e) => {
                if current.is_some() {
                    depth_in_update += 1;
                } else if e.local_name().as_ref() == UPDATE_TAG {
                    current = Some(String::new());
                    depth_in_update = 0;
                }
            }
            Event::Empty(e) => {
                if current.is_none() && e.local_name().as_ref() == UPDATE_TAG {
                    fragments.push(String::new());
                }
            }
            Event::End(_) => {
                if current.is_some() {
                    if depth_in_update == 0 {
                        fragments.extend(current.take());
                    } else {
                        depth_in_update -= 1;
                    }
                }
            }
            Event::Text(e) => {
                if let Some(fragment) = current.as_mut() {
                    let text = e
                        .unescape()
                        .change_context_lazy(|| malformed("invalid escape in update node"))?;
                    fragment.push_str(&text);
                }
            }
            Event::CData(e) => {
                if let Some(fragment) = current.as_mut() {
                    fragment.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if current.is_some() {
        return Err(error_stack::Report::new(malformed(
            "unterminated update node in finance response",
        )));
    }

    Ok(fragments)
}

fn malformed(reason: &str) -> BalanceError {
    BalanceError::MalformedPayload(reason.to_owned())
}
