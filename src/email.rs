use crate::error::ParseError;
use lazy_static::lazy_static;
use mailparse::{MailAddr, MailHeaderMap, ParsedMail};
use regex::Regex;
use std::borrow::Cow;

lazy_static! {
    // Lines made only of spaces/tabs, keeping any trailing \r.
    static ref BLANKISH_LINE: Regex = Regex::new(r"(?m)^[ \t]+(\r?)$").unwrap();
}

/// A command mail, reduced to who sent it and what it says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: String,
    pub body: String,
}

/// Some gateways put stray spaces on the line between headers and body,
/// which hides the body from the parser. Such lines are emptied.
pub fn strip_blank_lines(raw: &str) -> Cow<'_, str> {
    BLANKISH_LINE.replace_all(raw, "$1")
}

impl InboundMessage {
    pub fn parse(raw: &[u8]) -> Result<InboundMessage, ParseError> {
        let text = String::from_utf8_lossy(raw);
        let text = strip_blank_lines(&text);
        let parsed = mailparse::parse_mail(text.as_bytes())?;

        // Must be read before narrowing to the plaintext part, which has
        // no From of its own.
        let sender = first_sender(&parsed)?;
        let body = plaintext(&parsed).get_body()?;

        Ok(InboundMessage { sender, body })
    }
}

fn first_sender(parsed: &ParsedMail) -> Result<String, ParseError> {
    let from = parsed
        .headers
        .get_first_value("From")
        .ok_or(ParseError::NoSender)?;
    let addresses = mailparse::addrparse(&from)?;

    addresses
        .iter()
        .find_map(|address| match address {
            MailAddr::Single(single) => Some(single.addr.clone()),
            MailAddr::Group(group) => group.addrs.first().map(|single| single.addr.clone()),
        })
        .ok_or(ParseError::NoSender)
}

/// The first direct `text/plain` part of a multipart message. Without one,
/// the whole message stands in as the body.
fn plaintext<'a>(parsed: &'a ParsedMail<'a>) -> &'a ParsedMail<'a> {
    if parsed.subparts.is_empty() {
        return parsed;
    }
    parsed
        .subparts
        .iter()
        .find(|part| part.ctype.mimetype == "text/plain")
        .unwrap_or(parsed)
}
