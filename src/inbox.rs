use crate::action;
use crate::config::{Options, Relay};
use crate::email::InboundMessage;
use crate::error::TransportError;
use log::{debug, info, warn};
use std::io::{Read, Write};

/// Mailbox access: hand over everything waiting and remove it from the
/// server, in one session.
pub trait Inbox {
    fn take_all(&mut self, relay: &Relay) -> Result<Vec<Vec<u8>>, TransportError>;
}

pub fn login(relay: &Relay) -> Result<imap::Session<impl Read + Write>, TransportError> {
    let client = imap::ClientBuilder::new(&relay.imap_host, relay.imap_port).native_tls()?;

    let session = client
        .login(&relay.email, &relay.password)
        .map_err(|e| e.0)?;

    Ok(session)
}

/// IMAP over TLS. Messages are flagged `\Deleted` and expunged once fetched,
/// whether or not they turn out to be useful. Only what was fetched is
/// deleted: mail landing mid-session waits for the next cycle.
pub struct ImapInbox;

/// The messages that were there when the mailbox was selected.
fn present(exists: u32) -> String {
    format!("1:{}", exists)
}

fn uid_set(uids: &[u32]) -> String {
    uids.iter()
        .map(|uid| uid.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl Inbox for ImapInbox {
    fn take_all(&mut self, relay: &Relay) -> Result<Vec<Vec<u8>>, TransportError> {
        let mut session = login(relay)?;
        let mailbox = session.select("INBOX")?;

        let mut raw = Vec::new();
        if mailbox.exists > 0 {
            let mut uids = Vec::new();
            let fetches = session.fetch(present(mailbox.exists), "(UID RFC822)")?;
            for fetch in fetches.iter() {
                match (fetch.body(), fetch.uid) {
                    (Some(body), Some(uid)) => {
                        raw.push(body.to_vec());
                        uids.push(uid);
                    }
                    (Some(body), None) => {
                        warn!("Server sent message {} without a UID, leaving it", fetch.message);
                        raw.push(body.to_vec());
                    }
                    (None, _) => warn!("Server sent message {} without a body", fetch.message),
                }
            }

            if !uids.is_empty() {
                session.uid_store(uid_set(&uids), "+FLAGS (\\Deleted)")?;
                session.expunge()?;
            }
        }

        session.logout()?;
        Ok(raw)
    }
}

/// Empties the mailbox and carries out any commands sent from `phone`.
/// Returns how many commands were applied.
pub fn drain<I: Inbox>(inbox: &mut I, relay: &Relay, phone: &str, options: &mut Options) -> usize {
    let messages = match inbox.take_all(relay) {
        Ok(messages) => messages,
        Err(e) => {
            warn!("Error occurred checking the mailbox. Perhaps the Internet is down? {}", e);
            return 0;
        }
    };

    let mut applied = 0;
    for raw in messages {
        let message = match InboundMessage::parse(&raw) {
            Ok(message) => message,
            Err(e) => {
                debug!("Discarding unreadable message: {}", e);
                continue;
            }
        };

        if message.sender != phone {
            debug!("Ignoring message from {}", message.sender);
            continue;
        }

        let actions = action::interpret(&message.body);
        if actions.is_empty() {
            info!("Message from phone had no commands in it");
        }
        action::apply(&actions, options);
        applied += actions.len();
    }

    applied
}
