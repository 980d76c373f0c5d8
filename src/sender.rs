use crate::config::Relay;
use crate::error::{Error, Result, TransportError};
use crate::timeline::TimelineItem;
use chrono::{DateTime, Utc};
use lettre::smtp::authentication::Credentials;
use lettre::smtp::error::Error as SmtpError;
use lettre::smtp::response::{Category, Response};
use lettre::smtp::ConnectionReuseParameters;
use lettre::Transport;
use lettre::{ClientSecurity, ClientTlsParameters, EmailAddress, Envelope, SendableEmail};
use log::{info, warn};
use std::time::Duration;

/// Port where SMTP talks TLS from the first byte instead of via STARTTLS.
const SMTPS_PORT: u16 = 465;

/// One text message, ready to hand to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub from: String,
    pub to: String,
    pub date: DateTime<Utc>,
    pub body: String,
}

impl Notification {
    pub fn for_item(item: &TimelineItem, from: &str, to: &str) -> Notification {
        Notification {
            from: from.to_string(),
            to: to.to_string(),
            date: item.created_at,
            body: format!("{}: {}", item.author, escape_html(&item.text)),
        }
    }

    /// Bare-bones RFC 2822 message. SMS gateways throw away everything but
    /// the body, so there's no subject.
    pub fn render(&self) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nDate: {}\r\n\r\n{}",
            self.from,
            self.to,
            self.date.to_rfc2822(),
            self.body
        )
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// An open, authenticated submission session.
pub trait Outbox {
    /// Transport errors mean the session is gone; delivery errors only
    /// concern this one message.
    fn deliver(&mut self, notification: &Notification) -> Result<()>;

    fn close(&mut self) {}
}

/// Opens submission sessions against the relay.
pub trait MailSubmission {
    type Session: Outbox;

    fn connect(&self, relay: &Relay) -> std::result::Result<Self::Session, TransportError>;
}

pub struct SmtpSubmission {
    timeout: Duration,
}

impl SmtpSubmission {
    pub fn new(timeout: Duration) -> SmtpSubmission {
        SmtpSubmission { timeout }
    }
}

pub struct SmtpSession {
    transport: lettre::SmtpTransport,
}

impl MailSubmission for SmtpSubmission {
    type Session = SmtpSession;

    fn connect(&self, relay: &Relay) -> std::result::Result<SmtpSession, TransportError> {
        let tls = ClientTlsParameters {
            connector: native_tls::TlsConnector::new()?,
            domain: relay.smtp_host.clone(),
        };
        let security = if relay.smtp_port == SMTPS_PORT {
            ClientSecurity::Wrapper(tls)
        } else {
            ClientSecurity::Required(tls)
        };

        let creds = Credentials::new(relay.email.clone(), relay.password.clone());
        let transport = lettre::SmtpClient::new((relay.smtp_host.as_str(), relay.smtp_port), security)?
            .credentials(creds)
            .connection_reuse(ConnectionReuseParameters::ReuseUnlimited)
            .timeout(Some(self.timeout))
            .transport();

        Ok(SmtpSession { transport })
    }
}

impl Outbox for SmtpSession {
    fn deliver(&mut self, notification: &Notification) -> Result<()> {
        let address = |a: &str| {
            EmailAddress::new(a.to_string()).map_err(|e| Error::Delivery(format!("{}: {}", a, e)))
        };
        let envelope = Envelope::new(
            Some(address(&notification.from)?),
            vec![address(&notification.to)?],
        )
        .map_err(|e| Error::Delivery(e.to_string()))?;
        let email = SendableEmail::new(
            envelope,
            format!("{}.{}", notification.date.timestamp_millis(), notification.to),
            notification.render().into_bytes(),
        );

        self.transport.send(email).map(|_| ()).map_err(classify)
    }

    fn close(&mut self) {
        self.transport.close();
    }
}

/// The transport connects and authenticates lazily, inside the first send,
/// so a refused login shows up here as a negative reply. Replies in the
/// connection (x2x) and authentication (x3x) categories end the session;
/// anything else negative only concerns the message.
fn ends_session(response: &Response) -> bool {
    matches!(
        response.code.category,
        Category::Connections | Category::Unspecified3
    )
}

fn classify(e: SmtpError) -> Error {
    let rejected_message = match &e {
        SmtpError::Transient(response) | SmtpError::Permanent(response) => {
            !ends_session(response)
        }
        _ => false,
    };
    if rejected_message {
        Error::Delivery(e.to_string())
    } else {
        TransportError::Smtp(e).into()
    }
}

fn preview(text: &str) -> String {
    text.chars().take(21).collect()
}

/// Sends one text per item, in order, over a single session. Returns how
/// many went through. Nothing here is fatal: a dead session ends the batch,
/// a rejected message is skipped.
pub fn send<S: MailSubmission>(
    submission: &S,
    items: &[TimelineItem],
    relay: &Relay,
    phone: &str,
) -> usize {
    if items.is_empty() {
        return 0;
    }

    info!("Sending received tweets...");
    let mut session = match submission.connect(relay) {
        Ok(session) => session,
        Err(e) => {
            warn!(
                "Error occurred starting smtp. Perhaps account info is incorrect or the Internet is down? {}",
                e
            );
            return 0;
        }
    };

    let mut sent = 0;
    for item in items {
        let notification = Notification::for_item(item, &relay.email, phone);
        match session.deliver(&notification) {
            Ok(()) => {
                sent += 1;
                info!("\tSent: {}: {}...", item.author, preview(&item.text));
            }
            Err(Error::Transport(e)) => {
                warn!("Lost the smtp session, dropping the rest of this batch: {}", e);
                break;
            }
            Err(e) => warn!("Error occurred sending message from {}: {}", item.author, e),
        }
    }
    session.close();

    info!("{} of {} message(s) sent.", sent, items.len());
    sent
}
