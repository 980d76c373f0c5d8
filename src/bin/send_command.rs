//! Mails a command to the relay the way the phone would, for poking at a
//! running bridge by hand.

use anyhow::{anyhow, Result};
use clap::Parser;
use lettre::Transport;
use lettre_email;
use native_tls;

#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    /// hostname of the SMTP server.
    #[clap(long, default_value = "smtp.gmail.com")]
    hostname: String,

    /// port of the SMTP server. 465 means TLS from the start, anything else STARTTLS.
    #[clap(long, default_value_t = 587)]
    port: u16,

    /// username for SMTP authentication.
    #[clap(long)]
    username: String,

    /// password for SMTP authentication.
    #[clap(long)]
    password: String,

    /// Pretend to be this address (normally the phone's).
    #[clap(long)]
    from: String,

    /// The relay address the bridge reads.
    #[clap(long)]
    to: String,

    /// Accept any certificate. Only for local test servers.
    #[clap(long)]
    insecure: bool,

    /// Command text, e.g. "off", "on", "ignore bob".
    body: Vec<String>,
}

fn tls(insecure: bool) -> Result<native_tls::TlsConnector> {
    Ok(native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(insecure)
        .danger_accept_invalid_hostnames(insecure)
        .build()?)
}

fn smtp(args: &Args) -> Result<lettre::SmtpTransport> {
    let creds = lettre::smtp::authentication::Credentials::new(
        args.username.clone(),
        args.password.clone(),
    );
    let params = lettre::ClientTlsParameters {
        connector: tls(args.insecure)?,
        domain: args.hostname.clone(),
    };
    let security = if args.port == 465 {
        lettre::ClientSecurity::Wrapper(params)
    } else {
        lettre::ClientSecurity::Required(params)
    };

    Ok(lettre::SmtpClient::new((args.hostname.as_str(), args.port), security)?
        .credentials(creds)
        .transport())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut s = smtp(&args)?;

    let e = lettre_email::Email::builder()
        .from(args.from.as_str())
        .to(args.to.as_str())
        .text(args.body.join(" "))
        .build()
        .map_err(|e| anyhow!("Couldn't build the command mail: {:?}", e))?;
    s.send(e.into())?;

    println!("Sent {:?} to {}", args.body.join(" "), args.to);
    Ok(())
}
