//! SMTP e-mail notifications.

use super::{render, NotifySink};
use crate::config::{resolve_env, MailConfig};
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

const SUBJECT: &str = "dnskeeper notification";

/// Port that expects TLS from the first byte; every other port uses STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

const DEFAULT_TEMPLATE: &str = r#"<html>
<body>
<p>Your IP address has changed to <strong>{{current_ip}}</strong>.</p>
<p>Domain <strong>{{domain}}</strong> has been updated.</p>
</body>
</html>"#;

pub struct MailSink {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
    template: String,
}

fn mailbox(addr: &str) -> Result<Mailbox> {
    addr.trim()
        .parse()
        .map_err(|e| DdnsError::Config(format!("mail: invalid address {}: {}", addr, e)))
}

impl MailSink {
    pub fn from_config(mail: &MailConfig) -> Result<Self> {
        let builder = if mail.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&mail.smtp_server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&mail.smtp_server)
        }
        .map_err(|e| DdnsError::Config(format!("mail: {}", e)))?;

        let mailer = builder
            .port(mail.smtp_port)
            .credentials(Credentials::new(
                mail.smtp_username.clone(),
                resolve_env(&mail.smtp_password),
            ))
            .build();

        // Several recipients may be given separated by commas.
        let to = mail
            .send_to
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(mailbox)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            mailer,
            from: mailbox(&mail.smtp_username)?,
            to,
            template: mail
                .msg_template
                .clone()
                .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
        })
    }

    fn build_message(&self, domain: &str, ip: &str) -> Result<Message> {
        let body = render(&self.template, domain, ip, true)?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(SUBJECT)
            .header(ContentType::TEXT_HTML);
        for to in &self.to {
            builder = builder.to(to.clone());
        }

        builder
            .body(body)
            .map_err(|e| DdnsError::notify("mail", e.to_string()))
    }
}

#[async_trait]
impl NotifySink for MailSink {
    fn name(&self) -> &'static str {
        "mail"
    }

    async fn send(&self, domain: &str, ip: &str) -> Result<()> {
        tracing::info!("Sending mail notification for {} to {} recipient(s)", domain, self.to.len());
        let message = self.build_message(domain, ip)?;
        self.mailer
            .send(message)
            .await
            .map_err(|e| DdnsError::notify("mail", e.to_string()))?;
        Ok(())
    }
}
