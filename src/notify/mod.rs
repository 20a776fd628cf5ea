//! Change notifications.
//!
//! A [`Notifier`] fans a changed `(domain, ip)` pair out to every enabled
//! sink. Sink failures are logged and never reach the caller.

mod influx;
mod mail;
mod slack;
mod telegram;

pub use influx::InfluxSink;
pub use mail::MailSink;
pub use slack::SlackSink;
pub use telegram::TelegramSink;

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use handlebars::Handlebars;
use serde_json::json;

/// Receives "record changed" events from the update loops.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notify: Send + Sync {
    /// Report that `domain` now points at `ip`.
    async fn notify(&self, domain: &str, ip: &str);
}

/// A single notification channel.
#[async_trait]
pub trait NotifySink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, domain: &str, ip: &str) -> Result<()>;
}

/// Fan-out over the configured sinks.
#[derive(Default)]
pub struct Notifier {
    sinks: Vec<Box<dyn NotifySink>>,
}

impl Notifier {
    pub fn new(sinks: Vec<Box<dyn NotifySink>>) -> Self {
        Self { sinks }
    }

    /// Build the enabled sinks from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut sinks: Vec<Box<dyn NotifySink>> = Vec::new();
        let notify = &config.notify;

        if notify.telegram.enabled {
            sinks.push(Box::new(TelegramSink::from_config(config)?));
        }
        if notify.slack.enabled {
            sinks.push(Box::new(SlackSink::from_config(config)?));
        }
        if notify.mail.enabled {
            sinks.push(Box::new(MailSink::from_config(&notify.mail)?));
        }
        if notify.influx.enabled {
            sinks.push(Box::new(InfluxSink::from_config(config)?));
        }

        Ok(Self::new(sinks))
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl Notify for Notifier {
    async fn notify(&self, domain: &str, ip: &str) {
        for sink in &self.sinks {
            match sink.send(domain, ip).await {
                Ok(()) => tracing::debug!("Sent {} notification for {}", sink.name(), domain),
                Err(e) => tracing::warn!("Send {} notification with error: {}", sink.name(), e),
            }
        }
    }
}

/// Render a message template; `{{domain}}` and `{{current_ip}}` are available.
pub fn render(template: &str, domain: &str, ip: &str, escape_html: bool) -> Result<String> {
    let mut registry = Handlebars::new();
    if !escape_html {
        registry.register_escape_fn(handlebars::no_escape);
    }
    let rendered = registry.render_template(
        template,
        &json!({
            "domain": domain,
            "current_ip": ip,
        }),
    )?;
    Ok(rendered)
}

/// Check that a template compiles.
pub fn check_template(template: &str) -> Result<()> {
    let mut registry = Handlebars::new();
    registry.register_template_string("check", template)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DdnsError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSink {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl NotifySink for CountingSink {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn send(&self, _domain: &str, _ip: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DdnsError::notify("counting", "boom"))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_stop_others() {
        let calls = Arc::new(AtomicUsize::new(0));
        let notifier = Notifier::new(vec![
            Box::new(CountingSink {
                calls: calls.clone(),
                fail: true,
            }),
            Box::new(CountingSink {
                calls: calls.clone(),
                fail: false,
            }),
        ]);

        notifier.notify("home.example.com", "5.6.7.8").await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_from_config_without_sinks() {
        let notifier = Notifier::from_config(&Config::example()).unwrap();
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_from_config_enabled_sinks() {
        let mut config = Config::example();
        config.notify.telegram.enabled = true;
        config.notify.slack.enabled = true;
        let notifier = Notifier::from_config(&config).unwrap();
        assert_eq!(notifier.len(), 2);
    }

    #[test]
    fn test_render() {
        let text = render(
            "*{{current_ip}}* for {{domain}}",
            "home.example.com",
            "5.6.7.8",
            false,
        )
        .unwrap();
        assert_eq!(text, "*5.6.7.8* for home.example.com");
    }

    #[test]
    fn test_render_escapes_html_when_asked() {
        let text = render("<b>{{domain}}</b>", "a<b", "1.2.3.4", true).unwrap();
        assert_eq!(text, "<b>a&lt;b</b>");
    }

    #[test]
    fn test_check_template() {
        assert!(check_template("{{domain}} {{current_ip}}").is_ok());
        assert!(matches!(
            check_template("{{#if}}"),
            Err(DdnsError::Template(_))
        ));
    }
}
