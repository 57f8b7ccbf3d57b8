use reqwest::Client;
use std::fmt::Write;
use serde_json::json;
use tracing::warn;

use crate::config::TelegramConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Warn,
    Error,
    Signup,
}

impl NotifyLevel {
    const fn emoji(self) -> &'static str {
        match self {
            Self::Info => "ℹ️",
            Self::Warn => "⚠️",
            Self::Error => "🚨",
            Self::Signup => "🎉",
        }
    }
}

/// Operator notifications posted to a Telegram chat. Disabled when either the
/// bot token or chat id is missing. Delivery failures are logged and dropped.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl TelegramNotifier {
    #[must_use]
    pub fn new(client: Client, config: &TelegramConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }

    pub async fn notify(&self, level: NotifyLevel, title: &str, details: &[(&str, String)]) {
        let (Some(token), Some(chat_id)) = (&self.bot_token, &self.chat_id) else {
            return;
        };

        let body = json!({
            "chat_id": chat_id,
            "text": format_message(level, title, details),
            "parse_mode": "HTML",
            "disable_notification": level == NotifyLevel::Info,
        });

        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        match self.client.post(&url).json(&body).send().await {
            Ok(response) if !response.status().is_success() => {
                warn!(status = response.status().as_u16(), "Telegram notify rejected");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Telegram notify failed"),
        }
    }

    /// Sends in the background so callers never wait on Telegram.
    pub fn notify_detached(&self, level: NotifyLevel, title: String, details: Vec<(&'static str, String)>) {
        if !self.is_enabled() {
            return;
        }

        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.notify(level, &title, &details).await;
        });
    }
}

fn format_message(level: NotifyLevel, title: &str, details: &[(&str, String)]) -> String {
    let mut text = format!(
        "{} <b>{}</b>",
        level.emoji(),
        html_escape::encode_text(title)
    );

    for (key, value) in details {
        let _ = write!(
            text,
            "\n• <b>{}:</b> {}",
            html_escape::encode_text(key),
            html_escape::encode_text(value)
        );
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message_escapes_html() {
        let text = format_message(
            NotifyLevel::Signup,
            "New signup",
            &[("email", "a<b>@example.com".to_string()), ("plan", "free".to_string())],
        );

        assert_eq!(
            text,
            "🎉 <b>New signup</b>\n• <b>email:</b> a&lt;b&gt;@example.com\n• <b>plan:</b> free"
        );
    }

    #[test]
    fn test_disabled_without_credentials() {
        let notifier = TelegramNotifier::new(Client::new(), &TelegramConfig::default());
        assert!(!notifier.is_enabled());
    }
}
