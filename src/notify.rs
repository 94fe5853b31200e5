// src/notify.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

use crate::fetch::{
    types::{Envelope, MessageRequest},
    TokenCache,
};
use crate::report::RunSummary;

const MESSAGES_PATH: &str = "im/v1/messages";
const MESSAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a card goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recipient {
    Chat(String),
    Email(String),
}

impl Recipient {
    fn id_type(&self) -> &str {
        match self {
            Recipient::Chat(_) => "chat_id",
            Recipient::Email(_) => "email",
        }
    }

    fn id(&self) -> &str {
        match self {
            Recipient::Chat(id) | Recipient::Email(id) => id,
        }
    }
}

fn md_line(label: &str, value: impl std::fmt::Display) -> Value {
    json!({
        "tag": "div",
        "text": { "tag": "lark_md", "content": format!("**{}:** {}", label, value) }
    })
}

/// Interactive card summarising a finished run.
pub fn build_card(summary: &RunSummary, finished_at: DateTime<Local>, table_url: Option<&str>) -> Value {
    let mut elements = vec![
        md_line("Import time", finished_at.format("%Y-%m-%d %H:%M:%S")),
        md_line("Coverage dates", &summary.date_range),
        json!({ "tag": "hr" }),
        md_line("Rows in export", summary.total_in_source),
        md_line("Duplicates", summary.duplicate_count),
        md_line("New", summary.new_count),
        json!({ "tag": "hr" }),
        md_line("Inserted", summary.inserted_count),
        md_line("Failed", summary.failed_count),
        md_line("Success rate", format!("{:.1}%", summary.success_rate)),
        md_line("Elapsed", format!("{:.1} s", summary.elapsed_secs)),
    ];
    if let Some(url) = table_url.filter(|u| !u.is_empty()) {
        elements.push(json!({ "tag": "hr" }));
        elements.push(json!({
            "tag": "action",
            "actions": [{
                "tag": "button",
                "text": { "tag": "plain_text", "content": "Open table" },
                "type": "default",
                "url": url
            }]
        }));
    }

    json!({
        "config": { "wide_screen_mode": true },
        "header": {
            "title": { "tag": "plain_text", "content": summary.outcome.headline() },
            "template": "blue"
        },
        "elements": elements
    })
}

#[derive(Debug, Default, Deserialize)]
struct MessageData {
    message_id: Option<String>,
}

/// Posts interactive cards through the messaging api.
pub struct Messenger {
    http: Client,
    auth: Arc<TokenCache>,
    messages_url: Url,
}

impl Messenger {
    pub fn new(http: Client, auth: Arc<TokenCache>, api_base: &Url) -> Result<Self> {
        Ok(Self {
            http,
            auth,
            messages_url: api_base.join(MESSAGES_PATH).context("building messages url")?,
        })
    }

    /// Send `card` to `to`; returns the message id when the api reports one.
    pub async fn send_card(&self, to: &Recipient, card: &Value) -> Result<Option<String>> {
        let token = self.auth.token().await?;
        let body = MessageRequest {
            receive_id: to.id(),
            msg_type: "interactive",
            content: serde_json::to_string(card)?,
        };
        let envelope: Envelope<MessageData> = self
            .http
            .post(self.messages_url.clone())
            .bearer_auth(token)
            .query(&[("receive_id_type", to.id_type())])
            .timeout(MESSAGE_TIMEOUT)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {}", self.messages_url))?
            .error_for_status()?
            .json()
            .await
            .context("decoding message response")?;
        Ok(envelope.into_data()?.message_id)
    }

    /// Deliver to every recipient; failures are logged and skipped.
    /// Returns how many deliveries succeeded.
    pub async fn broadcast(&self, recipients: &[Recipient], card: &Value) -> usize {
        let mut delivered = 0;
        for to in recipients {
            match self.send_card(to, card).await {
                Ok(message_id) => {
                    info!(to = to.id(), kind = to.id_type(), ?message_id, "card sent");
                    delivered += 1;
                }
                Err(e) => warn!(to = to.id(), kind = to.id_type(), error = %format!("{:#}", e), "card not sent"),
            }
        }
        delivered
    }
}
