use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const API_VERSION: &str = "1.0.0";
pub const CONTRACT_VERSION: u32 = 1;

/// Upstream `/instances/{INSTANCE}/status` payload.
///
/// Only the fields the bot reads are modeled; the trust API returns many more
/// and they are ignored on decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatus {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub release_version: Option<String>,
    #[serde(
        default,
        rename = "Incidents",
        alias = "incidents",
        skip_serializing_if = "Option::is_none"
    )]
    pub incidents: Option<Vec<Incident>>,
}

impl InstanceStatus {
    pub fn incident_count(&self) -> usize {
        self.incidents.as_ref().map(Vec::len).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Incident(pub Value);

/// Upstream `/instanceAliases/{alias}` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceAlias {
    pub instance_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub alias_type: Option<String>,
}

/// A chat message addressed to the bot, as forwarded by the chat adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandEvent {
    pub v: u32,
    pub event_id: String,
    pub room_id: String,
    pub user_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub v: u32,
    pub event_id: String,
    pub response_id: String,
    pub handled_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatMessage {
    /// Posted to the room as the bot.
    Send {
        room_id: String,
        payload: SendPayload,
    },
    /// Addressed to the invoking user.
    Reply {
        room_id: String,
        user_id: String,
        text: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendPayload {
    pub attachments: Vec<Attachment>,
    pub username: String,
    pub as_user: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<AttachmentField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    pub short: bool,
}
