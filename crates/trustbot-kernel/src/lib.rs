use regex::Regex;
use serde::de::DeserializeOwned;
use thiserror::Error;
use trustbot_contracts::{
    Attachment, AttachmentField, ChatMessage, InstanceAlias, InstanceStatus, SendPayload,
};

pub const NO_INCIDENTS_TEXT: &str = "No incidents reported";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("status api returned HTTP {0}")]
    Http(u16),
    #[error("status api payload parse failed: {0}")]
    Parse(String),
    #[error("status api has no instance {0}")]
    UnknownInstance(String),
    #[error("status api request failed: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status(String),
    Version(String),
    Alias(String),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Status(_) => "status",
            Command::Version(_) => "version",
            Command::Alias(_) => "alias",
        }
    }

    pub fn argument(&self) -> &str {
        match self {
            Command::Status(v) | Command::Version(v) | Command::Alias(v) => v,
        }
    }
}

pub const STATUS_PATTERN: &str = r"(?i)^status ([A-Za-z0-9]+)$";
pub const VERSION_PATTERN: &str = r"(?i)^version ([A-Za-z0-9]+)$";
pub const ALIAS_PATTERN: &str = r"(?i)^alias ([A-Za-z0-9.\-]+)$";

/// Matches addressed chat text against the status, version and alias commands.
pub struct CommandParser {
    mention: Regex,
    status: Regex,
    version: Regex,
    alias: Regex,
}

impl CommandParser {
    pub fn new(bot_name: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            mention: Regex::new(&format!(
                r"(?i)^@?{}(?:[:,]\s*|\s+)",
                regex::escape(bot_name.trim())
            ))?,
            status: Regex::new(STATUS_PATTERN)?,
            version: Regex::new(VERSION_PATTERN)?,
            alias: Regex::new(ALIAS_PATTERN)?,
        })
    }

    pub fn parse(&self, text: &str) -> Option<Command> {
        let text = text.trim();
        let text = match self.mention.find(text) {
            Some(m) => &text[m.end()..],
            None => text,
        };

        let capture = |re: &Regex| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        };
        if let Some(v) = capture(&self.status) {
            return Some(Command::Status(v));
        }
        if let Some(v) = capture(&self.version) {
            return Some(Command::Version(v));
        }
        capture(&self.alias).map(Command::Alias)
    }
}

pub fn normalize_instance(instance: &str) -> String {
    instance.to_uppercase()
}

pub fn status_url(api_base_url: &str, instance: &str) -> String {
    format!(
        "{}/instances/{}/status",
        api_base_url.trim_end_matches('/'),
        normalize_instance(instance)
    )
}

pub fn alias_url(api_base_url: &str, alias: &str) -> String {
    format!(
        "{}/instanceAliases/{alias}",
        api_base_url.trim_end_matches('/')
    )
}

pub fn decode_payload<T: DeserializeOwned>(body: &[u8]) -> Result<T, LookupError> {
    serde_json::from_slice(body).map_err(|e| LookupError::Parse(e.to_string()))
}

/// The payload only counts as the requested instance when its `key` matches
/// the uppercased identifier.
pub fn validate_status(
    requested: &str,
    status: InstanceStatus,
) -> Result<InstanceStatus, LookupError> {
    let expected = normalize_instance(requested);
    match status.key.as_deref() {
        Some(key) if key == expected => Ok(status),
        _ => Err(LookupError::UnknownInstance(expected)),
    }
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub bot_name: String,
    pub status_site_url: String,
    pub healthy_image_url: String,
}

impl RenderConfig {
    fn status_link(&self, key: &str) -> String {
        format!("{}/{key}", self.status_site_url.trim_end_matches('/'))
    }

    fn send(&self, room_id: &str, attachment: Attachment) -> ChatMessage {
        ChatMessage::Send {
            room_id: room_id.to_string(),
            payload: SendPayload {
                attachments: vec![attachment],
                username: self.bot_name.clone(),
                as_user: true,
            },
        }
    }
}

pub fn status_message(status: &InstanceStatus, room_id: &str, cfg: &RenderConfig) -> ChatMessage {
    let key = status.key.as_deref().unwrap_or_default();
    let mut attachment = Attachment {
        title: format!("{key} status"),
        title_link: Some(cfg.status_link(key)),
        ..Attachment::default()
    };
    // Incident details are not enumerated; only the healthy case gets a body.
    if status.incident_count() == 0 {
        attachment.fallback = Some(NO_INCIDENTS_TEXT.to_string());
        attachment.text = Some(NO_INCIDENTS_TEXT.to_string());
        attachment.thumb_url = Some(cfg.healthy_image_url.clone());
    }
    cfg.send(room_id, attachment)
}

pub fn version_message(status: &InstanceStatus, room_id: &str, cfg: &RenderConfig) -> ChatMessage {
    let key = status.key.as_deref().unwrap_or_default();
    cfg.send(
        room_id,
        Attachment {
            title: format!("{key} version information"),
            title_link: Some(cfg.status_link(key)),
            fields: vec![AttachmentField {
                title: "Release Version".to_string(),
                value: status.release_version.clone().unwrap_or_default(),
                short: false,
            }],
            ..Attachment::default()
        },
    )
}

pub fn alias_message(
    alias: &str,
    resolved: &InstanceAlias,
    room_id: &str,
    user_id: &str,
) -> ChatMessage {
    ChatMessage::Reply {
        room_id: room_id.to_string(),
        user_id: user_id.to_string(),
        text: format!("{alias} runs on {}", resolved.instance_key),
    }
}

pub fn unknown_instance_message(identifier: &str, room_id: &str, user_id: &str) -> ChatMessage {
    ChatMessage::Reply {
        room_id: room_id.to_string(),
        user_id: user_id.to_string(),
        text: format!("Unknown instance \"{identifier}\""),
    }
}
