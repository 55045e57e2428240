use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use trustbot_config::Config;
use trustbot_contracts::{
    ChatMessage, CommandEvent, CommandResponse, InstanceAlias, InstanceStatus, API_VERSION,
    CONTRACT_VERSION,
};
use trustbot_kernel::{
    alias_message, alias_url, decode_payload, normalize_instance, status_message, status_url,
    unknown_instance_message, validate_status, version_message, Command, CommandParser,
    LookupError, RenderConfig, ALIAS_PATTERN, STATUS_PATTERN, VERSION_PATTERN,
};

pub async fn serve(cfg: Config) -> Result<(), String> {
    let addr: SocketAddr = cfg
        .server
        .listen_addr
        .parse()
        .map_err(|e| format!("invalid listen_addr: {e}"))?;

    if !cfg.announce.channels.is_empty() {
        info!(
            channels = ?cfg.announce.channels,
            "announcement channels configured; incident polling is not enabled"
        );
    }
    let app = build_app(cfg)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("bind failed: {e}"))?;
    info!(%addr, "trustbot listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .map_err(|e| format!("serve failed: {e}"))
}

pub fn build_app(cfg: Config) -> Result<Router, String> {
    let state = AppState::new(cfg)?;
    Ok(Router::new()
        .route("/v1/healthz", get(healthz))
        .route("/v1/commands", post(commands))
        .route("/v1/contracts", get(contracts))
        .with_state(state))
}

/// Client for the trust status API. Each lookup is a single GET with the
/// body buffered in full before it is decoded.
#[derive(Clone)]
pub struct TrustClient {
    api_base_url: String,
    client: Client,
}

impl TrustClient {
    pub fn new(api_base_url: &str, timeout: Option<Duration>) -> Result<Self, String> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            api_base_url: api_base_url.to_string(),
            client: builder.build().map_err(|e| e.to_string())?,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, String> {
        Self::new(
            &cfg.trust.api_base_url,
            cfg.trust.timeout_ms.map(Duration::from_millis),
        )
    }

    pub async fn instance_status(&self, instance: &str) -> Result<InstanceStatus, LookupError> {
        let requested = normalize_instance(instance);
        let status: InstanceStatus = self
            .get_json(&status_url(&self.api_base_url, &requested))
            .await?;
        validate_status(&requested, status)
    }

    /// Returns whatever the alias endpoint decodes to; the resolved key is not
    /// checked against anything.
    pub async fn instance_alias(&self, alias: &str) -> Result<InstanceAlias, LookupError> {
        self.get_json(&alias_url(&self.api_base_url, alias)).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, LookupError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Http(status.as_u16()));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;
        decode_payload(&body)
    }
}

#[derive(Clone)]
struct AppState {
    cfg: Arc<Config>,
    trust: TrustClient,
    parser: Arc<CommandParser>,
    render: Arc<RenderConfig>,
}

impl AppState {
    fn new(cfg: Config) -> Result<Self, String> {
        let parser = CommandParser::new(&cfg.bot.name)
            .map_err(|e| format!("command patterns failed to compile: {e}"))?;
        Ok(Self {
            trust: TrustClient::from_config(&cfg)?,
            parser: Arc::new(parser),
            render: Arc::new(RenderConfig {
                bot_name: cfg.bot.name.clone(),
                status_site_url: cfg.trust.status_site_url.clone(),
                healthy_image_url: cfg.trust.healthy_image_url.clone(),
            }),
            cfg: Arc::new(cfg),
        })
    }

    async fn process_command(&self, event: CommandEvent) -> Result<CommandResponse, String> {
        validate_command_event(&event)?;

        let command = self.parser.parse(&event.text);
        let messages = match &command {
            Some(command) => self.dispatch(command, &event).await,
            None => {
                debug!(event_id = %event.event_id, "text matched no command");
                Vec::new()
            }
        };

        Ok(CommandResponse {
            v: CONTRACT_VERSION,
            event_id: event.event_id,
            response_id: format!("resp_{}", uuid::Uuid::new_v4().as_simple()),
            handled_at: Utc::now().to_rfc3339(),
            command: command.map(|c| c.name().to_string()),
            messages,
        })
    }

    async fn dispatch(&self, command: &Command, event: &CommandEvent) -> Vec<ChatMessage> {
        info!(
            event_id = %event.event_id,
            room_id = %event.room_id,
            command = command.name(),
            argument = command.argument(),
            "dispatching command"
        );

        match command {
            Command::Status(instance) => match self.trust.instance_status(instance).await {
                Ok(status) => vec![status_message(&status, &event.room_id, &self.render)],
                Err(e) => {
                    warn!(instance = %instance, error = %e, "status lookup failed");
                    vec![unknown_instance_message(
                        instance,
                        &event.room_id,
                        &event.user_id,
                    )]
                }
            },
            Command::Version(instance) => match self.trust.instance_status(instance).await {
                Ok(status) => vec![version_message(&status, &event.room_id, &self.render)],
                Err(e) => {
                    warn!(instance = %instance, error = %e, "version lookup failed");
                    vec![unknown_instance_message(
                        instance,
                        &event.room_id,
                        &event.user_id,
                    )]
                }
            },
            Command::Alias(alias) => match self.trust.instance_alias(alias).await {
                Ok(resolved) => vec![alias_message(
                    alias,
                    &resolved,
                    &event.room_id,
                    &event.user_id,
                )],
                Err(e) => {
                    // No reply goes back to the user for alias failures.
                    error!(alias = %alias, error = %e, "alias lookup failed");
                    Vec::new()
                }
            },
        }
    }
}

async fn healthz() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

async fn contracts(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "api_version": API_VERSION,
        "contract_version": CONTRACT_VERSION,
        "commands": [
            {"name": "status", "pattern": STATUS_PATTERN},
            {"name": "version", "pattern": VERSION_PATTERN},
            {"name": "alias", "pattern": ALIAS_PATTERN}
        ],
        "announce": {
            "channels": state.cfg.announce.channels,
            "polling": false
        }
    }))
}

async fn commands(
    State(state): State<AppState>,
    Json(event): Json<CommandEvent>,
) -> Result<Json<CommandResponse>, (StatusCode, Json<Value>)> {
    state.process_command(event).await.map(Json).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"code":"validation_error","message": e}})),
        )
    })
}

fn validate_command_event(e: &CommandEvent) -> Result<(), String> {
    if e.v != CONTRACT_VERSION {
        return Err("v must be 1".to_string());
    }
    if e.event_id.is_empty() || e.room_id.is_empty() || e.user_id.is_empty() {
        return Err("event_id, room_id, user_id are required".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(v: u32, user_id: &str) -> CommandEvent {
        CommandEvent {
            v,
            event_id: "evt-1".to_string(),
            room_id: "room-1".to_string(),
            user_id: user_id.to_string(),
            text: "status na1".to_string(),
        }
    }

    #[test]
    fn validate_command_event_rejects_wrong_version() {
        assert!(validate_command_event(&event(2, "u")).is_err());
    }

    #[test]
    fn validate_command_event_requires_user() {
        assert!(validate_command_event(&event(CONTRACT_VERSION, "")).is_err());
        assert!(validate_command_event(&event(CONTRACT_VERSION, "u")).is_ok());
    }
}
