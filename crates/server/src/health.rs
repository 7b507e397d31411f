use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use offerdesk_core::config::CrmConfig;
use reqwest::Url;
use secrecy::ExposeSecret;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    crm_host: Option<String>,
    token_configured: bool,
}

impl HealthState {
    pub fn from_config(config: &CrmConfig) -> Self {
        Self {
            crm_host: Url::parse(&config.base_url)
                .ok()
                .and_then(|url| url.host_str().map(str::to_string)),
            token_configured: !config.access_token.expose_secret().trim().is_empty(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub crm: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Readiness of the process and its CRM settings. Makes no remote call.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let crm = crm_check(&state);
    let ready = crm.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "offerdesk-server runtime initialized".to_string(),
        },
        crm,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn crm_check(state: &HealthState) -> HealthCheck {
    match (&state.crm_host, state.token_configured) {
        (Some(host), true) => {
            HealthCheck { status: "ready", detail: format!("hubspot client configured for {host}") }
        }
        (None, _) => {
            HealthCheck { status: "degraded", detail: "crm base url has no host".to_string() }
        }
        (Some(_), false) => {
            HealthCheck { status: "degraded", detail: "crm access token is empty".to_string() }
        }
    }
}
