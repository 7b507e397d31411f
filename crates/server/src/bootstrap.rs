use std::sync::Arc;

use axum::Router;
use offerdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use offerdesk_core::{OfferPolicy, OfferService};
use thiserror::Error;
use tracing::info;

use crate::health::{self, HealthState};
use crate::hubspot::HubspotGateway;
use crate::offers;

pub struct Application {
    pub config: AppConfig,
    pub offers: OfferService,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("crm http client could not be built: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        deal_id = "unknown",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    config.validate()?;

    let gateway = HubspotGateway::new(&config.crm).map_err(BootstrapError::HttpClient)?;
    let policy = OfferPolicy::from(&config.crm);
    info!(
        event_name = "system.bootstrap.crm_configured",
        correlation_id = "bootstrap",
        deal_id = "unknown",
        base_url = %config.crm.base_url,
        decision_stage = %policy.decision_stage,
        requested_periods_property = %policy.requested_periods_property,
        timeout_secs = config.crm.timeout_secs,
        "hubspot gateway configured"
    );

    Ok(Application { offers: OfferService::new(Arc::new(gateway), policy), config })
}

impl Application {
    /// Offer endpoints plus `/health`.
    pub fn router(&self) -> Router {
        offers::router(self.offers.clone())
            .merge(health::router(HealthState::from_config(&self.config.crm)))
    }
}
