//! Offer read and decision operations.
//!
//! Every operation is a stateless transformation keyed by deal id; the CRM
//! is the only state holder. Decisions are not ordered against each other:
//! any of them may be recorded at any time and simply overwrite the touched
//! properties.

pub mod commands;

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::CrmConfig;
use crate::crm::CrmGateway;
use crate::domain::deal::DealId;
use crate::domain::offer::OfferSummary;
use crate::domain::patch::{DealPatch, DEAL_STAGE, ORIGIN_TAG, PROCESSED_FLAG};
use crate::errors::{OfferError, OfferOperation};

pub use commands::{AcceptOffer, AdjustOffer, RejectOffer};

/// CRM-side constants applied to offer decisions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OfferPolicy {
    /// Pipeline stage recorded on accept and adjust.
    pub decision_stage: String,
    /// Destination property for the customer's requested periods.
    pub requested_periods_property: String,
}

impl From<&CrmConfig> for OfferPolicy {
    fn from(config: &CrmConfig) -> Self {
        Self {
            decision_stage: config.decision_stage.clone(),
            requested_periods_property: config.requested_periods_property.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OfferAck {
    pub success: bool,
    pub message: &'static str,
}

impl OfferAck {
    fn ok(message: &'static str) -> Self {
        Self { success: true, message }
    }
}

#[derive(Clone)]
pub struct OfferService {
    gateway: Arc<dyn CrmGateway>,
    policy: OfferPolicy,
}

impl OfferService {
    pub fn new(gateway: Arc<dyn CrmGateway>, policy: OfferPolicy) -> Self {
        Self { gateway, policy }
    }

    pub fn policy(&self) -> &OfferPolicy {
        &self.policy
    }

    /// Fetches the deal and, when one is associated, its first contact.
    pub async fn read_offer(&self, deal_id: &DealId) -> Result<OfferSummary, OfferError> {
        let upstream = OfferError::upstream;
        let deal = self.gateway.fetch_deal(deal_id).await.map_err(upstream(OfferOperation::Read))?;

        let contact = match deal.contact_id.as_deref() {
            Some(contact_id) => Some(
                self.gateway
                    .fetch_contact(contact_id)
                    .await
                    .map_err(upstream(OfferOperation::Read))?,
            ),
            None => None,
        };

        Ok(OfferSummary::from_records(&deal, contact.as_ref()))
    }

    pub fn accept_patch(&self, command: &AcceptOffer) -> DealPatch {
        let mut patch = DealPatch::new();
        patch.set(DEAL_STAGE, self.policy.decision_stage.as_str());
        mark_decision(&mut patch, command.mark_processed, command.origin.as_deref());
        patch
    }

    pub fn adjust_patch(&self, command: &AdjustOffer) -> DealPatch {
        let mut patch = DealPatch::new();
        patch
            .set(DEAL_STAGE, self.policy.decision_stage.as_str())
            .apply("nuevo_monto_solicitado", command.requested_amount.as_ref())
            .apply(&self.policy.requested_periods_property, command.requested_periods.as_ref())
            .apply("amount", command.approved_amount.as_ref())
            .apply("periodos", command.final_periods.as_ref())
            .apply("pago_por_periodo", command.final_payment.as_ref());
        mark_decision(&mut patch, command.mark_processed, command.origin.as_deref());
        patch
    }

    /// Rejections only tag the origin so the offer stays revisitable.
    pub fn reject_patch(&self, command: &RejectOffer) -> DealPatch {
        let mut patch = DealPatch::new();
        mark_decision(&mut patch, false, command.origin.as_deref());
        patch
    }

    pub async fn accept_offer(&self, command: &AcceptOffer) -> Result<OfferAck, OfferError> {
        let patch = self.accept_patch(command);
        self.submit(OfferOperation::Accept, &command.deal_id, &patch).await?;
        Ok(OfferAck::ok("Oferta aceptada"))
    }

    pub async fn adjust_offer(&self, command: &AdjustOffer) -> Result<OfferAck, OfferError> {
        let patch = self.adjust_patch(command);
        self.submit(OfferOperation::Adjust, &command.deal_id, &patch).await?;
        Ok(OfferAck::ok("Oferta ajustada correctamente"))
    }

    pub async fn reject_offer(&self, command: &RejectOffer) -> Result<OfferAck, OfferError> {
        let patch = self.reject_patch(command);
        self.submit(OfferOperation::Reject, &command.deal_id, &patch).await?;
        Ok(OfferAck::ok("Oferta rechazada"))
    }

    async fn submit(
        &self,
        operation: OfferOperation,
        deal_id: &DealId,
        patch: &DealPatch,
    ) -> Result<(), OfferError> {
        debug!(
            event_name = "offer.patch.submitted",
            operation = operation.as_str(),
            deal_id = %deal_id,
            properties = ?patch.property_names().collect::<Vec<_>>(),
            "submitting deal update"
        );
        self.gateway.update_deal(deal_id, patch).await.map_err(OfferError::upstream(operation))
    }
}

/// The processed flag is only ever set here, never cleared.
fn mark_decision(patch: &mut DealPatch, mark_processed: bool, origin: Option<&str>) {
    if mark_processed {
        patch.set(PROCESSED_FLAG, "true");
    }
    if let Some(origin) = origin {
        patch.set(ORIGIN_TAG, origin);
    }
}
