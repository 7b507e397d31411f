use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::deal::{ContactRecord, DealId, DealRecord};
use crate::domain::patch::DealPatch;
use crate::errors::CrmError;

/// Remote CRM object store holding deals and contacts.
#[async_trait]
pub trait CrmGateway: Send + Sync {
    /// Reads a deal with the offer property projection and its first
    /// associated contact id.
    async fn fetch_deal(&self, deal_id: &DealId) -> Result<DealRecord, CrmError>;

    async fn fetch_contact(&self, contact_id: &str) -> Result<ContactRecord, CrmError>;

    /// Applies a partial update. Properties absent from `patch` must be left
    /// untouched.
    async fn update_deal(&self, deal_id: &DealId, patch: &DealPatch) -> Result<(), CrmError>;
}

/// Gateway backed by in-process maps. Records every update it receives.
#[derive(Default)]
pub struct InMemoryCrmGateway {
    deals: RwLock<HashMap<String, DealRecord>>,
    contacts: RwLock<HashMap<String, ContactRecord>>,
    updates: RwLock<Vec<(DealId, DealPatch)>>,
    failure: RwLock<Option<CrmError>>,
    calls: RwLock<Vec<String>>,
}

impl InMemoryCrmGateway {
    pub async fn insert_deal(&self, deal: DealRecord) {
        self.deals.write().await.insert(deal.id.0.clone(), deal);
    }

    pub async fn insert_contact(&self, contact_id: impl Into<String>, contact: ContactRecord) {
        self.contacts.write().await.insert(contact_id.into(), contact);
    }

    /// Makes every subsequent call fail with `error`.
    pub async fn fail_with(&self, error: CrmError) {
        *self.failure.write().await = Some(error);
    }

    pub async fn updates(&self) -> Vec<(DealId, DealPatch)> {
        self.updates.read().await.clone()
    }

    /// Names of the remote operations invoked so far, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    async fn record_call(&self, name: &str) -> Result<(), CrmError> {
        self.calls.write().await.push(name.to_string());
        match self.failure.read().await.as_ref() {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

fn not_found(object: &str, id: &str) -> CrmError {
    CrmError::Status {
        status: 404,
        body: serde_json::json!({
            "status": "error",
            "category": "OBJECT_NOT_FOUND",
            "message": format!("{object} {id} not found"),
        }),
    }
}

#[async_trait]
impl CrmGateway for InMemoryCrmGateway {
    async fn fetch_deal(&self, deal_id: &DealId) -> Result<DealRecord, CrmError> {
        self.record_call("fetch_deal").await?;
        self.deals
            .read()
            .await
            .get(deal_id.as_str())
            .cloned()
            .ok_or_else(|| not_found("deal", deal_id.as_str()))
    }

    async fn fetch_contact(&self, contact_id: &str) -> Result<ContactRecord, CrmError> {
        self.record_call("fetch_contact").await?;
        self.contacts
            .read()
            .await
            .get(contact_id)
            .cloned()
            .ok_or_else(|| not_found("contact", contact_id))
    }

    async fn update_deal(&self, deal_id: &DealId, patch: &DealPatch) -> Result<(), CrmError> {
        self.record_call("update_deal").await?;
        self.updates.write().await.push((deal_id.clone(), patch.clone()));
        Ok(())
    }
}
