//! HubSpot CRM v3 adapter for the offer gateway.
//!
//! Remote calls:
//! - `GET   /crm/v3/objects/deals/{id}?properties=...&associations=contacts`
//! - `GET   /crm/v3/objects/contacts/{id}?properties=firstname,lastname`
//! - `PATCH /crm/v3/objects/deals/{id}` with `{"properties": {...}}`

use std::time::Duration;

use async_trait::async_trait;
use offerdesk_core::config::CrmConfig;
use offerdesk_core::domain::deal::{
    decode_processed_flag, is_addressable, property_text, CONTACT_PROPERTIES, DEAL_PROPERTIES,
};
use offerdesk_core::{ContactRecord, CrmError, CrmGateway, DealId, DealPatch, DealRecord};
use reqwest::{Client, Response, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

#[derive(Clone)]
pub struct HubspotGateway {
    client: Client,
    base_url: String,
    access_token: SecretString,
}

#[derive(Debug, Deserialize)]
struct ObjectResponse {
    id: String,
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default)]
    associations: Option<Associations>,
}

#[derive(Debug, Deserialize)]
struct Associations {
    #[serde(default)]
    contacts: Option<AssociationPage>,
}

#[derive(Debug, Deserialize)]
struct AssociationPage {
    #[serde(default)]
    results: Vec<AssociationRef>,
}

#[derive(Debug, Deserialize)]
struct AssociationRef {
    id: String,
}

#[derive(Serialize)]
struct UpdateRequest {
    properties: Map<String, Value>,
}

impl HubspotGateway {
    pub fn new(config: &CrmConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    fn object_url(&self, object: &str, id: &str) -> Result<Url, CrmError> {
        if !is_addressable(id) {
            return Err(CrmError::Transport(format!("`{id}` is not a valid {object} id")));
        }
        let mut url = Url::parse(&self.base_url)
            .map_err(|error| CrmError::Transport(format!("invalid crm base url: {error}")))?;
        url.path_segments_mut()
            .map_err(|_| CrmError::Transport("crm base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["crm", "v3", "objects", object, id]);
        Ok(url)
    }

    async fn get_object(
        &self,
        object: &str,
        id: &str,
        query: &[(&str, String)],
    ) -> Result<ObjectResponse, CrmError> {
        let response = self
            .client
            .get(self.object_url(object, id)?)
            .bearer_auth(self.access_token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;

        let payload = read_success(object, response).await?;
        serde_json::from_value(payload).map_err(|error| CrmError::Decode(error.to_string()))
    }
}

#[async_trait]
impl CrmGateway for HubspotGateway {
    async fn fetch_deal(&self, deal_id: &DealId) -> Result<DealRecord, CrmError> {
        let query = [
            ("properties", DEAL_PROPERTIES.join(",")),
            ("associations", "contacts".to_string()),
        ];
        let deal = self.get_object("deals", deal_id.as_str(), &query).await?;
        Ok(decode_deal(deal))
    }

    async fn fetch_contact(&self, contact_id: &str) -> Result<ContactRecord, CrmError> {
        let query = [("properties", CONTACT_PROPERTIES.join(","))];
        let contact = self.get_object("contacts", contact_id, &query).await?;
        Ok(ContactRecord {
            firstname: property_text(contact.properties.get("firstname")),
            lastname: property_text(contact.properties.get("lastname")),
        })
    }

    async fn update_deal(&self, deal_id: &DealId, patch: &DealPatch) -> Result<(), CrmError> {
        let response = self
            .client
            .patch(self.object_url("deals", deal_id.as_str())?)
            .bearer_auth(self.access_token.expose_secret())
            .json(&UpdateRequest { properties: patch.to_properties() })
            .send()
            .await
            .map_err(transport_error)?;

        read_success("deals", response).await.map(|_| ())
    }
}

fn decode_deal(deal: ObjectResponse) -> DealRecord {
    let properties = &deal.properties;
    let contact_id = deal
        .associations
        .and_then(|associations| associations.contacts)
        .and_then(|page| page.results.into_iter().next())
        .map(|association| association.id);

    DealRecord {
        id: DealId(deal.id),
        amount: property_text(properties.get("amount")),
        periods: property_text(properties.get("periodos")),
        payment: property_text(properties.get("pago_por_periodo")),
        weekly_rate: property_text(properties.get("tasa_de_interes_semanal")),
        deal_name: property_text(properties.get("dealname")),
        already_processed: decode_processed_flag(properties.get("ajuste_pantalla")),
        contact_id,
    }
}

fn transport_error(error: reqwest::Error) -> CrmError {
    CrmError::Transport(error.to_string())
}

/// Returns the JSON body of a 2xx response, or the remote error payload.
async fn read_success(object: &str, response: Response) -> Result<Value, CrmError> {
    let status = response.status();
    let text = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        warn!(
            event_name = "crm.request.rejected",
            object,
            status = status.as_u16(),
            "hubspot rejected the request"
        );
        return Err(CrmError::Status { status: status.as_u16(), body });
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|error| CrmError::Decode(error.to_string()))
}
