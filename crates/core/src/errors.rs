use serde_json::Value;
use thiserror::Error;

/// Failure talking to the remote CRM.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CrmError {
    #[error("crm responded with status {status}")]
    Status { status: u16, body: Value },
    #[error("crm request failed: {0}")]
    Transport(String),
    #[error("crm response could not be decoded: {0}")]
    Decode(String),
}

impl CrmError {
    /// Diagnostic payload surfaced to callers: the remote body when the CRM
    /// answered, otherwise the failure message.
    pub fn details(&self) -> Value {
        match self {
            Self::Status { body, .. } => body.clone(),
            Self::Transport(message) | Self::Decode(message) => Value::String(message.clone()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OfferOperation {
    Read,
    Accept,
    Adjust,
    Reject,
}

impl OfferOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Accept => "accept",
            Self::Adjust => "adjust",
            Self::Reject => "reject",
        }
    }

    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Read)
    }
}

impl std::fmt::Display for OfferOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum OfferError {
    #[error("deal_id es requerido")]
    MissingDealId,
    #[error("Método no permitido")]
    MethodNotAllowed,
    #[error("cuerpo JSON inválido: {0}")]
    InvalidBody(String),
    #[error("{operation} offer failed upstream: {source}")]
    Upstream { operation: OfferOperation, source: CrmError },
}

impl OfferError {
    pub fn upstream(operation: OfferOperation) -> impl FnOnce(CrmError) -> Self {
        move |source| Self::Upstream { operation, source }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingDealId | Self::InvalidBody(_) => 400,
            Self::MethodNotAllowed => 405,
            Self::Upstream { .. } => 500,
        }
    }

    /// Message placed in the `error` field of the response body.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingDealId => "deal_id es requerido",
            Self::MethodNotAllowed => "Método no permitido",
            Self::InvalidBody(_) => "cuerpo JSON inválido",
            Self::Upstream { operation, .. } if operation.is_write() => {
                "Error al actualizar HubSpot"
            }
            Self::Upstream { .. } => "Error al obtener datos de HubSpot",
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Upstream { source, .. } => Some(source.details()),
            _ => None,
        }
    }
}
