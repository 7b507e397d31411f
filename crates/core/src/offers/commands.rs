//! Typed offer decisions decoded from request bodies.

use serde_json::{Map, Value};

use crate::domain::deal::DealId;
use crate::domain::patch::PropertyUpdate;
use crate::errors::OfferError;

#[derive(Clone, Debug, PartialEq)]
pub struct AcceptOffer {
    pub deal_id: DealId,
    pub mark_processed: bool,
    pub origin: Option<String>,
}

/// Counter-request and/or finalized terms. `None` means the caller did not
/// send the field; it is then left out of the CRM update.
#[derive(Clone, Debug, PartialEq)]
pub struct AdjustOffer {
    pub deal_id: DealId,
    pub requested_amount: Option<PropertyUpdate>,
    pub requested_periods: Option<PropertyUpdate>,
    pub approved_amount: Option<PropertyUpdate>,
    pub final_periods: Option<PropertyUpdate>,
    pub final_payment: Option<PropertyUpdate>,
    pub mark_processed: bool,
    pub origin: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RejectOffer {
    pub deal_id: DealId,
    pub origin: Option<String>,
}

impl AcceptOffer {
    pub fn from_body(body: &Value) -> Result<Self, OfferError> {
        let fields = object(body)?;
        Ok(Self {
            deal_id: DealId::from_request(fields.get("deal_id"))?,
            mark_processed: decode_flag(fields.get("marcar_procesado")),
            origin: decode_origin(fields.get("utm_source")),
        })
    }
}

impl AdjustOffer {
    pub fn from_body(body: &Value) -> Result<Self, OfferError> {
        let fields = object(body)?;
        let present = |name: &str| fields.get(name).map(PropertyUpdate::from_present);
        Ok(Self {
            deal_id: DealId::from_request(fields.get("deal_id"))?,
            requested_amount: present("nuevo_monto_solicitado"),
            requested_periods: present("plazos_solicitados"),
            approved_amount: present("monto_aprobado"),
            final_periods: present("periodos_finales"),
            final_payment: present("pago_final"),
            mark_processed: decode_flag(fields.get("marcar_procesado")),
            origin: decode_origin(fields.get("utm_source")),
        })
    }
}

impl RejectOffer {
    pub fn from_body(body: &Value) -> Result<Self, OfferError> {
        let fields = object(body)?;
        Ok(Self {
            deal_id: DealId::from_request(fields.get("deal_id"))?,
            origin: decode_origin(fields.get("utm_source")),
        })
    }
}

fn object(body: &Value) -> Result<&Map<String, Value>, OfferError> {
    body.as_object()
        .ok_or_else(|| OfferError::InvalidBody("expected a JSON object".to_string()))
}

/// `marcar_procesado` as a real boolean: `true`, `"true"` in any case, or a
/// non-zero number.
pub fn decode_flag(raw: Option<&Value>) -> bool {
    match raw {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

/// Origin channel tag (`whatsapp`, `email`, ...). Only non-empty strings
/// are kept.
pub fn decode_origin(raw: Option<&Value>) -> Option<String> {
    match raw {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{decode_flag, decode_origin, AcceptOffer, AdjustOffer, RejectOffer};
    use crate::domain::deal::DealId;
    use crate::domain::patch::PropertyUpdate;
    use crate::errors::OfferError;

    #[test]
    fn accept_decodes_flag_and_origin() {
        let command = AcceptOffer::from_body(&json!({
            "deal_id": "777",
            "marcar_procesado": true,
            "utm_source": "whatsapp"
        }))
        .expect("valid accept body");

        assert_eq!(command.deal_id, DealId("777".to_string()));
        assert!(command.mark_processed);
        assert_eq!(command.origin.as_deref(), Some("whatsapp"));
    }

    #[test]
    fn accept_without_deal_id_is_rejected() {
        let error = AcceptOffer::from_body(&json!({"marcar_procesado": true})).expect_err("400");
        assert_eq!(error, OfferError::MissingDealId);
    }

    #[test]
    fn non_object_body_is_invalid() {
        let error = RejectOffer::from_body(&json!(["777"])).expect_err("array body");
        assert!(matches!(error, OfferError::InvalidBody(_)));
    }

    #[test]
    fn adjust_keeps_absent_and_null_fields_apart() {
        let command = AdjustOffer::from_body(&json!({
            "deal_id": "777",
            "monto_aprobado": 12000,
            "pago_final": "1100.50",
            "periodos_finales": null
        }))
        .expect("valid adjust body");

        assert_eq!(command.approved_amount, Some(PropertyUpdate::Set(json!(12000))));
        assert_eq!(command.final_payment, Some(PropertyUpdate::Set(json!("1100.50"))));
        assert_eq!(command.final_periods, Some(PropertyUpdate::Clear));
        assert_eq!(command.requested_amount, None);
        assert_eq!(command.requested_periods, None);
        assert!(!command.mark_processed);
        assert_eq!(command.origin, None);
    }

    #[test]
    fn flag_decoding_is_strict_about_strings() {
        assert!(decode_flag(Some(&json!(true))));
        assert!(decode_flag(Some(&json!("true"))));
        assert!(decode_flag(Some(&json!("TRUE"))));
        assert!(decode_flag(Some(&json!(1))));

        assert!(!decode_flag(Some(&json!("false"))));
        assert!(!decode_flag(Some(&json!("si"))));
        assert!(!decode_flag(Some(&json!(0))));
        assert!(!decode_flag(Some(&json!(null))));
        assert!(!decode_flag(None));
    }

    #[test]
    fn origin_ignores_empty_and_non_string_values() {
        assert_eq!(decode_origin(Some(&json!("email"))), Some("email".to_string()));
        assert_eq!(decode_origin(Some(&json!(""))), None);
        assert_eq!(decode_origin(Some(&json!(42))), None);
        assert_eq!(decode_origin(None), None);
    }
}
