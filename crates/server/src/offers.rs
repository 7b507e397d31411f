//! Offer endpoints.
//!
//! - `GET  /getDealData`, `/read-offer`        : offer summary for `?deal_id=`
//! - `POST /aceptarOferta`, `/accept-offer`    : accept the offer as-is
//! - `POST /ajustarOferta`, `/adjust-offer`    : counter-request / final terms
//! - `POST /rechazarOferta`, `/reject-offer`   : decline, tagging the origin
//!
//! Every path answers `OPTIONS` with 204 and rejects other methods with 405.
//! All responses carry the same permissive CORS headers.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        HeaderName, HeaderValue, Method, StatusCode,
    },
    response::IntoResponse,
    routing::{get, post, MethodRouter},
    Json, Router,
};
use offerdesk_core::{
    AcceptOffer, AdjustOffer, DealId, OfferAck, OfferError, OfferOperation, OfferService,
    OfferSummary, RejectOffer,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

#[derive(Clone)]
pub struct OfferState {
    service: OfferService,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct OfferErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

type ErrorReply = (StatusCode, Json<OfferErrorBody>);

pub fn router(service: OfferService) -> Router {
    let read = get(read_offer).options(preflight).fallback(method_not_allowed);
    let accept = decision(post(accept_offer));
    let adjust = decision(post(adjust_offer));
    let reject = decision(post(reject_offer));

    let mut router = Router::new()
        .route("/getDealData", read.clone())
        .route("/read-offer", read)
        .route("/aceptarOferta", accept.clone())
        .route("/accept-offer", accept)
        .route("/ajustarOferta", adjust.clone())
        .route("/adjust-offer", adjust)
        .route("/rechazarOferta", reject.clone())
        .route("/reject-offer", reject);
    for (name, value) in cors_headers() {
        router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
    }
    router.with_state(OfferState { service })
}

fn decision(route: MethodRouter<OfferState>) -> MethodRouter<OfferState> {
    route.options(preflight).fallback(method_not_allowed)
}

pub fn cors_headers() -> [(HeaderName, HeaderValue); 3] {
    [
        (ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
        (ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS)),
        (ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type")),
    ]
}

/// Plain and browser preflight `OPTIONS` requests alike.
async fn preflight() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, cors_headers())
}

async fn method_not_allowed(method: Method) -> ErrorReply {
    warn!(event_name = "offer.request.method_rejected", method = %method, "method not allowed");
    error_reply(OfferError::MethodNotAllowed)
}

pub async fn read_offer(
    State(state): State<OfferState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<OfferSummary>, ErrorReply> {
    let correlation_id = Uuid::new_v4().to_string();
    let requested =
        params.iter().find(|(name, _)| name == "deal_id").map(|(_, value)| value.as_str());
    let deal_id = DealId::from_query(requested)
        .map_err(|error| reject(OfferOperation::Read, &correlation_id, None, error))?;

    let summary = state
        .service
        .read_offer(&deal_id)
        .await
        .map_err(|error| reject(OfferOperation::Read, &correlation_id, Some(&deal_id), error))?;

    info!(
        event_name = "offer.read.completed",
        correlation_id = %correlation_id,
        deal_id = %deal_id,
        already_processed = summary.already_processed,
        "offer summary served"
    );
    Ok(Json(summary))
}

pub async fn accept_offer(
    State(state): State<OfferState>,
    body: Bytes,
) -> Result<Json<OfferAck>, ErrorReply> {
    let correlation_id = Uuid::new_v4().to_string();
    let command = parse_body(&body)
        .and_then(|body| AcceptOffer::from_body(&body))
        .map_err(|error| reject(OfferOperation::Accept, &correlation_id, None, error))?;

    let ack = state.service.accept_offer(&command).await.map_err(|error| {
        reject(OfferOperation::Accept, &correlation_id, Some(&command.deal_id), error)
    })?;

    info!(
        event_name = "offer.accept.recorded",
        correlation_id = %correlation_id,
        deal_id = %command.deal_id,
        mark_processed = command.mark_processed,
        origin = command.origin.as_deref().unwrap_or("unknown"),
        "offer accepted"
    );
    Ok(Json(ack))
}

pub async fn adjust_offer(
    State(state): State<OfferState>,
    body: Bytes,
) -> Result<Json<OfferAck>, ErrorReply> {
    let correlation_id = Uuid::new_v4().to_string();
    let command = parse_body(&body)
        .and_then(|body| AdjustOffer::from_body(&body))
        .map_err(|error| reject(OfferOperation::Adjust, &correlation_id, None, error))?;

    let ack = state.service.adjust_offer(&command).await.map_err(|error| {
        reject(OfferOperation::Adjust, &correlation_id, Some(&command.deal_id), error)
    })?;

    info!(
        event_name = "offer.adjust.recorded",
        correlation_id = %correlation_id,
        deal_id = %command.deal_id,
        mark_processed = command.mark_processed,
        origin = command.origin.as_deref().unwrap_or("unknown"),
        "offer adjusted"
    );
    Ok(Json(ack))
}

pub async fn reject_offer(
    State(state): State<OfferState>,
    body: Bytes,
) -> Result<Json<OfferAck>, ErrorReply> {
    let correlation_id = Uuid::new_v4().to_string();
    let command = parse_body(&body)
        .and_then(|body| RejectOffer::from_body(&body))
        .map_err(|error| reject(OfferOperation::Reject, &correlation_id, None, error))?;

    let ack = state.service.reject_offer(&command).await.map_err(|error| {
        reject(OfferOperation::Reject, &correlation_id, Some(&command.deal_id), error)
    })?;

    info!(
        event_name = "offer.reject.recorded",
        correlation_id = %correlation_id,
        deal_id = %command.deal_id,
        origin = command.origin.as_deref().unwrap_or("unknown"),
        "offer rejected"
    );
    Ok(Json(ack))
}

/// An empty body reads as `{}` so a missing `deal_id` still surfaces as 400.
fn parse_body(body: &[u8]) -> Result<Value, OfferError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(|error| OfferError::InvalidBody(error.to_string()))
}

fn reject(
    operation: OfferOperation,
    correlation_id: &str,
    deal_id: Option<&DealId>,
    error: OfferError,
) -> ErrorReply {
    let deal_id = deal_id.map(DealId::as_str).unwrap_or("unknown");
    match &error {
        OfferError::Upstream { source, .. } => error!(
            event_name = "offer.upstream.failed",
            correlation_id,
            deal_id,
            operation = operation.as_str(),
            error = %source,
            details = %source.details(),
            "crm call failed"
        ),
        other => warn!(
            event_name = "offer.request.invalid",
            correlation_id,
            deal_id,
            operation = operation.as_str(),
            error = %other,
            "offer request rejected"
        ),
    }
    error_reply(error)
}

fn error_reply(error: OfferError) -> ErrorReply {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(OfferErrorBody { error: error.user_message(), details: error.details() }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
        Router,
    };
    use offerdesk_core::{
        ContactRecord, CrmError, DealId, DealRecord, InMemoryCrmGateway, OfferPolicy,
        OfferService,
    };
    use offerdesk_core::config::AppConfig;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::router;

    fn app() -> (Arc<InMemoryCrmGateway>, Router) {
        let gateway = Arc::new(InMemoryCrmGateway::default());
        let policy = OfferPolicy::from(&AppConfig::default().crm);
        let service = OfferService::new(gateway.clone(), policy);
        (gateway, router(service))
    }

    async fn send(app: Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, payload)
    }

    async fn seed_deal(gateway: &InMemoryCrmGateway) {
        gateway
            .insert_deal(DealRecord {
                id: DealId("555".to_string()),
                amount: Some("20000".to_string()),
                periods: Some("16".to_string()),
                payment: Some("1480.25".to_string()),
                weekly_rate: Some("3".to_string()),
                deal_name: Some("Préstamo 555".to_string()),
                already_processed: false,
                contact_id: Some("91".to_string()),
            })
            .await;
        gateway
            .insert_contact(
                "91",
                ContactRecord {
                    firstname: Some("Luis".to_string()),
                    lastname: Some("Pardo".to_string()),
                },
            )
            .await;
    }

    #[tokio::test]
    async fn read_offer_returns_normalized_summary() {
        let (gateway, app) = app();
        seed_deal(&gateway).await;

        let (status, payload) = send(app, Method::GET, "/getDealData?deal_id=555", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            payload,
            json!({
                "nombre": "Luis Pardo",
                "monto": 20000.0,
                "periodos": 16,
                "pago": 1480.25,
                "tasa": 0.03,
                "dealName": "Préstamo 555",
                "yaProcesado": false
            })
        );
    }

    #[tokio::test]
    async fn read_offer_alias_requires_deal_id() {
        let (gateway, app) = app();

        let (status, payload) = send(app, Method::GET, "/read-offer", "").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload, json!({"error": "deal_id es requerido"}));
        assert!(gateway.calls().await.is_empty());
    }

    #[tokio::test]
    async fn read_offer_uses_first_deal_id_when_repeated() {
        let (gateway, app) = app();
        seed_deal(&gateway).await;

        let (status, payload) =
            send(app, Method::GET, "/getDealData?deal_id=555&deal_id=2", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["dealName"], json!("Préstamo 555"));
    }

    #[tokio::test]
    async fn dot_segment_deal_id_is_rejected_before_any_crm_call() {
        let (gateway, app) = app();

        let (status, payload) = send(app, Method::GET, "/getDealData?deal_id=..", "").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload, json!({"error": "deal_id es requerido"}));
        assert!(gateway.calls().await.is_empty());
    }

    #[tokio::test]
    async fn decisions_without_deal_id_make_no_crm_call() {
        for uri in ["/aceptarOferta", "/accept-offer", "/ajustarOferta", "/adjust-offer"] {
            let (gateway, app) = app();

            let body = r#"{"marcar_procesado":true,"monto_aprobado":18000}"#;
            let (status, payload) = send(app, Method::POST, uri, body).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(payload, json!({"error": "deal_id es requerido"}), "{uri}");
            assert!(gateway.calls().await.is_empty(), "{uri}");
            assert!(gateway.updates().await.is_empty(), "{uri}");
        }
    }

    #[tokio::test]
    async fn read_offer_surfaces_crm_failure_details() {
        let (gateway, app) = app();
        gateway
            .fail_with(CrmError::Status { status: 401, body: json!({"category": "INVALID_AUTHENTICATION"}) })
            .await;

        let (status, payload) = send(app, Method::GET, "/getDealData?deal_id=555", "").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            payload,
            json!({
                "error": "Error al obtener datos de HubSpot",
                "details": {"category": "INVALID_AUTHENTICATION"}
            })
        );
    }

    #[tokio::test]
    async fn accept_offer_moves_stage_and_marks_processed() {
        let (gateway, app) = app();

        let body = r#"{"deal_id":"555","marcar_procesado":true,"utm_source":"whatsapp"}"#;
        let (status, payload) = send(app, Method::POST, "/aceptarOferta", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload, json!({"success": true, "message": "Oferta aceptada"}));

        let updates = gateway.updates().await;
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, DealId("555".to_string()));
        assert_eq!(
            Value::Object(updates[0].1.to_properties()),
            json!({"dealstage": "34528397", "ajuste_pantalla": "true", "utm_source": "whatsapp"})
        );
    }

    #[tokio::test]
    async fn adjust_offer_alias_forwards_only_sent_fields() {
        let (gateway, app) = app();

        let body = r#"{"deal_id":555,"monto_aprobado":18000,"pago_final":null}"#;
        let (status, payload) = send(app, Method::POST, "/adjust-offer", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload, json!({"success": true, "message": "Oferta ajustada correctamente"}));

        let updates = gateway.updates().await;
        assert_eq!(
            Value::Object(updates[0].1.to_properties()),
            json!({"dealstage": "34528397", "amount": 18000, "pago_por_periodo": null})
        );
    }

    #[tokio::test]
    async fn reject_offer_only_tags_origin() {
        let (gateway, app) = app();

        let body = r#"{"deal_id":"555","utm_source":"email","marcar_procesado":true}"#;
        let (status, payload) = send(app, Method::POST, "/rechazarOferta", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload, json!({"success": true, "message": "Oferta rechazada"}));
        let updates = gateway.updates().await;
        assert_eq!(Value::Object(updates[0].1.to_properties()), json!({"utm_source": "email"}));
    }

    #[tokio::test]
    async fn empty_body_is_missing_deal_id() {
        let (gateway, app) = app();

        let (status, payload) = send(app, Method::POST, "/reject-offer", "").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload, json!({"error": "deal_id es requerido"}));
        assert!(gateway.updates().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let (_gateway, app) = app();

        let (status, payload) = send(app, Method::POST, "/accept-offer", "{deal_id:").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload, json!({"error": "cuerpo JSON inválido"}));
    }

    #[tokio::test]
    async fn write_failures_use_update_message() {
        let (gateway, app) = app();
        gateway.fail_with(CrmError::Transport("connection reset".to_string())).await;

        let (status, payload) =
            send(app, Method::POST, "/ajustarOferta", r#"{"deal_id":"555"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            payload,
            json!({"error": "Error al actualizar HubSpot", "details": "connection reset"})
        );
    }

    #[tokio::test]
    async fn options_returns_no_content_with_cors_headers() {
        let (_gateway, app) = app();

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/aceptarOferta")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
        assert_eq!(headers["access-control-allow-headers"], "Content-Type");
    }

    #[tokio::test]
    async fn browser_preflight_returns_no_content() {
        let (gateway, app) = app();

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/accept-offer")
                    .header("origin", "https://ofertas.example.com")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "content-type")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "GET, POST, OPTIONS");
        assert_eq!(headers["access-control-allow-headers"], "Content-Type");
        assert!(gateway.calls().await.is_empty());
    }

    #[tokio::test]
    async fn json_responses_carry_wildcard_origin() {
        let (_gateway, app) = app();

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/read-offer")
                    .header("origin", "https://ofertas.example.com")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(response.headers()["access-control-allow-methods"], "GET, POST, OPTIONS");
    }

    #[tokio::test]
    async fn unsupported_methods_get_405() {
        let (_gateway, app) = app();

        let (status, payload) = send(app.clone(), Method::GET, "/accept-offer", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(payload, json!({"error": "Método no permitido"}));

        let (status, _) = send(app, Method::DELETE, "/getDealData?deal_id=1", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
