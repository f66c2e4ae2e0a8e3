//! Payment endpoints, including the gateway webhook.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::db::Payment;
use crate::error::{GatewayError, ServiceError};
use crate::gateway::SIGNATURE_HEADER;

use super::AppState;

/// Request body for POST /api/payments/checkout
#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub commitment_id: String,
    pub session_count: i64,
}

/// Response for POST /api/payments/checkout
#[derive(Serialize)]
pub struct CheckoutResponse {
    pub payment: Payment,
    pub checkout_url: String,
}

/// Start a checkout for sessions under a commitment
pub async fn checkout_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ServiceError> {
    let (payment, checkout_url) = state
        .service
        .checkout(&user, &request.commitment_id, request.session_count)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            payment,
            checkout_url,
        }),
    ))
}

/// Signed webhook deliveries from the payment gateway.
/// Unauthenticated: trust comes from the signature over the raw body.
pub async fn payment_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ServiceError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(ServiceError::Gateway(GatewayError::InvalidSignature))?;

    state.service.handle_payment_webhook(&body, signature)?;
    Ok(StatusCode::OK)
}

/// List payments visible to the caller
pub async fn list_payments_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<Payment>>, ServiceError> {
    let payments = state.service.list_payments(&user)?;
    Ok(Json(payments))
}
