//! Mock payment gateways.
//!
//! Every mock follows the same script: validate the request, wait a random
//! latency, draw approve/decline, and answer with a body shaped like the real
//! provider's. Calls are independent trials; nothing is remembered between
//! them.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{ops::Range, str::FromStr, sync::Arc, time::Duration};
use thiserror::Error;
use tracing::info;

use crate::core::random::RandomSource;

pub mod c2b;
pub mod card;
pub mod stk;

pub use c2b::C2bConfirmation;
pub use card::CardAuthorization;
pub use stk::StkPush;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// A required field is absent or empty.
    #[error("{0}")]
    Validation(String),

    #[error("internal gateway error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// One mocked provider endpoint.
pub trait MockGateway {
    /// Raw request body; every field optional so validation owns the errors.
    type Request: DeserializeOwned + Send;
    /// Request after validation.
    type Valid: Send + Sync;
    type Approved: Serialize;
    type Declined: Serialize;

    /// Name used in logs.
    const NAME: &'static str;
    /// Simulated round trip, in seconds, half-open.
    const LATENCY_SECS: Range<f64>;
    /// Probability of an approval.
    const APPROVAL_RATE: f64;

    fn validate(request: Self::Request) -> Result<Self::Valid, GatewayError>;
    fn approve(valid: &Self::Valid) -> Self::Approved;
    fn decline(valid: &Self::Valid) -> Self::Declined;
}

/// Provider answer: approvals are 200, declines are 400.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayReply {
    pub approved: bool,
    pub body: serde_json::Value,
}

impl GatewayReply {
    pub fn status(&self) -> StatusCode {
        if self.approved {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        }
    }
}

impl IntoResponse for GatewayReply {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body)).into_response()
    }
}

/// Runs mock gateways against a shared random source.
#[derive(Clone)]
pub struct GatewaySimulator {
    random: Arc<dyn RandomSource>,
}

impl GatewaySimulator {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// One simulated round trip to gateway `G`.
    ///
    /// Validation failures return before any latency is simulated.
    pub async fn run<G: MockGateway>(
        &self,
        request: G::Request,
    ) -> Result<GatewayReply, GatewayError> {
        let valid = G::validate(request)?;

        let secs = self
            .random
            .between(G::LATENCY_SECS.start, G::LATENCY_SECS.end);
        let latency = Duration::try_from_secs_f64(secs)
            .map_err(|e| GatewayError::Internal(format!("bad latency {secs}: {e}")))?;
        tokio::time::sleep(latency).await;

        let approved = self.random.chance(G::APPROVAL_RATE);
        let body = if approved {
            serde_json::to_value(G::approve(&valid))?
        } else {
            serde_json::to_value(G::decline(&valid))?
        };

        info!(
            gateway = G::NAME,
            approved,
            latency_ms = latency.as_millis() as u64,
            "mock gateway answered"
        );
        Ok(GatewayReply { approved, body })
    }
}

/// A JSON scalar accepted where forms send either text or a number
/// (ex. `"expiryMonth": "07"` or `"expiryMonth": 7`).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Scalar {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Number(number) => number.to_string(),
        }
    }
}

/// A present, non-blank value.
fn required(value: Option<Scalar>, field: &str) -> Result<String, GatewayError> {
    value
        .map(Scalar::into_text)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| missing(field))
}

/// A present, strictly positive amount with at most two decimal places.
///
/// Blank, non-numeric and non-positive values count as missing. Sub-cent
/// precision is refused rather than rounded, so echoed amounts always match
/// what was sent.
fn required_amount(value: Option<Scalar>, field: &str) -> Result<Decimal, GatewayError> {
    let text = required(value, field)?;
    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .filter(|amount| *amount > Decimal::ZERO)
        .ok_or_else(|| missing(field))?;

    if amount.normalize().scale() > MAX_AMOUNT_SCALE {
        return Err(GatewayError::Validation(format!(
            "Invalid {field}: at most {MAX_AMOUNT_SCALE} decimal places allowed"
        )));
    }
    Ok(amount)
}

/// Smallest currency unit is the cent.
const MAX_AMOUNT_SCALE: u32 = 2;

fn missing(field: &str) -> GatewayError {
    GatewayError::Validation(format!("Missing required field: {field}"))
}
