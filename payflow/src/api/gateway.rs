//! Mock gateway endpoints.
//!
//! Approvals answer 200 and declines 400 with the provider's own body;
//! missing fields and unreadable bodies answer 400 `{error}`.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::{
    core::prelude::*,
    gateway::{
        c2b::C2bRequest, card::CardRequest, stk::StkPushRequest, C2bConfirmation,
        CardAuthorization, GatewayReply, StkPush,
    },
};

pub async fn card_authorize(
    State(state): State<AppState>,
    body: Result<Json<CardRequest>, JsonRejection>,
) -> Result<GatewayReply, ApiError> {
    let Json(request) = body?;
    Ok(state.gateways.run::<CardAuthorization>(request).await?)
}

pub async fn stk_push(
    State(state): State<AppState>,
    body: Result<Json<StkPushRequest>, JsonRejection>,
) -> Result<GatewayReply, ApiError> {
    let Json(request) = body?;
    Ok(state.gateways.run::<StkPush>(request).await?)
}

pub async fn c2b_confirm(
    State(state): State<AppState>,
    body: Result<Json<C2bRequest>, JsonRejection>,
) -> Result<GatewayReply, ApiError> {
    let Json(request) = body?;
    Ok(state.gateways.run::<C2bConfirmation>(request).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{clock::MonotonicClock, config::Config, random::ScriptedRandom},
        store::InMemoryRepository,
    };
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{Request, StatusCode},
        response::IntoResponse,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn state(draws: &[f64]) -> AppState {
        AppState::new(
            &Config::default(),
            Arc::new(InMemoryRepository::default()),
            Arc::new(MonotonicClock::new()),
            Arc::new(ScriptedRandom::new(draws.to_vec())),
        )
    }

    async fn body_json(response: axum::response::Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn card(body: Value) -> Result<Json<CardRequest>, JsonRejection> {
        Ok(Json(serde_json::from_value(body).unwrap()))
    }

    #[tokio::test(start_paused = true)]
    async fn card_missing_field_is_400_with_error() {
        let response = card_authorize(State(state(&[0.0])), card(json!({ "cvv": "123" })))
            .await
            .into_response();
        let (status, body) = body_json(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required field: cardNumber");
    }

    #[tokio::test(start_paused = true)]
    async fn card_outcome_is_success_or_failure_shape() {
        let request = json!({
            "cardNumber": "4111111111111111",
            "expiryMonth": 12,
            "expiryYear": 2030,
            "cvv": "123",
            "amount": 100,
            "currency": "KES",
        });
        let state = state(&[0.0, 0.1, 0.0, 0.9]);

        let (status, ok) = body_json(
            card_authorize(State(state.clone()), card(request.clone()))
                .await
                .into_response(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ok["result"], "SUCCESS");
        assert!(ok.get("error").is_none());

        let (status, declined) = body_json(
            card_authorize(State(state), card(request))
                .await
                .into_response(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(declined["result"], "FAILURE");
        assert!(declined.get("transaction").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stk_and_c2b_answer_with_provider_bodies() {
        let state = state(&[0.0, 0.1]);

        let stk: StkPushRequest = serde_json::from_value(json!({
            "phoneNumber": "254712345678",
            "amount": 100,
            "accountReference": "ACC",
            "transactionDesc": "Pay",
        }))
        .unwrap();
        let (status, body) = body_json(
            stk_push(State(state.clone()), Ok(Json(stk)))
                .await
                .into_response(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ResponseCode"], "0");

        let c2b: C2bRequest = serde_json::from_value(json!({
            "paymentLinkId": "PL-1",
            "amount": 100,
            "currency": "KES",
        }))
        .unwrap();
        let (status, body) = body_json(
            c2b_confirm(State(state), Ok(Json(c2b)))
                .await
                .into_response(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["TransAmount"], "100.00");
    }

    #[tokio::test]
    async fn unreadable_body_is_400_with_error() {
        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let body = Json::<CardRequest>::from_request(request, &()).await;
        assert!(body.is_err());

        let response = card_authorize(State(state(&[0.0])), body)
            .await
            .into_response();
        let (status, body) = body_json(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("invalid request: "));
    }
}
