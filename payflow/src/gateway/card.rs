use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::{required, required_amount, GatewayError, MockGateway, Scalar};
use crate::domain::ids;

/// Card authorization, shaped after a hosted-checkout card API.
pub struct CardAuthorization;

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct CardRequest {
    pub card_number: Option<Scalar>,
    pub expiry_month: Option<Scalar>,
    pub expiry_year: Option<Scalar>,
    pub cvv: Option<Scalar>,
    pub amount: Option<Scalar>,
    pub currency: Option<Scalar>,
}

#[derive(Debug, Clone)]
pub struct CardCharge {
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Serialize, Debug)]
pub struct Approved {
    result: &'static str,
    transaction: ApprovedTransaction,
    response: GatewayResponse,
}

#[derive(Serialize, Debug)]
struct ApprovedTransaction {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    amount: Decimal,
    currency: String,
}

#[derive(Serialize, Debug)]
pub struct Declined {
    result: &'static str,
    error: DeclineCause,
    response: GatewayResponse,
}

#[derive(Serialize, Debug)]
struct DeclineCause {
    cause: &'static str,
    explanation: &'static str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GatewayResponse {
    gateway_code: &'static str,
}

impl MockGateway for CardAuthorization {
    type Request = CardRequest;
    type Valid = CardCharge;
    type Approved = Approved;
    type Declined = Declined;

    const NAME: &'static str = "card";
    const LATENCY_SECS: Range<f64> = 1.0..2.0;
    const APPROVAL_RATE: f64 = 0.8;

    fn validate(request: CardRequest) -> Result<CardCharge, GatewayError> {
        // card details are checked for presence only and never echoed back
        required(request.card_number, "cardNumber")?;
        required(request.expiry_month, "expiryMonth")?;
        required(request.expiry_year, "expiryYear")?;
        required(request.cvv, "cvv")?;

        Ok(CardCharge {
            amount: required_amount(request.amount, "amount")?,
            currency: required(request.currency, "currency")?,
        })
    }

    fn approve(charge: &CardCharge) -> Approved {
        Approved {
            result: "SUCCESS",
            transaction: ApprovedTransaction {
                id: format!("TXN-{}", ids::receipt(16)),
                kind: "PAYMENT",
                amount: charge.amount,
                currency: charge.currency.clone(),
            },
            response: GatewayResponse {
                gateway_code: "APPROVED",
            },
        }
    }

    fn decline(_: &CardCharge) -> Declined {
        Declined {
            result: "FAILURE",
            error: DeclineCause {
                cause: "DECLINED",
                explanation: "The card issuer declined the transaction",
            },
            response: GatewayResponse {
                gateway_code: "DECLINED",
            },
        }
    }
}
