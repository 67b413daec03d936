use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::{required, required_amount, GatewayError, MockGateway, Scalar};
use crate::domain::ids;

/// M-Pesa Express (STK push) initiation.
pub struct StkPush;

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct StkPushRequest {
    pub phone_number: Option<Scalar>,
    pub amount: Option<Scalar>,
    pub account_reference: Option<Scalar>,
    pub transaction_desc: Option<Scalar>,
}

#[derive(Debug, Clone)]
pub struct StkPushPrompt {
    pub phone_number: String,
    pub amount: Decimal,
    pub account_reference: String,
    pub transaction_desc: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct Accepted {
    #[serde(rename = "MerchantRequestID")]
    merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: String,
    response_code: &'static str,
    response_description: &'static str,
    customer_message: &'static str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Rejected {
    request_id: String,
    error_code: &'static str,
    error_message: &'static str,
}

const ACCEPTED: &str = "Success. Request accepted for processing";

impl MockGateway for StkPush {
    type Request = StkPushRequest;
    type Valid = StkPushPrompt;
    type Approved = Accepted;
    type Declined = Rejected;

    const NAME: &'static str = "mpesa-stk-push";
    const LATENCY_SECS: Range<f64> = 1.0..2.0;
    const APPROVAL_RATE: f64 = 0.8;

    fn validate(request: StkPushRequest) -> Result<StkPushPrompt, GatewayError> {
        Ok(StkPushPrompt {
            phone_number: required(request.phone_number, "phoneNumber")?,
            amount: required_amount(request.amount, "amount")?,
            account_reference: required(request.account_reference, "accountReference")?,
            transaction_desc: required(request.transaction_desc, "transactionDesc")?,
        })
    }

    fn approve(_: &StkPushPrompt) -> Accepted {
        Accepted {
            merchant_request_id: ids::request_id(),
            checkout_request_id: format!(
                "ws_CO_{}{}",
                Utc::now().format("%d%m%Y%H%M%S"),
                ids::digits(9)
            ),
            response_code: "0",
            response_description: ACCEPTED,
            customer_message: ACCEPTED,
        }
    }

    fn decline(_: &StkPushPrompt) -> Rejected {
        Rejected {
            request_id: ids::request_id(),
            error_code: "500.001.1001",
            error_message:
                "Unable to lock subscriber, a transaction is already in process for the current subscriber",
        }
    }
}
