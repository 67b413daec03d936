use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::{required, required_amount, GatewayError, MockGateway, Scalar};
use crate::domain::ids;

/// M-Pesa C2B payment confirmation for a payment link.
pub struct C2bConfirmation;

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct C2bRequest {
    pub payment_link_id: Option<Scalar>,
    pub amount: Option<Scalar>,
    pub currency: Option<Scalar>,
}

#[derive(Debug, Clone)]
pub struct C2bPayment {
    pub payment_link_id: String,
    pub amount: Decimal,
    pub currency: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct Confirmed {
    result_code: &'static str,
    result_desc: &'static str,
    #[serde(rename = "ThirdPartyTransID")]
    third_party_trans_id: String,
    bill_ref_number: String,
    trans_amount: String,
    #[serde(rename = "MSISDN")]
    msisdn: &'static str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct Unconfirmed {
    result_code: &'static str,
    result_desc: &'static str,
}

/// Payer number as the provider reports it, already masked.
const MASKED_MSISDN: &str = "2547*****678";

/// Amount with exactly two decimal places (ex. `100` -> `"100.00"`).
///
/// Validated amounts carry at most two places, so this only pads.
pub fn trans_amount(amount: Decimal) -> String {
    format!("{amount:.2}")
}

impl MockGateway for C2bConfirmation {
    type Request = C2bRequest;
    type Valid = C2bPayment;
    type Approved = Confirmed;
    type Declined = Unconfirmed;

    const NAME: &'static str = "mpesa-c2b";
    const LATENCY_SECS: Range<f64> = 1.5..3.0;
    const APPROVAL_RATE: f64 = 0.7;

    fn validate(request: C2bRequest) -> Result<C2bPayment, GatewayError> {
        Ok(C2bPayment {
            payment_link_id: required(request.payment_link_id, "paymentLinkId")?,
            amount: required_amount(request.amount, "amount")?,
            currency: required(request.currency, "currency")?,
        })
    }

    fn approve(payment: &C2bPayment) -> Confirmed {
        Confirmed {
            result_code: "0",
            result_desc: "The service request is processed successfully.",
            third_party_trans_id: ids::receipt(10),
            bill_ref_number: payment.payment_link_id.clone(),
            trans_amount: trans_amount(payment.amount),
            msisdn: MASKED_MSISDN,
        }
    }

    fn decline(_: &C2bPayment) -> Unconfirmed {
        Unconfirmed {
            result_code: "1",
            result_desc: "Payment not found or still pending",
        }
    }
}
