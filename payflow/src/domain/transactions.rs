use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ids, status::TransactionStatus};

/// Settlement currency. Transfers are only paid out in Kenyan shillings.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Currency {
    #[default]
    #[serde(rename = "KES")]
    Kes,
}

/// Domain model for a mobile-money transfer.
///
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub recipient_phone: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
    /// Settlement receipt, only present once the transfer is `COMPLETED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpesa_transaction_id: Option<String>,
}

/// Transfer request as submitted by the transfer form.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewTransfer {
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    pub recipient_phone: Option<String>,
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("amount is required")]
    MissingAmount,
    #[error("amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("recipientPhone is required")]
    MissingRecipient,
    #[error("invalid recipient phone number: {0}")]
    InvalidPhone(String),
    #[error("invalid sender email: {0}")]
    InvalidEmail(String),
}

impl Transaction {
    /// Validates a transfer request and opens a record in the initial status.
    ///
    /// `updated_at` starts equal to `created_at`.
    ///
    pub fn open(request: NewTransfer, now: DateTime<Utc>) -> Result<Self, TransferError> {
        let amount = request.amount.ok_or(TransferError::MissingAmount)?;
        if amount <= Decimal::ZERO {
            return Err(TransferError::NonPositiveAmount(amount));
        }

        let recipient_phone = non_blank(request.recipient_phone)
            .ok_or(TransferError::MissingRecipient)?;
        if !is_kenyan_mobile(&recipient_phone) {
            return Err(TransferError::InvalidPhone(recipient_phone));
        }

        let sender_email = non_blank(request.sender_email);
        if let Some(email) = &sender_email {
            if !looks_like_email(email) {
                return Err(TransferError::InvalidEmail(email.clone()));
            }
        }

        Ok(Self {
            id: ids::transaction_id(),
            amount,
            currency: request.currency.unwrap_or_default(),
            recipient_phone,
            status: TransactionStatus::INITIAL,
            created_at: now,
            updated_at: now,
            sender_name: non_blank(request.sender_name),
            sender_email,
            mpesa_transaction_id: None,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Safaricom/Airtel style numbers: `+2547XXXXXXXX`, `2541XXXXXXXX`, `07XXXXXXXX`.
pub fn is_kenyan_mobile(phone: &str) -> bool {
    let subscriber = phone
        .strip_prefix("+254")
        .or_else(|| phone.strip_prefix("254"))
        .or_else(|| phone.strip_prefix('0'));

    match subscriber {
        Some(rest) => {
            rest.len() == 9
                && (rest.starts_with('7') || rest.starts_with('1'))
                && rest.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    }
}
