//! Demo data for a freshly reset store.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

use crate::domain::{ids, prelude::*};

struct Sample {
    /// Mantissa and scale.
    amount: (i64, u32),
    phone: &'static str,
    sender: Option<(&'static str, &'static str)>,
    status: TransactionStatus,
    age_minutes: i64,
}

const SAMPLES: [Sample; 5] = [
    Sample {
        amount: (2500, 0),
        phone: "+254712345678",
        sender: Some(("Amina Otieno", "amina@example.com")),
        status: TransactionStatus::Completed,
        age_minutes: 240,
    },
    Sample {
        amount: (120050, 2),
        phone: "+254722000111",
        sender: Some(("Brian Kamau", "brian@example.com")),
        status: TransactionStatus::FailedSettlement,
        age_minutes: 180,
    },
    Sample {
        amount: (750, 0),
        phone: "0110123456",
        sender: None,
        status: TransactionStatus::CanceledGateway,
        age_minutes: 90,
    },
    Sample {
        amount: (10000, 0),
        phone: "254798765432",
        sender: Some(("Chloe Wanjiru", "chloe@example.com")),
        status: TransactionStatus::Completed,
        age_minutes: 30,
    },
    Sample {
        amount: (100, 0),
        phone: "+254700111222",
        sender: None,
        status: TransactionStatus::PendingGateway,
        age_minutes: 0,
    },
];

/// Sample transfers, oldest first, with `created_at <= updated_at <= now`.
///
/// Terminal samples were last updated ten seconds after creation; the
/// pending one is brand new.
pub fn demo_transactions(now: DateTime<Utc>) -> Vec<Transaction> {
    SAMPLES
        .iter()
        .map(|sample| {
            let created_at = now - TimeDelta::minutes(sample.age_minutes);
            let updated_at = if sample.status.is_terminal() {
                created_at + TimeDelta::seconds(10)
            } else {
                created_at
            };
            Transaction {
                id: ids::transaction_id(),
                amount: Decimal::new(sample.amount.0, sample.amount.1),
                currency: Currency::Kes,
                recipient_phone: sample.phone.to_string(),
                status: sample.status,
                created_at,
                updated_at,
                sender_name: sample.sender.map(|(name, _)| name.to_string()),
                sender_email: sample.sender.map(|(_, email)| email.to_string()),
                mpesa_transaction_id: (sample.status == TransactionStatus::Completed)
                    .then(|| ids::receipt(10)),
            }
        })
        .collect()
}
