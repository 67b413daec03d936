pub mod prelude {
    pub use super::{
        heartbeat::Heartbeat,
        status::TransactionStatus,
        transactions::{Currency, NewTransfer, Transaction, TransferError},
    };
}

pub mod ids;
pub mod status;
pub mod transactions;

pub mod heartbeat {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
    pub struct Heartbeat {
        pub status: String,
        pub timestamp: DateTime<Utc>,
    }

    impl Heartbeat {
        pub fn ok(timestamp: DateTime<Utc>) -> Self {
            Self {
                status: "ok".to_string(),
                timestamp,
            }
        }
    }
}
