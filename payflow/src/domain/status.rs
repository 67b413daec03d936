use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a transfer.
///
/// The happy path is `PendingGateway -> GatewaySuccessful ->
/// ProcessingSettlement -> Completed`. `FailedSettlement` and
/// `CanceledGateway` are terminal failures.
///
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    PendingGateway,
    GatewaySuccessful,
    ProcessingSettlement,
    Completed,
    FailedSettlement,
    CanceledGateway,
}

impl TransactionStatus {
    /// Status of every freshly created transfer.
    pub const INITIAL: Self = Self::PendingGateway;

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::FailedSettlement | Self::CanceledGateway
        )
    }

    /// Whether `next` is the immediate successor of `self`.
    ///
    /// Only single forward steps are allowed; terminal states have no
    /// successors.
    ///
    pub fn can_transition_to(self, next: Self) -> bool {
        use TransactionStatus::*;

        matches!(
            (self, next),
            (PendingGateway, GatewaySuccessful)
                | (PendingGateway, CanceledGateway)
                | (GatewaySuccessful, ProcessingSettlement)
                | (ProcessingSettlement, Completed)
                | (ProcessingSettlement, FailedSettlement)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingGateway => "PENDING_GATEWAY",
            Self::GatewaySuccessful => "GATEWAY_SUCCESSFUL",
            Self::ProcessingSettlement => "PROCESSING_SETTLEMENT",
            Self::Completed => "COMPLETED",
            Self::FailedSettlement => "FAILED_SETTLEMENT",
            Self::CanceledGateway => "CANCELED_GATEWAY",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
