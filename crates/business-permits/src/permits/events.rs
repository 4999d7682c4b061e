use serde::{Deserialize, Serialize};

use super::domain::{
    ActorId, Amount, ApplicationId, InspectionOutcome, InspectionType, ReviewDecision, Timestamp,
};

/// Domain events emitted after a transition has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PermitEvent {
    ApplicationSubmitted {
        application_id: ApplicationId,
        applicant: ActorId,
        business_name: String,
        at: Timestamp,
    },
    PaymentAwaited {
        application_id: ApplicationId,
        at: Timestamp,
    },
    FeePaid {
        application_id: ApplicationId,
        payer: ActorId,
        amount: Amount,
        at: Timestamp,
    },
    ReviewStarted {
        application_id: ApplicationId,
        at: Timestamp,
    },
    ReviewRecorded {
        application_id: ApplicationId,
        reviewer: ActorId,
        decision: ReviewDecision,
        at: Timestamp,
    },
    InspectionScheduled {
        application_id: ApplicationId,
        inspection_type: InspectionType,
        scheduled_at: Timestamp,
        at: Timestamp,
    },
    InspectionCompleted {
        application_id: ApplicationId,
        inspection_type: InspectionType,
        outcome: InspectionOutcome,
        at: Timestamp,
    },
    PermitIssued {
        application_id: ApplicationId,
        issued_at: Timestamp,
        expires_at: Timestamp,
    },
    PermitExpired {
        application_id: ApplicationId,
        at: Timestamp,
    },
}

impl PermitEvent {
    pub fn application_id(&self) -> ApplicationId {
        match self {
            PermitEvent::ApplicationSubmitted { application_id, .. }
            | PermitEvent::PaymentAwaited { application_id, .. }
            | PermitEvent::FeePaid { application_id, .. }
            | PermitEvent::ReviewStarted { application_id, .. }
            | PermitEvent::ReviewRecorded { application_id, .. }
            | PermitEvent::InspectionScheduled { application_id, .. }
            | PermitEvent::InspectionCompleted { application_id, .. }
            | PermitEvent::PermitIssued { application_id, .. }
            | PermitEvent::PermitExpired { application_id, .. } => *application_id,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            PermitEvent::ApplicationSubmitted { .. } => "application_submitted",
            PermitEvent::PaymentAwaited { .. } => "payment_awaited",
            PermitEvent::FeePaid { .. } => "fee_paid",
            PermitEvent::ReviewStarted { .. } => "review_started",
            PermitEvent::ReviewRecorded { .. } => "review_recorded",
            PermitEvent::InspectionScheduled { .. } => "inspection_scheduled",
            PermitEvent::InspectionCompleted { .. } => "inspection_completed",
            PermitEvent::PermitIssued { .. } => "permit_issued",
            PermitEvent::PermitExpired { .. } => "permit_expired",
        }
    }
}

/// Outbound sink for domain events (message bus, audit log, notification adapter).
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: PermitEvent) -> Result<(), EventError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}
