use std::fmt;

use serde::Serialize;

use super::domain::{
    ActorId, Amount, ApplicationId, InspectionType, PermitStatus, Timestamp,
};

/// Operation attempted against an application, carried in errors for adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitAction {
    AwaitPayment,
    PayFee,
    StartReview,
    Decide,
    Issue,
    Expire,
    ScheduleInspection,
    CompleteInspection,
}

impl PermitAction {
    pub const fn label(self) -> &'static str {
        match self {
            PermitAction::AwaitPayment => "await payment",
            PermitAction::PayFee => "pay the application fee",
            PermitAction::StartReview => "start review",
            PermitAction::Decide => "record a review decision",
            PermitAction::Issue => "issue the permit",
            PermitAction::Expire => "expire the permit",
            PermitAction::ScheduleInspection => "schedule an inspection",
            PermitAction::CompleteInspection => "complete an inspection",
        }
    }
}

impl fmt::Display for PermitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rejections raised by the registry, state machine, and inspection rules.
///
/// Every variant is recoverable and is returned before any state is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermitError {
    #[error("submission field `{field}` must not be blank")]
    InvalidSubmission { field: &'static str },
    #[error("fee {offered} is below the required {required}")]
    InsufficientFee { required: Amount, offered: Amount },
    #[error("an active application for `{business_name}` already exists")]
    DuplicateApplication { business_name: String },
    #[error("{actor} is not authorized to {action}")]
    NotAuthorized { actor: ActorId, action: PermitAction },
    #[error("cannot {action} while the application is {status}")]
    InvalidState {
        status: PermitStatus,
        action: PermitAction,
    },
    #[error("application {0} has already been reviewed")]
    AlreadyReviewed(ApplicationId),
    #[error("inspection must be scheduled after {now}, requested {scheduled_at}")]
    InvalidSchedule {
        scheduled_at: Timestamp,
        now: Timestamp,
    },
    #[error("no pending `{inspection_type}` inspection to complete")]
    NoPendingInspection { inspection_type: InspectionType },
    #[error("application {0} not found")]
    UnknownApplication(ApplicationId),
}

impl PermitError {
    /// Stable machine-readable code surfaced by adapters.
    pub const fn code(&self) -> &'static str {
        match self {
            PermitError::InvalidSubmission { .. } => "ERR-INVALID-SUBMISSION",
            PermitError::InsufficientFee { .. } => "ERR-INSUFFICIENT-PAYMENT",
            PermitError::DuplicateApplication { .. } => "ERR-APPLICATION-EXISTS",
            PermitError::NotAuthorized { .. } => "ERR-NOT-AUTHORIZED",
            PermitError::InvalidState { .. } => "ERR-INVALID-STATE",
            PermitError::AlreadyReviewed(_) => "ERR-ALREADY-REVIEWED",
            PermitError::InvalidSchedule { .. } => "ERR-INVALID-SCHEDULE",
            PermitError::NoPendingInspection { .. } => "ERR-NO-PENDING-INSPECTION",
            PermitError::UnknownApplication(_) => "ERR-UNKNOWN-APPLICATION",
        }
    }
}
