//! Business permit lifecycle: registry, state machine, inspections, and validity.
//!
//! The state machine and validity evaluator are pure; [`service::PermitService`] wires them to
//! the storage, identity, clock, and event collaborators and serializes writes per application.

pub mod authorization;
pub mod clock;
pub mod domain;
pub mod error;
pub mod events;
pub mod inspection;
pub mod memory;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;
pub mod state_machine;
pub mod validity;

#[cfg(test)]
mod tests;

pub use authorization::{AuthorizationProvider, StaticAuthorization};
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::{
    ActorId, Amount, ApplicationId, BusinessType, Inspection, InspectionOutcome, InspectionType,
    PaymentRecord, PermitApplication, PermitStatus, PermitSubmission, ReviewDecision,
    ReviewRecord, Timestamp,
};
pub use error::{PermitAction, PermitError};
pub use events::{EventError, EventPublisher, PermitEvent};
pub use memory::{InMemoryEventLog, InMemoryPermitRepository};
pub use policy::{DuplicateScope, PermitPolicy};
pub use repository::{InspectionView, PermitRepository, PermitStatusView, RepositoryError};
pub use router::{permit_router, status_for};
pub use service::{PermitService, PermitServiceError};
pub use validity::PermitValidity;
