use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use super::authorization::AuthorizationProvider;
use super::clock::Clock;
use super::domain::{
    ActorId, Amount, ApplicationId, InspectionOutcome, InspectionType, PermitApplication,
    PermitStatus, PermitSubmission, ReviewDecision, Timestamp,
};
use super::error::PermitError;
use super::events::{EventPublisher, PermitEvent};
use super::inspection;
use super::policy::{DuplicateScope, PermitPolicy};
use super::repository::{PermitRepository, RepositoryError};
use super::state_machine::PermitStateMachine;
use super::validity::{self, PermitValidity};

/// One mutex per application id so writes to a record are serialized while
/// different records proceed in parallel. Slots only live while a caller holds one.
#[derive(Default)]
struct ApplicationLocks {
    slots: Mutex<HashMap<ApplicationId, Arc<Mutex<()>>>>,
}

impl ApplicationLocks {
    fn slot(&self, id: ApplicationId) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(id).or_default().clone()
    }

    /// Drop the map entry once the last caller hands its slot back.
    fn release(&self, id: ApplicationId, slot: Arc<Mutex<()>>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map plus `slot` itself.
        if Arc::strong_count(&slot) == 2 {
            slots.remove(&id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Service composing the registry, state machine, inspection rules, and validity evaluator.
pub struct PermitService<R, E> {
    repository: Arc<R>,
    events: Arc<E>,
    authorization: Arc<dyn AuthorizationProvider>,
    clock: Arc<dyn Clock>,
    policy: Arc<PermitPolicy>,
    sequence: AtomicU64,
    submissions: Mutex<()>,
    locks: ApplicationLocks,
}

impl<R, E> PermitService<R, E>
where
    R: PermitRepository + 'static,
    E: EventPublisher + 'static,
{
    pub fn new(
        repository: Arc<R>,
        events: Arc<E>,
        authorization: Arc<dyn AuthorizationProvider>,
        clock: Arc<dyn Clock>,
        policy: PermitPolicy,
    ) -> Self {
        Self {
            repository,
            events,
            authorization,
            clock,
            policy: Arc::new(policy),
            sequence: AtomicU64::new(1),
            submissions: Mutex::new(()),
            locks: ApplicationLocks::default(),
        }
    }

    pub fn policy(&self) -> &PermitPolicy {
        &self.policy
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn machine(&self) -> PermitStateMachine<'_> {
        PermitStateMachine::new(&self.policy, self.authorization.as_ref())
    }

    /// Register a new application and return it with its freshly assigned id.
    pub fn submit(
        &self,
        submission: PermitSubmission,
    ) -> Result<PermitApplication, PermitServiceError> {
        // Duplicate check, id assignment, and insert must not interleave.
        let _guard = self
            .submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if self.is_duplicate(&submission)? {
            return Err(PermitError::DuplicateApplication {
                business_name: submission.business_name.trim().to_string(),
            }
            .into());
        }

        let now = self.clock.now();
        let id = ApplicationId(self.sequence.load(Ordering::Acquire));
        let (application, event) = self.machine().open(id, submission, now)?;
        let stored = self.repository.insert(application)?;
        self.sequence.fetch_add(1, Ordering::AcqRel);

        debug!(application_id = %id, business_type = %stored.business_type, "permit application submitted");
        self.publish(event);
        Ok(stored)
    }

    fn is_duplicate(&self, submission: &PermitSubmission) -> Result<bool, RepositoryError> {
        match self.policy.duplicate_scope() {
            DuplicateScope::PerApplicant => self
                .repository
                .exists_by_applicant_and_name(&submission.applicant, &submission.business_name),
            DuplicateScope::Global => self.repository.exists_by_name(&submission.business_name),
        }
    }

    pub fn await_payment(
        &self,
        id: ApplicationId,
    ) -> Result<PermitApplication, PermitServiceError> {
        let machine = self.machine();
        self.transition(id, |application, now| {
            machine.await_payment(application, now)
        })
    }

    pub fn pay_fee(
        &self,
        id: ApplicationId,
        payer: &ActorId,
        amount: Amount,
    ) -> Result<PermitApplication, PermitServiceError> {
        let machine = self.machine();
        self.transition(id, |application, now| {
            machine.pay_fee(application, payer, amount, now)
        })
    }

    pub fn start_review(
        &self,
        id: ApplicationId,
    ) -> Result<PermitApplication, PermitServiceError> {
        let machine = self.machine();
        self.transition(id, |application, now| {
            machine.start_review(application, now)
        })
    }

    pub fn decide(
        &self,
        id: ApplicationId,
        reviewer: &ActorId,
        decision: ReviewDecision,
        notes: impl Into<String>,
    ) -> Result<PermitApplication, PermitServiceError> {
        let machine = self.machine();
        let notes = notes.into();
        self.transition(id, |application, now| {
            machine.decide(application, reviewer, decision, notes, now)
        })
    }

    pub fn issue(&self, id: ApplicationId) -> Result<PermitApplication, PermitServiceError> {
        let machine = self.machine();
        self.transition(id, |application, now| machine.issue(application, now))
    }

    pub fn expire(&self, id: ApplicationId) -> Result<PermitApplication, PermitServiceError> {
        let machine = self.machine();
        self.transition(id, |application, now| machine.expire(application, now))
    }

    pub fn schedule_inspection(
        &self,
        id: ApplicationId,
        inspection_type: impl Into<InspectionType>,
        scheduled_at: Timestamp,
        caller: &ActorId,
    ) -> Result<PermitApplication, PermitServiceError> {
        let authorization = self.authorization.as_ref();
        let inspection_type = inspection_type.into();
        self.transition(id, |application, now| {
            inspection::schedule(
                application,
                authorization,
                caller,
                inspection_type,
                scheduled_at,
                now,
            )
        })
    }

    pub fn complete_inspection(
        &self,
        id: ApplicationId,
        inspection_type: impl Into<InspectionType>,
        outcome: InspectionOutcome,
        notes: impl Into<String>,
        caller: &ActorId,
    ) -> Result<PermitApplication, PermitServiceError> {
        let authorization = self.authorization.as_ref();
        let inspection_type = inspection_type.into();
        let notes = notes.into();
        self.transition(id, |application, now| {
            inspection::complete(
                application,
                authorization,
                caller,
                inspection_type,
                outcome,
                notes,
                now,
            )
        })
    }

    /// Fetch an application for API responses.
    pub fn get(&self, id: ApplicationId) -> Result<PermitApplication, PermitServiceError> {
        let application = self
            .repository
            .load(id)?
            .ok_or(PermitError::UnknownApplication(id))?;
        Ok(application)
    }

    pub fn list(
        &self,
        status: Option<PermitStatus>,
        limit: usize,
    ) -> Result<Vec<PermitApplication>, PermitServiceError> {
        Ok(self.repository.list(status, limit)?)
    }

    /// Explain the permit's validity at `now` from a snapshot of the record.
    pub fn assess_validity(
        &self,
        id: ApplicationId,
        now: Timestamp,
    ) -> Result<PermitValidity, PermitServiceError> {
        let snapshot = self.repository.load(id)?;
        Ok(validity::evaluate(
            snapshot.as_ref(),
            self.policy.required_inspections(),
            now,
        ))
    }

    /// `false` for unknown ids; only storage failures surface as errors.
    pub fn is_valid(&self, id: ApplicationId, now: Timestamp) -> Result<bool, PermitServiceError> {
        Ok(self.assess_validity(id, now)?.is_valid())
    }

    /// Number of per-application lock slots currently held.
    #[cfg(test)]
    pub(crate) fn held_locks(&self) -> usize {
        self.locks.len()
    }

    fn transition<F>(&self, id: ApplicationId, apply: F) -> Result<PermitApplication, PermitServiceError>
    where
        F: FnOnce(&mut PermitApplication, Timestamp) -> Result<PermitEvent, PermitError>,
    {
        let slot = self.locks.slot(id);
        let result = {
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            self.apply_locked(id, apply)
        };
        self.locks.release(id, slot);
        result
    }

    fn apply_locked<F>(&self, id: ApplicationId, apply: F) -> Result<PermitApplication, PermitServiceError>
    where
        F: FnOnce(&mut PermitApplication, Timestamp) -> Result<PermitEvent, PermitError>,
    {
        let mut application = self
            .repository
            .load(id)?
            .ok_or(PermitError::UnknownApplication(id))?;
        let now = self.clock.now();
        let event = apply(&mut application, now)?;

        self.repository.save(application.clone())?;
        debug!(
            application_id = %id,
            status = %application.status,
            event = event.name(),
            "permit transition applied"
        );
        self.publish(event);
        Ok(application)
    }

    /// The write is already committed, so a lost event is logged rather than failing the call.
    fn publish(&self, event: PermitEvent) {
        let application_id = event.application_id();
        let name = event.name();
        if let Err(error) = self.events.publish(event) {
            warn!(%application_id, event = name, %error, "permit event not delivered");
        }
    }
}

/// Error raised by the permit service.
#[derive(Debug, thiserror::Error)]
pub enum PermitServiceError {
    #[error(transparent)]
    Permit(#[from] PermitError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl PermitServiceError {
    pub fn permit_error(&self) -> Option<&PermitError> {
        match self {
            PermitServiceError::Permit(error) => Some(error),
            PermitServiceError::Repository(_) => None,
        }
    }
}
