use std::sync::Arc;

use axum::response::Response;
use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;

use crate::permits::{
    permit_router, ActorId, Amount, ApplicationId, EventError, EventPublisher, InMemoryEventLog,
    InMemoryPermitRepository, ManualClock, PermitApplication, PermitEvent, PermitPolicy,
    PermitRepository, PermitService, PermitStatus, PermitSubmission, RepositoryError,
    StaticAuthorization, Timestamp,
};

pub(super) const APPLICANT: &str = "owner-17";
pub(super) const REVIEWER: &str = "reviewer-1";
pub(super) const INSPECTOR: &str = "inspector-4";

pub(super) type MemoryService = PermitService<InMemoryPermitRepository, InMemoryEventLog>;

pub(super) fn start() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn applicant() -> ActorId {
    ActorId::new(APPLICANT)
}

pub(super) fn reviewer() -> ActorId {
    ActorId::new(REVIEWER)
}

pub(super) fn inspector() -> ActorId {
    ActorId::new(INSPECTOR)
}

pub(super) fn authorization() -> StaticAuthorization {
    StaticAuthorization::default()
        .with_reviewer(REVIEWER)
        .with_inspector(INSPECTOR)
}

pub(super) fn submission() -> PermitSubmission {
    PermitSubmission {
        applicant: applicant(),
        business_type: "restaurant".into(),
        business_name: "Harbor Noodle Bar".to_string(),
        business_address: "14 Quay Street".to_string(),
        fee_amount: Amount(1000),
    }
}

pub(super) fn submission_named(applicant: &str, business_name: &str) -> PermitSubmission {
    PermitSubmission {
        applicant: ActorId::new(applicant),
        business_name: business_name.to_string(),
        ..submission()
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<MemoryService>,
    pub(super) repository: Arc<InMemoryPermitRepository>,
    pub(super) events: Arc<InMemoryEventLog>,
    pub(super) clock: Arc<ManualClock>,
}

pub(super) fn harness() -> Harness {
    harness_with_policy(PermitPolicy::default())
}

pub(super) fn harness_with_policy(policy: PermitPolicy) -> Harness {
    let repository = Arc::new(InMemoryPermitRepository::default());
    let events = Arc::new(InMemoryEventLog::default());
    let clock = Arc::new(ManualClock::new(start()));
    let service = Arc::new(PermitService::new(
        repository.clone(),
        events.clone(),
        Arc::new(authorization()),
        clock.clone(),
        policy,
    ));
    Harness {
        service,
        repository,
        events,
        clock,
    }
}

/// Drive an application through payment and an approving review.
pub(super) fn approved_application(harness: &Harness) -> ApplicationId {
    let application = harness.service.submit(submission()).expect("submit");
    harness
        .service
        .pay_fee(application.id, &applicant(), Amount(1000))
        .expect("pay");
    harness
        .service
        .decide(
            application.id,
            &reviewer(),
            crate::permits::ReviewDecision::Approved,
            "site plan in order",
        )
        .expect("approve");
    application.id
}

/// Approved application with a passed fire-safety inspection, then issued.
pub(super) fn issued_application(harness: &Harness) -> PermitApplication {
    let id = approved_application(harness);
    let scheduled_at = harness.clock.now_plus(Duration::days(7));
    harness
        .service
        .schedule_inspection(id, "fire-safety", scheduled_at, &inspector())
        .expect("schedule");
    harness.clock.set(scheduled_at);
    harness
        .service
        .complete_inspection(
            id,
            "fire-safety",
            crate::permits::InspectionOutcome::Passed,
            "extinguishers tagged",
            &inspector(),
        )
        .expect("complete");
    harness.service.issue(id).expect("issue")
}

pub(super) trait ClockExt {
    fn now_plus(&self, by: Duration) -> Timestamp;
}

impl ClockExt for ManualClock {
    fn now_plus(&self, by: Duration) -> Timestamp {
        crate::permits::Clock::now(self) + by
    }
}

pub(super) fn router_for(service: Arc<MemoryService>) -> axum::Router {
    permit_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) struct UnavailableRepository;

impl PermitRepository for UnavailableRepository {
    fn insert(
        &self,
        _application: PermitApplication,
    ) -> Result<PermitApplication, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn save(&self, _application: PermitApplication) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn load(&self, _id: ApplicationId) -> Result<Option<PermitApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn exists_by_applicant_and_name(
        &self,
        _applicant: &ActorId,
        _business_name: &str,
    ) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn exists_by_name(&self, _business_name: &str) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn list(
        &self,
        _status: Option<PermitStatus>,
        _limit: usize,
    ) -> Result<Vec<PermitApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }
}

pub(super) struct DroppingEvents;

impl EventPublisher for DroppingEvents {
    fn publish(&self, _event: PermitEvent) -> Result<(), EventError> {
        Err(EventError::Transport("broker down".to_string()))
    }
}
