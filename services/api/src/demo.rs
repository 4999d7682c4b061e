use business_permits::error::AppError;
use business_permits::permits::{
    ActorId, Amount, ApplicationId, Clock, InMemoryEventLog, InMemoryPermitRepository,
    InspectionOutcome, ManualClock, PermitApplication, PermitPolicy, PermitService,
    PermitSubmission, PermitValidity, ReviewDecision, StaticAuthorization, Timestamp,
};
use chrono::{Duration, Utc};
use clap::Args;
use std::sync::Arc;

const DEMO_APPLICANT: &str = "applicant-A";
const DEMO_REVIEWER: &str = "reviewer-1";
const DEMO_INSPECTOR: &str = "inspector-1";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Simulated start time (RFC 3339). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) start: Option<Timestamp>,
    /// Business category used for the fee lookup
    #[arg(long, default_value = "restaurant")]
    pub(crate) business_type: String,
    /// Business name on the application
    #[arg(long, default_value = "Cafe X")]
    pub(crate) business_name: String,
    /// Quoted fee. Defaults to the policy minimum for the business type.
    #[arg(long)]
    pub(crate) fee: Option<u64>,
    /// Print the final public status payload as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ValidityArgs {
    /// Application id to evaluate against the seeded demo registry
    pub(crate) id: u64,
    /// Instant to evaluate at (RFC 3339). Defaults to the moment the demo permit is issued.
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) at: Option<Timestamp>,
    /// Simulated start time of the seeded lifecycle (RFC 3339). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_timestamp)]
    pub(crate) start: Option<Timestamp>,
}

type DemoService = PermitService<InMemoryPermitRepository, InMemoryEventLog>;

struct SeededRegistry {
    service: DemoService,
    clock: Arc<ManualClock>,
    events: Arc<InMemoryEventLog>,
    application: PermitApplication,
}

struct DemoOutcome {
    application: PermitApplication,
    valid_now: bool,
    valid_after_expiry: bool,
    events: Vec<String>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let print_json = args.json;
    println!("Business permit lifecycle demo");

    let outcome = run_scenario(args)?;
    let view = outcome.application.status_view();
    println!(
        "- Permit {} for '{}' -> status {}",
        view.application_id, view.business_name, view.status
    );
    if let (Some(issued_at), Some(expires_at)) = (view.issued_at, view.expires_at) {
        println!("  Issued {issued_at} | expires {expires_at}");
    }
    println!("  Review: {}", view.review_summary);
    println!("  Valid now: {}", outcome.valid_now);
    println!(
        "  Valid one second after expiry: {}",
        outcome.valid_after_expiry
    );

    println!("  Events published:");
    for name in &outcome.events {
        println!("    - {name}");
    }

    if print_json {
        match serde_json::to_string_pretty(&view) {
            Ok(json) => println!("  Public status payload:\n{json}"),
            Err(err) => println!("  Public status payload unavailable: {err}"),
        }
    }

    Ok(())
}

fn run_scenario(args: DemoArgs) -> Result<DemoOutcome, AppError> {
    let DemoArgs {
        start,
        business_type,
        business_name,
        fee,
        ..
    } = args;

    let SeededRegistry {
        service,
        clock,
        events,
        application,
    } = seed_registry(start, business_type, business_name, fee)?;
    let id = application.id;

    let valid_now = service.is_valid(id, clock.now())?;
    let valid_after_expiry = match application.expires_at {
        Some(expires_at) => service.is_valid(id, expires_at + Duration::seconds(1))?,
        None => false,
    };

    Ok(DemoOutcome {
        application,
        valid_now,
        valid_after_expiry,
        events: events
            .events()
            .iter()
            .map(|event| event.name().to_string())
            .collect(),
    })
}

pub(crate) fn run_validity(args: ValidityArgs) -> Result<(), AppError> {
    let (evaluated_at, validity) = assess(args)?;
    println!("{evaluated_at}: {}", validity.summary());
    Ok(())
}

fn assess(args: ValidityArgs) -> Result<(Timestamp, PermitValidity), AppError> {
    let seeded = seed_registry(
        args.start,
        "restaurant".to_string(),
        "Cafe X".to_string(),
        None,
    )?;
    let evaluated_at = args.at.unwrap_or_else(|| seeded.clock.now());
    let validity = seeded
        .service
        .assess_validity(ApplicationId(args.id), evaluated_at)?;
    Ok((evaluated_at, validity))
}

/// Registry holding one permit driven from submission to issuance.
fn seed_registry(
    start: Option<Timestamp>,
    business_type: String,
    business_name: String,
    fee: Option<u64>,
) -> Result<SeededRegistry, AppError> {
    let policy = PermitPolicy::default();
    let fee = fee
        .map(Amount)
        .unwrap_or_else(|| policy.minimum_fee_for(&business_type.as_str().into()));
    let clock = Arc::new(ManualClock::new(start.unwrap_or_else(Utc::now)));
    let events = Arc::new(InMemoryEventLog::default());
    let authorization = StaticAuthorization::default()
        .with_reviewer(DEMO_REVIEWER)
        .with_inspector(DEMO_INSPECTOR);
    let service = PermitService::new(
        Arc::new(InMemoryPermitRepository::default()),
        events.clone(),
        Arc::new(authorization),
        clock.clone(),
        policy,
    );

    let applicant = ActorId::new(DEMO_APPLICANT);
    let reviewer = ActorId::new(DEMO_REVIEWER);
    let inspector = ActorId::new(DEMO_INSPECTOR);

    let application = service.submit(PermitSubmission {
        applicant: applicant.clone(),
        business_type: business_type.into(),
        business_name,
        business_address: "1 Main St".to_string(),
        fee_amount: fee,
    })?;
    let id = application.id;

    service.pay_fee(id, &applicant, fee)?;
    service.start_review(id)?;
    service.decide(id, &reviewer, ReviewDecision::Approved, "site plan in order")?;

    let required: Vec<_> = service.policy().required_inspections().iter().cloned().collect();
    let scheduled_at = clock.now() + Duration::days(7);
    for inspection_type in &required {
        service.schedule_inspection(id, inspection_type.clone(), scheduled_at, &inspector)?;
    }
    clock.set(scheduled_at);
    for inspection_type in required {
        service.complete_inspection(
            id,
            inspection_type,
            InspectionOutcome::Passed,
            "no findings",
            &inspector,
        )?;
    }

    let application = service.issue(id)?;
    Ok(SeededRegistry {
        service,
        clock,
        events,
        application,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use business_permits::permits::{PermitError, PermitServiceError, PermitStatus};

    fn args() -> DemoArgs {
        DemoArgs {
            start: Some(
                crate::infra::parse_timestamp("2025-01-06T09:00:00Z").expect("valid timestamp"),
            ),
            business_type: "restaurant".to_string(),
            business_name: "Cafe X".to_string(),
            fee: None,
            json: false,
        }
    }

    #[test]
    fn scenario_issues_a_valid_permit() {
        let outcome = run_scenario(args()).expect("scenario completes");

        assert_eq!(outcome.application.status, PermitStatus::Issued);
        assert_eq!(outcome.application.fee_amount, Amount(1000));
        assert!(outcome.valid_now);
        assert!(!outcome.valid_after_expiry);
        assert_eq!(outcome.events.first().map(String::as_str), Some("application_submitted"));
        assert_eq!(outcome.events.last().map(String::as_str), Some("permit_issued"));
    }

    #[test]
    fn scenario_surfaces_underpayment() {
        let mut short = args();
        short.fee = Some(10);

        match run_scenario(short) {
            Err(AppError::Permit(PermitServiceError::Permit(PermitError::InsufficientFee {
                ..
            }))) => {}
            Err(other) => panic!("expected insufficient fee, got {other}"),
            Ok(_) => panic!("expected insufficient fee"),
        }
    }

    #[test]
    fn validity_of_seeded_permit_follows_its_window() {
        let start = crate::infra::parse_timestamp("2025-01-06T09:00:00Z").expect("valid");

        let (evaluated_at, validity) = assess(ValidityArgs {
            id: 1,
            at: None,
            start: Some(start),
        })
        .expect("assess");
        assert_eq!(evaluated_at, start + Duration::days(7));
        assert!(validity.is_valid());

        let (_, lapsed) = assess(ValidityArgs {
            id: 1,
            at: Some(start + Duration::days(7 + 365) + Duration::seconds(1)),
            start: Some(start),
        })
        .expect("assess");
        assert!(matches!(lapsed, PermitValidity::Expired { .. }));
    }

    #[test]
    fn validity_of_unknown_id_is_reported_not_failed() {
        let (_, validity) = assess(ValidityArgs {
            id: 42,
            at: None,
            start: None,
        })
        .expect("assess");
        assert_eq!(validity, PermitValidity::Unknown);
        assert_eq!(validity.summary(), "no such application");
    }
}
