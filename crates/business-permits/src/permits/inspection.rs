use std::collections::BTreeSet;

use super::authorization::AuthorizationProvider;
use super::domain::{
    ActorId, Inspection, InspectionOutcome, InspectionType, PermitApplication, Timestamp,
};
use super::error::{PermitAction, PermitError};
use super::events::PermitEvent;

/// Inspectors and reviewers may both book and sign off inspections.
pub fn authorize_caller(
    authorization: &dyn AuthorizationProvider,
    caller: &ActorId,
    action: PermitAction,
) -> Result<(), PermitError> {
    if authorization.is_authorized_inspector(caller) || authorization.is_authorized_reviewer(caller)
    {
        Ok(())
    } else {
        Err(PermitError::NotAuthorized {
            actor: caller.clone(),
            action,
        })
    }
}

pub fn schedule(
    application: &mut PermitApplication,
    authorization: &dyn AuthorizationProvider,
    caller: &ActorId,
    inspection_type: InspectionType,
    scheduled_at: Timestamp,
    now: Timestamp,
) -> Result<PermitEvent, PermitError> {
    authorize_caller(authorization, caller, PermitAction::ScheduleInspection)?;
    if scheduled_at <= now {
        return Err(PermitError::InvalidSchedule { scheduled_at, now });
    }
    if application.status.is_terminal() {
        return Err(PermitError::InvalidState {
            status: application.status,
            action: PermitAction::ScheduleInspection,
        });
    }

    application.inspections.push(Inspection {
        inspection_type: inspection_type.clone(),
        scheduled_at,
        scheduled_by: caller.clone(),
        outcome: None,
        notes: None,
        completed_at: None,
        completed_by: None,
    });
    Ok(PermitEvent::InspectionScheduled {
        application_id: application.id,
        inspection_type,
        scheduled_at,
        at: now,
    })
}

/// Record the outcome of the oldest pending inspection of `inspection_type`.
pub fn complete(
    application: &mut PermitApplication,
    authorization: &dyn AuthorizationProvider,
    caller: &ActorId,
    inspection_type: InspectionType,
    outcome: InspectionOutcome,
    notes: String,
    now: Timestamp,
) -> Result<PermitEvent, PermitError> {
    authorize_caller(authorization, caller, PermitAction::CompleteInspection)?;

    let Some(inspection) = application
        .inspections
        .iter_mut()
        .find(|inspection| inspection.is_pending() && inspection.inspection_type == inspection_type)
    else {
        return Err(PermitError::NoPendingInspection { inspection_type });
    };

    inspection.outcome = Some(outcome);
    inspection.notes = Some(notes);
    inspection.completed_at = Some(now);
    inspection.completed_by = Some(caller.clone());
    Ok(PermitEvent::InspectionCompleted {
        application_id: application.id,
        inspection_type,
        outcome,
        at: now,
    })
}

pub fn pending_inspections(application: &PermitApplication) -> impl Iterator<Item = &Inspection> {
    application
        .inspections
        .iter()
        .filter(|inspection| inspection.is_pending())
}

/// Inspection types with at least one passed inspection on record.
pub fn passed_inspection_types(application: &PermitApplication) -> BTreeSet<InspectionType> {
    application
        .inspections
        .iter()
        .filter(|inspection| inspection.passed())
        .map(|inspection| inspection.inspection_type.clone())
        .collect()
}

/// Required types that still lack a passed inspection, in sorted order.
pub fn outstanding_requirements(
    application: &PermitApplication,
    required: &BTreeSet<InspectionType>,
) -> Vec<InspectionType> {
    let passed = passed_inspection_types(application);
    required.difference(&passed).cloned().collect()
}
