//! Guarded transitions for a permit application.
//!
//! ```text
//! Submitted ──▶ PaymentPending ──┐
//!     │                          ▼
//!     └──────────────────▶ PaymentReceived ──▶ UnderReview ──▶ Approved ──▶ Issued ──▶ Expired
//!                                 │                 │
//!                                 └─────────────────┴──▶ Rejected
//! ```
//!
//! Every transition validates all of its guards before touching the application, so a
//! rejected call leaves the record exactly as it was. Successful transitions return the
//! [`PermitEvent`] describing what happened; persisting and publishing it is the caller's job.

use super::authorization::AuthorizationProvider;
use super::domain::{
    ActorId, Amount, ApplicationId, PaymentRecord, PermitApplication, PermitStatus,
    PermitSubmission, ReviewDecision, ReviewRecord, Timestamp,
};
use super::error::{PermitAction, PermitError};
use super::events::PermitEvent;
use super::policy::PermitPolicy;

pub struct PermitStateMachine<'a> {
    policy: &'a PermitPolicy,
    authorization: &'a dyn AuthorizationProvider,
}

impl<'a> PermitStateMachine<'a> {
    pub fn new(policy: &'a PermitPolicy, authorization: &'a dyn AuthorizationProvider) -> Self {
        Self {
            policy,
            authorization,
        }
    }

    /// Validate a submission and build the `Submitted` application for `id`.
    ///
    /// Duplicate detection needs the registry and happens before this is called.
    pub fn open(
        &self,
        id: ApplicationId,
        submission: PermitSubmission,
        now: Timestamp,
    ) -> Result<(PermitApplication, PermitEvent), PermitError> {
        validate_submission(&submission)?;

        let required = self.policy.minimum_fee_for(&submission.business_type);
        if submission.fee_amount < required {
            return Err(PermitError::InsufficientFee {
                required,
                offered: submission.fee_amount,
            });
        }

        let application = PermitApplication::submitted(id, submission, now);
        let event = PermitEvent::ApplicationSubmitted {
            application_id: id,
            applicant: application.applicant.clone(),
            business_name: application.business_name.clone(),
            at: now,
        };
        Ok((application, event))
    }

    /// Mark a fee as invoiced by the external settlement rail.
    pub fn await_payment(
        &self,
        application: &mut PermitApplication,
        now: Timestamp,
    ) -> Result<PermitEvent, PermitError> {
        require_status(application, PermitStatus::Submitted, PermitAction::AwaitPayment)?;

        application.status = PermitStatus::PaymentPending;
        Ok(PermitEvent::PaymentAwaited {
            application_id: application.id,
            at: now,
        })
    }

    pub fn pay_fee(
        &self,
        application: &mut PermitApplication,
        payer: &ActorId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<PermitEvent, PermitError> {
        if *payer != application.applicant {
            return Err(PermitError::NotAuthorized {
                actor: payer.clone(),
                action: PermitAction::PayFee,
            });
        }
        if !application.status.accepts_payment() || application.payment.is_some() {
            return Err(invalid_state(application, PermitAction::PayFee));
        }
        let required = self.policy.required_payment(application);
        if amount < required {
            return Err(PermitError::InsufficientFee {
                required,
                offered: amount,
            });
        }

        application.payment = Some(PaymentRecord {
            amount,
            payer: payer.clone(),
            paid_at: now,
        });
        application.status = PermitStatus::PaymentReceived;
        Ok(PermitEvent::FeePaid {
            application_id: application.id,
            payer: payer.clone(),
            amount,
            at: now,
        })
    }

    pub fn start_review(
        &self,
        application: &mut PermitApplication,
        now: Timestamp,
    ) -> Result<PermitEvent, PermitError> {
        require_status(
            application,
            PermitStatus::PaymentReceived,
            PermitAction::StartReview,
        )?;

        application.status = PermitStatus::UnderReview;
        Ok(PermitEvent::ReviewStarted {
            application_id: application.id,
            at: now,
        })
    }

    /// Record the one and only review. A paid application enters review implicitly.
    pub fn decide(
        &self,
        application: &mut PermitApplication,
        reviewer: &ActorId,
        decision: ReviewDecision,
        notes: String,
        now: Timestamp,
    ) -> Result<PermitEvent, PermitError> {
        if !self.authorization.is_authorized_reviewer(reviewer) {
            return Err(PermitError::NotAuthorized {
                actor: reviewer.clone(),
                action: PermitAction::Decide,
            });
        }
        if application.review.is_some() {
            return Err(PermitError::AlreadyReviewed(application.id));
        }
        if !matches!(
            application.status,
            PermitStatus::UnderReview | PermitStatus::PaymentReceived
        ) {
            return Err(invalid_state(application, PermitAction::Decide));
        }

        application.review = Some(ReviewRecord {
            reviewer: reviewer.clone(),
            decision,
            notes,
            reviewed_at: now,
        });
        application.status = match decision {
            ReviewDecision::Approved => PermitStatus::Approved,
            ReviewDecision::Rejected => PermitStatus::Rejected,
        };
        Ok(PermitEvent::ReviewRecorded {
            application_id: application.id,
            reviewer: reviewer.clone(),
            decision,
            at: now,
        })
    }

    pub fn issue(
        &self,
        application: &mut PermitApplication,
        now: Timestamp,
    ) -> Result<PermitEvent, PermitError> {
        let approved = application
            .review
            .as_ref()
            .is_some_and(|review| review.decision == ReviewDecision::Approved);
        if application.status != PermitStatus::Approved
            || application.payment.is_none()
            || !approved
        {
            return Err(invalid_state(application, PermitAction::Issue));
        }

        let expires_at = now + self.policy.validity_period();
        application.issued_at = Some(now);
        application.expires_at = Some(expires_at);
        application.status = PermitStatus::Issued;
        Ok(PermitEvent::PermitIssued {
            application_id: application.id,
            issued_at: now,
            expires_at,
        })
    }

    /// Move an issued permit whose window has closed into `Expired`.
    pub fn expire(
        &self,
        application: &mut PermitApplication,
        now: Timestamp,
    ) -> Result<PermitEvent, PermitError> {
        let lapsed = application
            .expires_at
            .is_some_and(|expires_at| now > expires_at);
        if application.status != PermitStatus::Issued || !lapsed {
            return Err(invalid_state(application, PermitAction::Expire));
        }

        application.status = PermitStatus::Expired;
        Ok(PermitEvent::PermitExpired {
            application_id: application.id,
            at: now,
        })
    }
}

fn validate_submission(submission: &PermitSubmission) -> Result<(), PermitError> {
    let fields: [(&'static str, &str); 4] = [
        ("applicant", submission.applicant.as_str()),
        ("business_type", submission.business_type.as_str()),
        ("business_name", submission.business_name.as_str()),
        ("business_address", submission.business_address.as_str()),
    ];

    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((field, _)) => Err(PermitError::InvalidSubmission { field: *field }),
        None => Ok(()),
    }
}

fn require_status(
    application: &PermitApplication,
    expected: PermitStatus,
    action: PermitAction,
) -> Result<(), PermitError> {
    if application.status == expected {
        Ok(())
    } else {
        Err(invalid_state(application, action))
    }
}

fn invalid_state(application: &PermitApplication, action: PermitAction) -> PermitError {
    PermitError::InvalidState {
        status: application.status,
        action,
    }
}
