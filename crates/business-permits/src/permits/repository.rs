use serde::Serialize;

use super::domain::{
    ActorId, Amount, ApplicationId, BusinessType, InspectionOutcome, InspectionType,
    PermitApplication, PermitStatus, Timestamp,
};

/// Storage abstraction so the service can be exercised against any backend.
///
/// `exists_by_*` only consider applications that still hold their business name,
/// i.e. anything not rejected or expired.
pub trait PermitRepository: Send + Sync {
    fn insert(&self, application: PermitApplication) -> Result<PermitApplication, RepositoryError>;
    fn save(&self, application: PermitApplication) -> Result<(), RepositoryError>;
    fn load(&self, id: ApplicationId) -> Result<Option<PermitApplication>, RepositoryError>;
    fn exists_by_applicant_and_name(
        &self,
        applicant: &ActorId,
        business_name: &str,
    ) -> Result<bool, RepositoryError>;
    fn exists_by_name(&self, business_name: &str) -> Result<bool, RepositoryError>;
    fn list(
        &self,
        status: Option<PermitStatus>,
        limit: usize,
    ) -> Result<Vec<PermitApplication>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl PermitApplication {
    pub fn review_summary(&self) -> String {
        match &self.review {
            Some(review) if review.notes.trim().is_empty() => {
                format!("{} by {}", review.decision, review.reviewer)
            }
            Some(review) => format!(
                "{} by {}: {}",
                review.decision, review.reviewer, review.notes
            ),
            None => "pending review".to_string(),
        }
    }

    pub fn status_view(&self) -> PermitStatusView {
        PermitStatusView {
            application_id: self.id,
            applicant: self.applicant.clone(),
            business_type: self.business_type.clone(),
            business_name: self.business_name.clone(),
            business_address: self.business_address.clone(),
            status: self.status.label(),
            fee_amount: self.fee_amount,
            paid_amount: self.payment.as_ref().map(|payment| payment.amount),
            review_summary: self.review_summary(),
            inspections: self
                .inspections
                .iter()
                .map(|inspection| InspectionView {
                    inspection_type: inspection.inspection_type.clone(),
                    scheduled_at: inspection.scheduled_at,
                    outcome: inspection.outcome,
                    completed_at: inspection.completed_at,
                })
                .collect(),
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        }
    }
}

/// Public projection of an application returned by adapters.
#[derive(Debug, Clone, Serialize)]
pub struct PermitStatusView {
    pub application_id: ApplicationId,
    pub applicant: ActorId,
    pub business_type: BusinessType,
    pub business_name: String,
    pub business_address: String,
    pub status: &'static str,
    pub fee_amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<Amount>,
    pub review_summary: String,
    pub inspections: Vec<InspectionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectionView {
    pub inspection_type: InspectionType,
    pub scheduled_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<InspectionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Timestamp>,
}
