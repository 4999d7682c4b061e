use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point in time used throughout the permit lifecycle.
pub type Timestamp = DateTime<Utc>;

/// Identifier assigned to an application when it is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub u64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fee amount expressed in the smallest settlement unit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identity of an applicant, reviewer, or inspector.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Business category used to look up the minimum fee. Stored trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct BusinessType(String);

impl BusinessType {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BusinessType {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for BusinessType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<BusinessType> for String {
    fn from(value: BusinessType) -> Self {
        value.0
    }
}

impl fmt::Display for BusinessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inspection category tag (e.g. `fire-safety`). Stored trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct InspectionType(String);

impl InspectionType {
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for InspectionType {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for InspectionType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<InspectionType> for String {
    fn from(value: InspectionType) -> Self {
        value.0
    }
}

impl fmt::Display for InspectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Business names are compared trimmed and ASCII case-insensitively.
pub fn same_business_name(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}

/// Lifecycle status of a permit application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitStatus {
    Submitted,
    PaymentPending,
    PaymentReceived,
    UnderReview,
    Approved,
    Rejected,
    Issued,
    Expired,
}

impl PermitStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PermitStatus::Submitted => "submitted",
            PermitStatus::PaymentPending => "payment_pending",
            PermitStatus::PaymentReceived => "payment_received",
            PermitStatus::UnderReview => "under_review",
            PermitStatus::Approved => "approved",
            PermitStatus::Rejected => "rejected",
            PermitStatus::Issued => "issued",
            PermitStatus::Expired => "expired",
        }
    }

    /// Rejected and expired applications stay on record but accept no further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, PermitStatus::Rejected | PermitStatus::Expired)
    }

    pub const fn accepts_payment(self) -> bool {
        matches!(self, PermitStatus::Submitted | PermitStatus::PaymentPending)
    }
}

impl fmt::Display for PermitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Settlement recorded against an application. Written once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub amount: Amount,
    pub payer: ActorId,
    pub paid_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewDecision::Approved => "approved",
            ReviewDecision::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reviewer decision recorded against an application. Written once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub reviewer: ActorId,
    pub decision: ReviewDecision,
    pub notes: String,
    pub reviewed_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionOutcome {
    Passed,
    Failed,
}

impl InspectionOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            InspectionOutcome::Passed => "passed",
            InspectionOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for InspectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A scheduled inspection and, once completed, its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inspection {
    pub inspection_type: InspectionType,
    pub scheduled_at: Timestamp,
    pub scheduled_by: ActorId,
    pub outcome: Option<InspectionOutcome>,
    pub notes: Option<String>,
    pub completed_at: Option<Timestamp>,
    pub completed_by: Option<ActorId>,
}

impl Inspection {
    pub fn is_pending(&self) -> bool {
        self.outcome.is_none()
    }

    pub fn passed(&self) -> bool {
        self.outcome == Some(InspectionOutcome::Passed)
    }
}

/// Inbound request to open a permit application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitSubmission {
    pub applicant: ActorId,
    pub business_type: BusinessType,
    pub business_name: String,
    pub business_address: String,
    pub fee_amount: Amount,
}

/// A business's permit request and its accumulated history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitApplication {
    pub id: ApplicationId,
    pub applicant: ActorId,
    pub business_type: BusinessType,
    pub business_name: String,
    pub business_address: String,
    pub fee_amount: Amount,
    pub status: PermitStatus,
    pub payment: Option<PaymentRecord>,
    pub review: Option<ReviewRecord>,
    pub inspections: Vec<Inspection>,
    pub submitted_at: Timestamp,
    pub issued_at: Option<Timestamp>,
    pub expires_at: Option<Timestamp>,
}

impl PermitApplication {
    pub(crate) fn submitted(
        id: ApplicationId,
        submission: PermitSubmission,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            applicant: submission.applicant,
            business_type: submission.business_type,
            business_name: submission.business_name.trim().to_string(),
            business_address: submission.business_address.trim().to_string(),
            fee_amount: submission.fee_amount,
            status: PermitStatus::Submitted,
            payment: None,
            review: None,
            inspections: Vec::new(),
            submitted_at: now,
            issued_at: None,
            expires_at: None,
        }
    }

    /// Whether this application still blocks a new submission under the same business name.
    pub fn holds_business_name(&self, business_name: &str) -> bool {
        !self.status.is_terminal() && same_business_name(&self.business_name, business_name)
    }
}
