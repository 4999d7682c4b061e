use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::domain::{Amount, BusinessType, InspectionType, PermitApplication};
use crate::config::PolicyConfig;

const DEFAULT_MINIMUM_FEE: Amount = Amount(500);
const DEFAULT_VALIDITY_DAYS: i64 = 365;
pub const MAX_VALIDITY_DAYS: i64 = 36_500;

/// How widely a business name must be unique among active applications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateScope {
    #[default]
    PerApplicant,
    Global,
}

impl DuplicateScope {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "applicant" | "per_applicant" | "per-applicant" => Some(Self::PerApplicant),
            "global" => Some(Self::Global),
            _ => None,
        }
    }
}

/// Policy dials for fees, validity windows, and required inspections.
#[derive(Debug, Clone, PartialEq)]
pub struct PermitPolicy {
    default_minimum_fee: Amount,
    fee_table: BTreeMap<BusinessType, Amount>,
    validity_days: i64,
    required_inspections: BTreeSet<InspectionType>,
    duplicate_scope: DuplicateScope,
}

impl PermitPolicy {
    /// Empty policy: no fee table, no required inspections, one-year validity.
    pub fn new(default_minimum_fee: Amount) -> Self {
        Self {
            default_minimum_fee,
            fee_table: BTreeMap::new(),
            validity_days: DEFAULT_VALIDITY_DAYS,
            required_inspections: BTreeSet::new(),
            duplicate_scope: DuplicateScope::default(),
        }
    }

    pub fn with_fee(mut self, business_type: impl Into<BusinessType>, minimum: Amount) -> Self {
        self.fee_table.insert(business_type.into(), minimum);
        self
    }

    /// Out-of-range periods fall back to the one-year default.
    pub fn with_validity_days(mut self, days: i64) -> Self {
        self.validity_days = if (1..=MAX_VALIDITY_DAYS).contains(&days) {
            days
        } else {
            DEFAULT_VALIDITY_DAYS
        };
        self
    }

    pub fn with_required_inspection(mut self, inspection_type: impl Into<InspectionType>) -> Self {
        self.required_inspections.insert(inspection_type.into());
        self
    }

    pub fn with_duplicate_scope(mut self, scope: DuplicateScope) -> Self {
        self.duplicate_scope = scope;
        self
    }

    pub fn default_minimum_fee(&self) -> Amount {
        self.default_minimum_fee
    }

    /// Minimum fee for a business type, falling back to the default for unknown types.
    pub fn minimum_fee_for(&self, business_type: &BusinessType) -> Amount {
        self.fee_table
            .get(business_type)
            .copied()
            .unwrap_or(self.default_minimum_fee)
    }

    /// Amount a payment must cover: the quoted fee, or the policy minimum if that is higher.
    pub fn required_payment(&self, application: &PermitApplication) -> Amount {
        application
            .fee_amount
            .max(self.minimum_fee_for(&application.business_type))
    }

    pub fn validity_period(&self) -> Duration {
        Duration::days(self.validity_days)
    }

    pub fn required_inspections(&self) -> &BTreeSet<InspectionType> {
        &self.required_inspections
    }

    pub fn duplicate_scope(&self) -> DuplicateScope {
        self.duplicate_scope
    }
}

impl Default for PermitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MINIMUM_FEE)
            .with_fee("restaurant", Amount(1000))
            .with_fee("retail", Amount(500))
            .with_fee("manufacturing", Amount(2500))
            .with_required_inspection("fire-safety")
    }
}

impl From<&PolicyConfig> for PermitPolicy {
    fn from(config: &PolicyConfig) -> Self {
        let policy = PermitPolicy::new(Amount(config.default_minimum_fee))
            .with_validity_days(config.validity_days)
            .with_duplicate_scope(config.duplicate_scope);

        let policy = config
            .fee_table
            .iter()
            .fold(policy, |policy, (business_type, minimum)| {
                policy.with_fee(business_type.as_str(), Amount(*minimum))
            });

        config
            .required_inspections
            .iter()
            .fold(policy, |policy, inspection_type| {
                policy.with_required_inspection(inspection_type.as_str())
            })
    }
}
