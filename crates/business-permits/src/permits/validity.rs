use std::collections::BTreeSet;

use serde::Serialize;

use super::domain::{InspectionType, PermitApplication, PermitStatus, Timestamp};
use super::inspection::outstanding_requirements;

/// Why a permit is or is not valid at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PermitValidity {
    Valid { expires_at: Timestamp },
    Unknown,
    NotIssued { status: PermitStatus },
    Expired { expired_at: Timestamp },
    MissingInspections { inspection_types: Vec<InspectionType> },
}

impl PermitValidity {
    pub fn is_valid(&self) -> bool {
        matches!(self, PermitValidity::Valid { .. })
    }

    pub fn summary(&self) -> String {
        match self {
            PermitValidity::Valid { expires_at } => format!("permit valid until {expires_at}"),
            PermitValidity::Unknown => "no such application".to_string(),
            PermitValidity::NotIssued { status } => format!("permit not issued (status {status})"),
            PermitValidity::Expired { expired_at } => format!("permit expired at {expired_at}"),
            PermitValidity::MissingInspections { inspection_types } => {
                let names: Vec<&str> = inspection_types.iter().map(|kind| kind.as_str()).collect();
                format!("missing passed inspections: {}", names.join(", "))
            }
        }
    }
}

/// Evaluate validity from an application snapshot. Never mutates anything.
pub fn evaluate(
    application: Option<&PermitApplication>,
    required_inspections: &BTreeSet<InspectionType>,
    now: Timestamp,
) -> PermitValidity {
    let Some(application) = application else {
        return PermitValidity::Unknown;
    };

    let expires_at = match (application.status, application.expires_at) {
        (PermitStatus::Issued, Some(expires_at)) => expires_at,
        (PermitStatus::Expired, Some(expired_at)) => {
            return PermitValidity::Expired { expired_at };
        }
        (status, _) => return PermitValidity::NotIssued { status },
    };

    if now > expires_at {
        return PermitValidity::Expired {
            expired_at: expires_at,
        };
    }

    let missing = outstanding_requirements(application, required_inspections);
    if !missing.is_empty() {
        return PermitValidity::MissingInspections {
            inspection_types: missing,
        };
    }

    PermitValidity::Valid { expires_at }
}

pub fn is_valid(
    application: Option<&PermitApplication>,
    required_inspections: &BTreeSet<InspectionType>,
    now: Timestamp,
) -> bool {
    evaluate(application, required_inspections, now).is_valid()
}
