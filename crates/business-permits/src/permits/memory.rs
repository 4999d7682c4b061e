use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::domain::{ActorId, ApplicationId, PermitApplication, PermitStatus};
use super::events::{EventError, EventPublisher, PermitEvent};
use super::repository::{PermitRepository, RepositoryError};

fn poisoned<T>(_: PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("permit store lock poisoned".to_string())
}

/// Process-local repository keyed by application id. Reads share the lock.
#[derive(Default, Clone)]
pub struct InMemoryPermitRepository {
    records: Arc<RwLock<BTreeMap<ApplicationId, PermitApplication>>>,
}

impl InMemoryPermitRepository {
    pub fn len(&self) -> usize {
        self.records
            .read()
            .map(|records| records.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PermitRepository for InMemoryPermitRepository {
    fn insert(&self, application: PermitApplication) -> Result<PermitApplication, RepositoryError> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        records.insert(application.id, application.clone());
        Ok(application)
    }

    fn save(&self, application: PermitApplication) -> Result<(), RepositoryError> {
        let mut records = self.records.write().map_err(poisoned)?;
        match records.get_mut(&application.id) {
            Some(existing) => {
                *existing = application;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn load(&self, id: ApplicationId) -> Result<Option<PermitApplication>, RepositoryError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(&id).cloned())
    }

    fn exists_by_applicant_and_name(
        &self,
        applicant: &ActorId,
        business_name: &str,
    ) -> Result<bool, RepositoryError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.values().any(|application| {
            application.applicant == *applicant && application.holds_business_name(business_name)
        }))
    }

    fn exists_by_name(&self, business_name: &str) -> Result<bool, RepositoryError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .values()
            .any(|application| application.holds_business_name(business_name)))
    }

    fn list(
        &self,
        status: Option<PermitStatus>,
        limit: usize,
    ) -> Result<Vec<PermitApplication>, RepositoryError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .values()
            .filter(|application| status.map_or(true, |status| application.status == status))
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Event sink that keeps every published event, in order.
#[derive(Default, Clone)]
pub struct InMemoryEventLog {
    events: Arc<Mutex<Vec<PermitEvent>>>,
}

impl InMemoryEventLog {
    pub fn events(&self) -> Vec<PermitEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events_for(&self, application_id: ApplicationId) -> Vec<PermitEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.application_id() == application_id)
            .collect()
    }
}

impl EventPublisher for InMemoryEventLog {
    fn publish(&self, event: PermitEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .map_err(|_| EventError::Transport("event log lock poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

