//! Process-wide table of live supervisors, keyed by id.

use std::{
    collections::HashMap,
    sync::{LazyLock, RwLock},
};

use crate::{error::RuntimeError, id::SupervisorId, sync::{read, write}};

use super::Supervisor;

static SUPERVISORS: LazyLock<RwLock<HashMap<SupervisorId, Supervisor>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

pub(crate) fn register(supervisor: Supervisor) {
    write(&SUPERVISORS).insert(supervisor.id(), supervisor);
}

/// Looks up a supervisor created anywhere in the process.
pub fn get_supervisor(id: SupervisorId) -> Option<Supervisor> {
    read(&SUPERVISORS).get(&id).cloned()
}

/// Unregisters a supervisor and hands back its handle.
///
/// Removal does not stop anything: call [`Supervisor::stop`] first if the
/// children should not keep running.
pub fn remove_supervisor(id: SupervisorId) -> Result<Supervisor, RuntimeError> {
    let removed = write(&SUPERVISORS).remove(&id);
    match removed {
        Some(supervisor) => {
            tracing::debug!(supervisor = %id, "supervisor unregistered");
            Ok(supervisor)
        }
        None => Err(RuntimeError::UnknownSupervisor(id)),
    }
}
