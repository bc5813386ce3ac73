use crate::department::DepartmentAccount;
use payload_bus::BusError;
use thiserror::Error;

/// Errors raised by the chirp API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChirpError {
    #[error("Department account not present: {0}")]
    DepartmentMissing(DepartmentAccount),
    #[error("No chirp prefab available")]
    NoChirpPrefab,
    #[error("Unknown department: {0}")]
    UnknownDepartment(String),
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}
