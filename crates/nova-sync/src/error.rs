use nova_persist::PersistError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("No authenticated user")]
    NotAuthenticated,

    #[error(transparent)]
    Persist(#[from] PersistError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
