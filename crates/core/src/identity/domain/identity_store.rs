use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to open identity store at {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("identity store query failed: {0}")]
    Query(String),
    #[error("failed to encode or decode stored image: {0}")]
    Codec(String),
}

/// One enrolled identity as persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct IdentityRecord {
    pub id: i64,
    pub name: String,
    pub image: Frame,
}

/// Persistent mapping from a name to its reference face crop.
///
/// Names are not unique. `load` returns the earliest record saved under
/// the name.
pub trait IdentityStore: Send {
    fn count(&self) -> Result<usize, StoreError>;

    fn save(&mut self, name: &str, image: &Frame) -> Result<(), StoreError>;

    fn load(&self, name: &str) -> Result<Option<Frame>, StoreError>;

    /// Flushes and releases the backing store. Operations after `close`
    /// fail with [`StoreError::Query`]; closing twice is a no-op.
    fn close(&mut self) -> Result<(), StoreError>;
}
