use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    #[error("Failed to allocate the {what}: {bytes} bytes")]
    Allocation { what: &'static str, bytes: usize },
    #[error("Transmission pool needs at least 2 buffers, got {0}")]
    PoolTooShallow(usize),
}
