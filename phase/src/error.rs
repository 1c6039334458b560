use futures::task::SpawnError;

#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    /// A handled context was read outside of any provider.
    #[error("{context} was read outside of its provider")]
    MissingProvider { context: &'static str },
    #[error("Could not spawn refresh: {0}")]
    Spawn(#[from] SpawnError),
}
