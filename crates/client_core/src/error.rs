use thiserror::Error;

/// Failures of [`Configurator::commit`](crate::Configurator::commit). Fetch
/// failures never surface here; they are published on each source's
/// [`Resource`](crate::Resource).
#[derive(Debug, Error)]
pub enum ConfiguratorError {
    #[error("no item is loaded; nothing to commit")]
    NoActiveItem,
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}
