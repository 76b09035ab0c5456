pub mod catalog;
pub mod config;
pub mod configurator;
pub mod error;
pub mod fetch;
pub mod pricing;
pub mod probe;
pub mod selection;

pub use catalog::CatalogClient;
pub use config::{load_settings, Settings};
pub use configurator::{Configurator, ConfiguratorEvent, ConfiguratorView, DataSource};
pub use error::ConfiguratorError;
pub use fetch::{Loader, Resource};
pub use pricing::{aggregate, format_eur, PriceBreakdown};
pub use probe::CapabilityProbe;
pub use selection::SelectionSet;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
