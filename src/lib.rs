pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{PostgresStore, WorldBankClient};
pub use config::cli::LocalStorage;
pub use config::toml_config::TomlConfig;
pub use self::core::{etl::EtlEngine, pipeline::DebtPipeline};
pub use utils::error::{EtlError, Result};
