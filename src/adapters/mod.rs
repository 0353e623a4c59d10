// Adapters layer: concrete implementations of the domain ports for external systems.

pub mod postgres;
pub mod world_bank;

pub use postgres::PostgresStore;
pub use world_bank::WorldBankClient;
