//! Storage adapters for the storefront repository ports.
//!
//! [`InMemoryStore`] backs tests and single-process runs; [`PostgresStore`]
//! is the durable implementation. Both implement every port of
//! [`domain::ports`] and so satisfy [`domain::Store`].

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
