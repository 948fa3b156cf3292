//! Workflow definition and run persistence (§4.10): one `Repository`
//! contract, an in-memory backend for tests and single-process
//! deployments, and a Postgres backend for everything else.

pub mod in_memory;
pub mod relational;
pub mod repository;

pub use in_memory::InMemoryRepository;
pub use relational::PostgresRepository;
pub use repository::Repository;
