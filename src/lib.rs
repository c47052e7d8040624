pub mod cache;
pub mod config;
pub mod construct;
pub mod db;
pub mod error;
pub mod gateways;
pub mod graph;
pub mod retrieval;

pub use config::Config;
pub use error::{PaperkgError, Result};
pub use graph::{Entity, EntityType, RelationType, Relationship};
