pub mod config;
pub mod error;
pub mod db;
pub mod relations;
pub mod sparql;
pub mod events;
pub mod lynchings;
pub mod web;

pub use config::Config;
pub use error::{GalynError, Result};
pub use relations::{GraphData, RelationsCollection, RelationshipRecord};
