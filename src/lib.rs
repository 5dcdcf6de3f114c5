pub mod bounds;
pub mod config;
pub mod error;
pub mod field;
pub mod node;
pub mod parse_rle;
pub mod rule_set;
pub mod store;
pub mod universe;

mod engine;
mod parse_util;
mod partition;
mod tables;

pub use bounds::Bounds;
pub use config::UniverseConfig;
pub use error::LifeError;
pub use node::Node;
pub use node::NodeRef;
pub use rule_set::RuleSet;
pub use universe::Universe;

/// Deepest level a quadtree may reach. Cell coordinates must fit in `-2^61..2^61`.
pub const MAX_LEVEL: u8 = 62;

pub type WorldOffset = i64;
