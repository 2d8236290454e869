pub mod cli;
pub mod client;
pub mod config;
pub mod protocol;
pub mod router;
pub mod storage;
pub mod transform;

pub use cli::{Command, prompt};
pub use client::DebugClient;
pub use config::{Config, MiscConfig};
pub use router::{TableDefinition, TableRouter};
pub use transform::{Transform, TransformRegistry};
