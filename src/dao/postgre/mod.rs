pub use self::types::{PoolOption, PoolType, QueryResult};

pub mod migrations;
mod subscription;
mod system_message;
mod types;
