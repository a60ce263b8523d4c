mod postgre;

pub use postgre::{migrations, PoolOption, PoolType, QueryResult};
