use crate::{
    configuration::Config,
    dao::{PoolOption, PoolType},
    error::Error,
    model::{Subscription, SystemMessage, Table},
};

#[derive(Debug)]
pub struct DatabasePool {
    pub subscription: Table<Subscription>,
    pub system_message: Table<SystemMessage>,
    pub pool: PoolType,
}

impl DatabasePool {
    pub async fn new(config: &Config) -> Result<DatabasePool, Error> {
        let pool = PoolOption::new()
            .max_connections(20)
            .connect(config.database_url.as_str())
            .await?;

        Ok(DatabasePool {
            subscription: Table::new(pool.clone()),
            system_message: Table::new(pool.clone()),
            pool,
        })
    }

    pub fn get_pool(&self) -> &PoolType {
        &self.pool
    }
}
