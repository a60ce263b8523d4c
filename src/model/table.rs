use std::marker::PhantomData;

use crate::dao::PoolType;

/// Typed handle over the shared connection pool. Entity queries hang off
/// `impl Table<Model>` blocks in the dao layer.
#[derive(Debug)]
pub struct Table<T> {
    pub pool: PoolType,
    _phantomdata: PhantomData<T>,
}

impl<T> Table<T> {
    pub fn new(pool: PoolType) -> Self {
        Table {
            pool,
            _phantomdata: PhantomData,
        }
    }
}
