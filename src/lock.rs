use std::time::Instant;

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, Statement,
    TransactionTrait, Value,
};

use crate::config::{AdvisoryLockStrategy, ClosureTableConfig};
use crate::error::ClosureTableError;

/// A transaction that serializes hierarchy mutations.
///
/// On PostgreSQL a namespaced advisory lock is taken right after the
/// transaction begins and released just before commit/rollback, so two
/// mutations against the same table pair never interleave their read and
/// rewrite phases. On other backends the transaction alone is relied upon
/// (SQLite allows a single writer at a time).
pub struct LockedTransaction {
    txn: Option<DatabaseTransaction>,
    key: Option<String>,
}

impl LockedTransaction {
    pub async fn acquire(
        config: &ClosureTableConfig,
        db: &DatabaseConnection,
    ) -> Result<Self, ClosureTableError> {
        let key = match config.advisory_lock_strategy() {
            AdvisoryLockStrategy::Disabled => None,
            AdvisoryLockStrategy::Namespaced(key)
                if db.get_database_backend() == DbBackend::Postgres =>
            {
                Some(key.as_str().to_owned())
            }
            AdvisoryLockStrategy::Namespaced(_) => None,
        };

        let txn = db.begin().await?;

        if let Some(ref key) = key {
            if let Err(err) = wait_for_lock(&txn, key, config).await {
                let _ = txn.rollback().await;
                return Err(err);
            }
        }

        Ok(Self {
            txn: Some(txn),
            key,
        })
    }

    pub fn connection(&self) -> &DatabaseTransaction {
        self.txn.as_ref().expect("transaction already consumed")
    }

    pub async fn commit(mut self) -> Result<(), ClosureTableError> {
        if let Some(ref key) = self.key {
            if let Some(txn) = self.txn.as_ref() {
                release_lock(txn, key).await?;
            }
        }

        if let Some(txn) = self.txn.take() {
            txn.commit().await?;
        }

        Ok(())
    }

    pub async fn rollback(mut self) -> Result<(), ClosureTableError> {
        if let Some(ref key) = self.key {
            if let Some(txn) = self.txn.as_ref() {
                let _ = release_lock(txn, key).await;
            }
        }

        if let Some(txn) = self.txn.take() {
            txn.rollback().await?;
        }

        Ok(())
    }
}

async fn wait_for_lock(
    txn: &DatabaseTransaction,
    key: &str,
    config: &ClosureTableConfig,
) -> Result<(), ClosureTableError> {
    let timeout = config.lock_wait_timeout();
    let deadline = Instant::now() + timeout;

    loop {
        if try_acquire_lock(txn, key).await? {
            return Ok(());
        }

        if Instant::now() >= deadline {
            tracing::debug!(key, ?timeout, "hierarchy lock wait exceeded");
            return Err(ClosureTableError::Contention(timeout));
        }

        tokio::time::sleep(config.lock_retry_interval()).await;
    }
}

async fn try_acquire_lock(
    txn: &DatabaseTransaction,
    key: &str,
) -> Result<bool, ClosureTableError> {
    let row = txn
        .query_one(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT pg_try_advisory_lock(hashtext($1), 0)",
            vec![Value::from(key)],
        ))
        .await?;

    match row {
        Some(row) => Ok(row.try_get_by_index::<bool>(0).map_err(DbErr::from)?),
        None => Ok(false),
    }
}

async fn release_lock(txn: &DatabaseTransaction, key: &str) -> Result<(), ClosureTableError> {
    txn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_unlock(hashtext($1), 0)",
        vec![Value::from(key)],
    ))
    .await?;
    Ok(())
}
