//! Postgres database clients acquiring their [`Connection`]s lazily.

use std::{future::Future, sync::Arc};

use tokio::sync::{RwLock, RwLockReadGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

/// Acquires a [`Connection`] into the provided `slot` unless it's there
/// already, and returns a read guard over it.
async fn acquire<C, F>(
    slot: &RwLock<Option<C>>,
    init: impl FnOnce() -> F,
) -> Result<RwLockReadGuard<'_, C>, Traced<database::Error>>
where
    F: Future<Output = Result<C, Traced<database::Error>>>,
{
    let read = slot.read().await;
    let guard = if read.is_some() {
        read
    } else {
        drop(read);
        let mut write = slot.write().await;
        if write.is_none() {
            *write = Some(init().await.map_err(tracerr::wrap!())?);
        }
        write.downgrade()
    };
    Ok(RwLockReadGuard::map(guard, |conn| {
        conn.as_ref().expect("`Connection` is initialized above")
    }))
}

/// Non-transactional Postgres database client.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to take [`Connection`]s from.
    pool: connection::Pool,

    /// [`Connection`] taken from the [`connection::Pool`], if any.
    connection: Arc<RwLock<Option<connection::NonTx>>>,
}

impl NonTx {
    /// Creates a new [`NonTx`] client over the provided
    /// [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self {
            pool,
            connection: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the [`connection::Pool`] of this [`NonTx`] client.
    pub(crate) fn pool(&self) -> &connection::Pool {
        &self.pool
    }

    /// Returns the [`Connection`] of this [`NonTx`] client, taking one from
    /// the [`connection::Pool`] on the first use.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::NonTx>, Traced<database::Error>>
    {
        acquire(&self.connection, || async {
            self.pool
                .get()
                .await
                .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                .map_err(tracerr::map_from)
        })
        .await
    }

    /// Takes the [`Connection`] out of this [`NonTx`] client, if it has
    /// acquired one.
    async fn take_connection(&self) -> Option<connection::NonTx> {
        self.connection.write().await.take()
    }
}

/// Transactional Postgres database client.
///
/// The transaction begins on the first executed statement, reusing the
/// [`Connection`] of the originating [`NonTx`] client if there is one.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`NonTx`] client this [`Tx`] client was started from.
    origin: NonTx,

    /// Lazily begun [`connection::Tx`].
    tx: Arc<RwLock<Option<connection::Tx>>>,
}

impl Tx {
    /// Creates a new [`Tx`] client out of the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(origin: NonTx) -> Self {
        Self {
            origin,
            tx: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the [`connection::Tx`] of this [`Tx`] client, beginning it on
    /// the first use.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        acquire(&self.tx, || async {
            let conn = match self.origin.take_connection().await {
                Some(conn) => conn,
                None => self
                    .origin
                    .pool()
                    .get()
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)?,
            };
            connection::Tx::begin(conn).await.map_err(tracerr::wrap!())
        })
        .await
    }

    /// Commits the transaction of this [`Tx`] client.
    ///
    /// Does nothing if no statement has been executed.
    ///
    /// # Errors
    ///
    /// If the transaction cannot be committed.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        match self.tx.write().await.take() {
            Some(tx) => tx.commit().await.map_err(tracerr::wrap!()),
            None => Ok(()),
        }
    }
}

/// Implements [`Connection`] by delegating to the lazily acquired one.
macro_rules! impl_connection {
    ($($ty:ty),*) => {$(
        impl Connection for $ty {
            async fn query<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Vec<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn query_opt<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Option<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query_opt(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn exec<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<u64, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .exec(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn batch_exec(
                &self,
                stmt: &str,
            ) -> Result<(), Traced<database::Error>> {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .batch_exec(stmt)
                    .await
                    .map_err(tracerr::wrap!())
            }
        }
    )*};
}

impl_connection!(NonTx, Tx);
