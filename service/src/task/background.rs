//! Background environment for running [`Task`]s.

use std::{
    error::Error,
    future::{Future, IntoFuture},
    iter,
};

use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _, TryFutureExt as _,
};
use tokio::task;
use tracing as log;

#[cfg(doc)]
use crate::Task;

/// Boxed error of a failed [`Task`].
type BoxError = Box<dyn Error + 'static>;

/// Background environment for running [`Task`]s.
///
/// Every [`Task`] runs on the thread awaiting this [`Background`], so it may
/// hold `!Send` state.
#[derive(Debug, Default)]
pub struct Background {
    /// Local set the [`Task`]s are spawned onto.
    set: task::LocalSet,

    /// Handles of the spawned [`Task`]s along with their names.
    tasks: Vec<(&'static str, task::JoinHandle<Result<(), BoxError>>)>,
}

impl Background {
    /// Spawns a new named [`Task`] inside this [`Background`] environment.
    ///
    /// The [`Task`] starts running once this [`Background`] is awaited.
    pub fn spawn<F, E>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        let handle = self
            .set
            .spawn_local(future.map_err(|e| BoxError::from(Box::new(e))));
        self.tasks.push((name, handle));
    }

    /// Returns the number of spawned [`Task`]s.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Indicates whether no [`Task`] has been spawned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl IntoFuture for Background {
    type Output = Result<(), BoxError>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { set, tasks } = self;
        future::try_join_all(iter::once(set.map(Ok).boxed_local()).chain(
            tasks.into_iter().map(|(name, h)| {
                h.map(move |r| {
                    let res = match r {
                        Ok(res) => res,
                        Err(e) => Err(BoxError::from(Box::new(e))),
                    };
                    if let Err(e) = &res {
                        log::error!("background `{name}` task failed: {e}");
                    }
                    res
                })
                .boxed_local()
            }),
        ))
        .map_ok(drop)
        .boxed_local()
    }
}
