//! [`DeliverNotices`] [`Task`].

use std::{convert::Infallible, fmt};

use common::{
    operations::{Perform, Start},
    Handler,
};
use tokio::sync::mpsc;
use tracing as log;

use crate::infra::Notice;
#[cfg(doc)]
use crate::infra::Notifier;

use super::Task;

/// Sending side of the [`Notice`]s queue.
///
/// [`Notice`]s are queued only after the changes they describe are
/// committed, and their delivery never affects the caller.
#[derive(Clone, Debug)]
pub struct Outbox(mpsc::UnboundedSender<Notice>);

impl Outbox {
    /// Creates a new [`Notice`]s queue.
    #[must_use]
    pub fn channel() -> (Self, Inbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), Inbox(rx))
    }

    /// Queues the provided [`Notice`] for delivery.
    pub fn dispatch(&self, notice: Notice) {
        let kind = notice.kind();
        if self.0.send(notice).is_err() {
            log::warn!("`{kind}` notice dropped: delivery is not running");
        }
    }
}

/// Receiving side of the [`Notice`]s queue.
#[derive(Debug)]
pub struct Inbox(mpsc::UnboundedReceiver<Notice>);

impl Inbox {
    /// Waits for the next queued [`Notice`].
    ///
    /// [`None`] is returned once every [`Outbox`] is dropped.
    pub async fn recv(&mut self) -> Option<Notice> {
        self.0.recv().await
    }

    /// Takes all the [`Notice`]s queued so far without waiting.
    #[cfg(test)]
    pub(crate) fn drain(&mut self) -> Vec<Notice> {
        std::iter::from_fn(|| self.0.try_recv().ok()).collect()
    }
}

/// [`Task`] delivering queued [`Notice`]s with a [`Notifier`].
#[derive(Clone, Debug)]
pub struct DeliverNotices<N> {
    /// [`Notifier`] to deliver [`Notice`]s with.
    notifier: N,
}

impl<N> DeliverNotices<N> {
    /// Creates a new [`DeliverNotices`] [`Task`] using the provided
    /// [`Notifier`].
    #[must_use]
    pub const fn new(notifier: N) -> Self {
        Self { notifier }
    }
}

impl<N> Task<Start<Inbox>> for DeliverNotices<N>
where
    Self: Task<Perform<Notice>, Ok = (), Err: fmt::Display>,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(mut inbox): Start<Inbox>,
    ) -> Result<Self::Ok, Self::Err> {
        while let Some(notice) = inbox.recv().await {
            let kind = notice.kind();
            _ = self.execute(Perform(notice)).await.map_err(|e| {
                log::error!("failed to deliver `{kind}` notice: {e}");
            });
        }
        log::debug!("notices queue closed");
        Ok(())
    }
}

impl<N> Task<Perform<Notice>> for DeliverNotices<N>
where
    N: Handler<Notice, Ok = ()>,
{
    type Ok = ();
    type Err = N::Err;

    async fn execute(
        &self,
        Perform(notice): Perform<Notice>,
    ) -> Result<Self::Ok, Self::Err> {
        self.notifier.execute(notice).await
    }
}

#[cfg(test)]
mod spec {
    use std::{convert::Infallible, sync::Arc};

    use common::{operations::Start, Handler};
    use parking_lot::Mutex;

    use crate::{
        domain::{meldung, user},
        infra::Notice,
    };

    use super::{DeliverNotices, Outbox, Task as _};

    /// Notifier failing on every other [`Notice`].
    #[derive(Clone, Default)]
    struct Flaky(Arc<Mutex<Vec<Notice>>>);

    impl Handler<Notice> for Flaky {
        type Ok = ();
        type Err = &'static str;

        async fn execute(&self, notice: Notice) -> Result<(), Self::Err> {
            let mut delivered = self.0.lock();
            delivered.push(notice);
            if delivered.len() % 2 == 0 {
                return Err("relay is down");
            }
            Ok(())
        }
    }

    fn report() -> Notice {
        Notice::Report {
            recipient_id: user::Id::new(),
            title: "Neue Meldung".into(),
            message: "Heizung".into(),
            meldung_id: meldung::Id::new(),
        }
    }

    #[tokio::test]
    async fn keeps_delivering_after_failures() {
        let notifier = Flaky::default();
        let (outbox, inbox) = Outbox::channel();
        for _ in 0..3 {
            outbox.dispatch(report());
        }
        drop(outbox);

        let res: Result<(), Infallible> =
            DeliverNotices::new(notifier.clone()).execute(Start(inbox)).await;

        assert!(res.is_ok());
        assert_eq!(notifier.0.lock().len(), 3);
    }

    #[test]
    fn dispatch_without_delivery_does_not_fail() {
        let (outbox, inbox) = Outbox::channel();
        drop(inbox);

        outbox.dispatch(report());
    }
}
