//! [`Command`] for marking a [`Notification`] as read.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        notification, property, unit, user, Notification, Property, Unit,
        User,
    },
    infra::{database, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for marking a [`Notification`] as read by a [`User`] it is
/// shown to.
///
/// Marking a [`Notification`] twice keeps the first read receipt.
#[derive(Clone, Copy, Debug)]
pub struct MarkNotificationRead {
    /// ID of the [`User`] who read the [`Notification`].
    pub user_id: user::Id,

    /// ID of the read [`Notification`].
    pub notification_id: notification::Id,
}

impl<Db, Bill> Command<MarkNotificationRead> for Service<Db, Bill>
where
    Db: Database<
            Select<By<Option<Notification>, notification::Id>>,
            Ok = Option<Notification>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Unit>, unit::Id>>,
            Ok = Option<Unit>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Notification, notification::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Notification>, notification::Id>>,
            Ok = Option<Notification>,
            Err = Traced<database::Error>,
        > + Database<
            Update<Notification>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Notification;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: MarkNotificationRead,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let MarkNotificationRead {
            user_id,
            notification_id,
        } = cmd;

        let property_id = self
            .database()
            .execute(Select(By::<Option<Notification>, _>::new(
                notification_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::NotificationNotExists(notification_id))
            .map_err(tracerr::wrap!())?
            .property_id;
        let property = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let user = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let residence = match user.as_ref().and_then(User::assigned_unit) {
            Some(unit_id) => self
                .database()
                .execute(Select(By::<Option<Unit>, _>::new(unit_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?,
            None => None,
        };
        let visible = match (&property, &user) {
            (Some(p), Some(u)) => {
                read::notification::visible_to(p, u, residence.as_ref())
            }
            _ => false,
        };
        if !visible {
            return Err(tracerr::new!(E::Forbidden(notification_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `Notification`.
        tx.execute(Lock(By::new(notification_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut notification = tx
            .execute(Select(By::<Option<Notification>, _>::new(
                notification_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::NotificationNotExists(notification_id))
            .map_err(tracerr::wrap!())?;
        if notification.mark_read(user_id) {
            tx.execute(Update(notification.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            tx.execute(Commit)
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }

        Ok(notification)
    }
}

/// Error of [`MarkNotificationRead`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Notification`] doesn't exist.
    #[display("`Notification(id: {_0})` does not exist")]
    #[from(ignore)]
    NotificationNotExists(#[error(not(source))] notification::Id),

    /// [`Notification`] is not shown to the [`User`].
    #[display("`Notification(id: {_0})` is not accessible")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] notification::Id),
}
