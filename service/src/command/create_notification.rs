//! [`Command`] for publishing a [`Notification`] to a [`Property`].

use common::operations::{By, Commit, Insert, Select, Transact, Transacted};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{meldung, notification, property, user, Notification, Property},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for publishing a [`Notification`] to everyone living in a
/// [`Property`], issued by its owner.
#[derive(Clone, Debug)]
pub struct CreateNotification {
    /// ID of the landlord [`User`] publishing the [`Notification`].
    pub creator_id: user::Id,

    /// ID of the [`Property`] the [`Notification`] is published to.
    pub property_id: property::Id,

    /// [`notification::Kind`] of the [`Notification`].
    pub kind: notification::Kind,

    /// [`notification::Priority`] of the [`Notification`].
    pub priority: notification::Priority,

    /// [`notification::Title`] of the [`Notification`].
    pub title: notification::Title,

    /// [`notification::Text`] of the [`Notification`].
    pub message: notification::Text,

    /// ID of the related [`Meldung`], if any.
    ///
    /// [`Meldung`]: crate::domain::Meldung
    pub meldung_id: Option<meldung::Id>,
}

impl<Db, Bill> Command<CreateNotification> for Service<Db, Bill>
where
    Db: Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Insert<Notification>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Notification;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateNotification,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateNotification {
            creator_id,
            property_id,
            kind,
            priority,
            title,
            message,
            meldung_id,
        } = cmd;

        let property = self
            .database()
            .execute(Select(By::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;
        if property.owner_id != creator_id {
            return Err(tracerr::new!(E::NotOwner(property_id)));
        }

        let notification = Notification {
            id: notification::Id::new(),
            property_id,
            kind,
            priority,
            title,
            message,
            creator_id,
            meldung_id,
            read_by: vec![],
            created_at: notification::CreationDateTime::now(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(notification.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(notification)
    }
}

/// Error of [`CreateNotification`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Property`] doesn't exist.
    #[display("`Property(id: {_0})` does not exist")]
    #[from(ignore)]
    PropertyNotExists(#[error(not(source))] property::Id),

    /// [`Property`] is owned by someone else.
    #[display("`Property(id: {_0})` is not owned by the `User`")]
    #[from(ignore)]
    NotOwner(#[error(not(source))] property::Id),
}
