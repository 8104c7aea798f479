//! [`Command`] for adjusting a [`Subscription`] to the managed units.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        user::{self, subscription, Subscription},
        User,
    },
    infra::{billing, database, Billing, Database},
    read, Service,
};

use super::Command;

/// [`Command`] for adjusting the quantity of an existing [`Subscription`] to
/// the number of [`Unit`]s the landlord [`User`] manages now.
///
/// [`Unit`]: crate::domain::Unit
#[derive(Clone, Copy, Debug)]
pub struct ReviseSubscription {
    /// ID of the landlord [`User`].
    pub user_id: user::Id,
}

impl<Db, Bill> Command<ReviseSubscription> for Service<Db, Bill>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<read::unit::OwnedCount, user::Id>>,
            Ok = read::unit::OwnedCount,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
    Bill: Billing<
        billing::ReviseSubscription,
        Ok = (),
        Err = Traced<billing::Error>,
    >,
{
    type Ok = Subscription;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ReviseSubscription,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ReviseSubscription { user_id } = cmd;

        let subscription = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?
            .subscription()
            .cloned()
            .ok_or(E::NoSubscription(user_id))
            .map_err(tracerr::wrap!())?;

        let units = self
            .database()
            .execute(Select(By::<read::unit::OwnedCount, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let quantity = u32::from(units).max(1);
        if quantity == subscription.quantity {
            log::debug!(
                "`Subscription(id: {})` quantity is up to date",
                subscription.id,
            );
            return Ok(subscription);
        }

        self.billing()
            .execute(billing::ReviseSubscription {
                subscription_id: subscription.id.clone(),
                quantity,
            })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `User`.
        tx.execute(Lock(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;
        let user::Profile::Landlord {
            subscription: Some(subscription),
        } = &mut user.profile
        else {
            return Err(tracerr::new!(E::NoSubscription(user_id)));
        };
        subscription.quantity = quantity;
        subscription.updated_at = subscription::ModificationDateTime::now();
        let revised = subscription.clone();
        tx.execute(Update(user))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(revised)
    }
}

/// Error of [`ReviseSubscription`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Billing`] provider error.
    #[display("`Billing` operation failed: {_0}")]
    Billing(billing::Error),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`User`] has no [`Subscription`] to revise.
    #[display("`User(id: {_0})` has no `Subscription`")]
    #[from(ignore)]
    NoSubscription(#[error(not(source))] user::Id),
}
