//! [`Command`] for starting a billing [`Subscription`] of a landlord.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, subscription, Subscription},
        User,
    },
    infra::{
        billing::{self, Approval},
        database, Billing, Database,
    },
    read, Service,
};

use super::Command;

/// [`Command`] for starting a billing [`Subscription`] of a landlord [`User`]
/// paying for every [`Unit`] the landlord manages.
///
/// The [`Subscription`] stays [`subscription::Status::ApprovalPending`] until
/// the payer approves it at the returned [`Approval::approval_url`].
///
/// [`Unit`]: crate::domain::Unit
#[derive(Clone, Copy, Debug)]
pub struct CreateSubscription {
    /// ID of the landlord [`User`].
    pub user_id: user::Id,
}

impl<Db, Bill> Command<CreateSubscription> for Service<Db, Bill>
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
        billing::CreateSubscription,
        Ok = Approval,
        Err = Traced<billing::Error>,
    >,
{
    type Ok = Approval;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateSubscription,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateSubscription { user_id } = cmd;

        let user = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;
        if user.role() != user::Role::Landlord {
            return Err(tracerr::new!(E::NotLandlord(user_id)));
        }
        if let Some(existing) = user.subscription().filter(|s| {
            matches!(
                s.status,
                subscription::Status::Active
                    | subscription::Status::ApprovalPending,
            )
        }) {
            return Err(tracerr::new!(E::SubscriptionExists(
                existing.id.clone()
            )));
        }

        let units = self
            .database()
            .execute(Select(By::<read::unit::OwnedCount, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let quantity = u32::from(units).max(1);

        let approval = self
            .billing()
            .execute(billing::CreateSubscription {
                user_id,
                email: user.email,
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
        user.profile = user::Profile::Landlord {
            subscription: Some(Subscription {
                id: approval.subscription_id.clone(),
                status: subscription::Status::ApprovalPending,
                quantity,
                updated_at: subscription::ModificationDateTime::now(),
            }),
        };
        tx.execute(Update(user))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(approval)
    }
}

/// Error of [`CreateSubscription`] [`Command`] execution.
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

    /// [`User`] is not a landlord.
    #[display("`User(id: {_0})` is not a landlord")]
    #[from(ignore)]
    NotLandlord(#[error(not(source))] user::Id),

    /// [`User`] has a pending or active [`Subscription`] already.
    #[display("`Subscription(id: {_0})` exists already")]
    #[from(ignore)]
    SubscriptionExists(#[error(not(source))] subscription::ProviderId),
}
