//! [`Query`] collection related to [`Meldung`]s.

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{meldung, user, Meldung, Message},
    infra::{database, Database},
    read, Query, Service,
};

/// [`Query`] checking whether a [`User`] may access the thread of a
/// [`Meldung`].
///
/// Evaluated against the current state on every call.
///
/// [`User`]: crate::domain::User
#[derive(Clone, Copy, Debug)]
pub struct HasAccess {
    /// ID of the [`User`] asking for access.
    ///
    /// [`User`]: crate::domain::User
    pub user_id: user::Id,

    /// [`user::Role`] of the [`User`] asking for access.
    ///
    /// [`User`]: crate::domain::User
    pub role: user::Role,

    /// ID of the [`Meldung`] to access.
    pub meldung_id: meldung::Id,
}

impl<Db, Bill> Query<HasAccess> for Service<Db, Bill>
where
    Db: Database<
        Select<By<read::meldung::Chain, meldung::Id>>,
        Ok = read::meldung::Chain,
        Err = Traced<database::Error>,
    >,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(&self, q: HasAccess) -> Result<Self::Ok, Self::Err> {
        let HasAccess {
            user_id,
            role,
            meldung_id,
        } = q;

        Ok(self
            .database()
            .execute(Select(By::<read::meldung::Chain, _>::new(meldung_id)))
            .await
            .map_err(tracerr::wrap!())?
            .grants(user_id, role))
    }
}

/// [`Query`] of a [`Meldung`] along with its [`Message`]s, for a [`User`]
/// allowed to access them.
///
/// [`User`]: crate::domain::User
#[derive(Clone, Copy, Debug)]
pub struct Thread {
    /// ID of the [`User`] reading the thread.
    ///
    /// [`User`]: crate::domain::User
    pub user_id: user::Id,

    /// [`user::Role`] of the [`User`] reading the thread.
    ///
    /// [`User`]: crate::domain::User
    pub role: user::Role,

    /// ID of the [`Meldung`] to read.
    pub meldung_id: meldung::Id,
}

impl<Db, Bill> Query<Thread> for Service<Db, Bill>
where
    Db: Database<
            Select<By<read::meldung::Chain, meldung::Id>>,
            Ok = read::meldung::Chain,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Message>, meldung::Id>>,
            Ok = Vec<Message>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = read::meldung::Thread;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, q: Thread) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let Thread {
            user_id,
            role,
            meldung_id,
        } = q;

        let chain = self
            .database()
            .execute(Select(By::<read::meldung::Chain, _>::new(meldung_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if chain.meldung.is_none() {
            return Err(tracerr::new!(E::MeldungNotExists(meldung_id)));
        }
        let meldung = chain
            .granted_to(user_id, role)
            .ok_or(E::Forbidden(meldung_id))
            .map_err(tracerr::wrap!())?;

        let messages = self
            .database()
            .execute(Select(By::<Vec<Message>, _>::new(meldung_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(read::meldung::Thread { meldung, messages })
    }
}

/// Error of [`Thread`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Meldung`] doesn't exist.
    #[display("`Meldung(id: {_0})` does not exist")]
    #[from(ignore)]
    MeldungNotExists(#[error(not(source))] meldung::Id),

    /// [`User`] may not access the [`Meldung`] thread.
    ///
    /// [`User`]: crate::domain::User
    #[display("`Meldung(id: {_0})` thread is not accessible")]
    #[from(ignore)]
    Forbidden(#[error(not(source))] meldung::Id),
}

/// [`Query`] of the [`Meldung`]s relevant to a [`User`] by its
/// [`user::Role`], newest first.
///
/// [`User`]: crate::domain::User
#[derive(Clone, Copy, Debug)]
pub struct List {
    /// ID of the [`User`] listing.
    ///
    /// [`User`]: crate::domain::User
    pub user_id: user::Id,

    /// [`user::Role`] of the [`User`] listing.
    ///
    /// [`User`]: crate::domain::User
    pub role: user::Role,
}

impl<Db, Bill> Query<List> for Service<Db, Bill>
where
    Db: Database<
        Select<By<Vec<Meldung>, read::meldung::list::Selector>>,
        Ok = Vec<Meldung>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<Meldung>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        List { user_id, role }: List,
    ) -> Result<Self::Ok, Self::Err> {
        self.database()
            .execute(Select(By::new(read::meldung::list::Selector::of(
                user_id, role,
            ))))
            .await
            .map_err(tracerr::wrap!())
    }
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{meldung, property, unit, user},
        spec::service,
        Query as _,
    };

    use super::{ExecutionError, HasAccess, List, Thread};

    #[tokio::test]
    async fn access_follows_chain() {
        let (svc, _) = service();
        let owner = user::spec::with_role(user::Role::Landlord);
        let property = property::spec::owned_by(owner.id);
        let unit = unit::spec::vacant(property.id);
        let (reporter, craftsman) = (user::Id::new(), user::Id::new());
        let mut meldung = meldung::spec::filed(unit.id, reporter);
        meldung.assigned_to = Some(craftsman);
        svc.database().put(owner.clone());
        svc.database().put(property);
        svc.database().put(unit);
        svc.database().put(meldung.clone());

        let has_access = |user_id, role| {
            svc.execute(HasAccess {
                user_id,
                role,
                meldung_id: meldung.id,
            })
        };
        assert!(has_access(reporter, user::Role::Tenant).await.unwrap());
        assert!(has_access(craftsman, user::Role::Craftsman).await.unwrap());
        assert!(has_access(owner.id, user::Role::Landlord).await.unwrap());
        assert!(!has_access(user::Id::new(), user::Role::Tenant)
            .await
            .unwrap());
        assert!(!has_access(user::Id::new(), user::Role::Craftsman)
            .await
            .unwrap());

        let unknown = svc
            .execute(HasAccess {
                user_id: owner.id,
                role: user::Role::Landlord,
                meldung_id: meldung::Id::new(),
            })
            .await
            .unwrap();
        assert!(!unknown, "missing `Meldung` denies access");
    }

    #[tokio::test]
    async fn broken_chain_denies_access() {
        let (svc, _) = service();
        let reporter = user::Id::new();
        let meldung = meldung::spec::filed(unit::Id::new(), reporter);
        svc.database().put(meldung.clone());

        let granted = svc
            .execute(HasAccess {
                user_id: reporter,
                role: user::Role::Tenant,
                meldung_id: meldung.id,
            })
            .await
            .unwrap();
        assert!(!granted);

        let err = svc
            .execute(Thread {
                user_id: reporter,
                role: user::Role::Tenant,
                meldung_id: meldung.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Forbidden(_)));
    }

    #[tokio::test]
    async fn lists_by_role() {
        let (svc, _) = service();
        let owner = user::spec::with_role(user::Role::Landlord);
        let property = property::spec::owned_by(owner.id);
        let unit = unit::spec::vacant(property.id);
        let (reporter, craftsman) = (user::Id::new(), user::Id::new());
        let mut assigned = meldung::spec::filed(unit.id, reporter);
        assigned.assigned_to = Some(craftsman);
        let other = meldung::spec::filed(unit.id, user::Id::new());
        svc.database().put(property);
        svc.database().put(unit);
        svc.database().put(assigned.clone());
        svc.database().put(other);

        let svc = &svc;
        let ids = |user_id, role| async move {
            svc.execute(List { user_id, role })
                .await
                .unwrap()
                .into_iter()
                .map(|m| m.id)
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(owner.id, user::Role::Landlord).await.len(), 2);
        assert_eq!(ids(reporter, user::Role::Tenant).await, [assigned.id]);
        assert_eq!(ids(craftsman, user::Role::Craftsman).await, [assigned.id]);
    }
}
