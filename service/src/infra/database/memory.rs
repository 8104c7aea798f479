//! In-memory transactional [`Database`] backing the [`Service`] tests.
//!
//! [`Transact`] snapshots the whole state and [`Commit`] publishes the
//! snapshot back, so an uncommitted transaction leaves no trace.
//!
//! [`Service`]: crate::Service

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use common::operations::{
    By, Commit, Delete, Insert, Lock, Select, Transact, Update,
};
use derive_more::{Display, Error};
use parking_lot::{Mutex, MutexGuard};
use tracerr::Traced;

use crate::{
    domain::{
        meldung, message, notification, property, tenant, unit,
        user::{self, password_reset, subscription},
        Meldung, Message, Notification, Property, Tenant, Unit, User,
    },
    infra::{database, Database},
    read,
};

/// Tables of the [`Memory`] database.
#[derive(Clone, Debug, Default)]
pub(crate) struct State {
    pub(crate) users: HashMap<user::Id, User>,
    pub(crate) properties: HashMap<property::Id, Property>,
    pub(crate) units: HashMap<unit::Id, Unit>,
    pub(crate) tenants: HashMap<tenant::Id, Tenant>,
    pub(crate) meldungen: HashMap<meldung::Id, Meldung>,
    pub(crate) messages: HashMap<message::Id, Message>,
    pub(crate) notifications: HashMap<notification::Id, Notification>,
}

/// Error injected with [`Memory::fail_on()`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("injected `{_0}` fault")]
pub(crate) struct Fault(#[error(not(source))] &'static str);

/// In-memory [`Database`].
#[derive(Clone, Debug, Default)]
pub(crate) struct Memory {
    /// Committed [`State`].
    committed: Arc<Mutex<State>>,

    /// [`State`] of the ongoing transaction, if any.
    staged: Option<Arc<Mutex<State>>>,

    /// Names of the operations failing with a [`Fault`].
    faults: Arc<Mutex<HashSet<&'static str>>>,
}

impl Memory {
    /// Makes the named operation (e.g. `Update<Unit>`) fail from now on.
    pub(crate) fn fail_on(&self, op: &'static str) {
        _ = self.faults.lock().insert(op);
    }

    /// Returns the [`State`] visible to this [`Memory`] handle.
    pub(crate) fn state(&self) -> MutexGuard<'_, State> {
        self.staged.as_ref().unwrap_or(&self.committed).lock()
    }

    /// Returns a copy of the committed [`State`].
    pub(crate) fn committed(&self) -> State {
        self.committed.lock().clone()
    }

    /// Stores the provided value directly into the committed [`State`].
    pub(crate) fn put<T: Stored>(&self, value: T) {
        value.store(&mut self.committed.lock());
    }

    /// Fails if the named operation has a [`Fault`] injected.
    fn check(&self, op: &'static str) -> Result<(), Traced<database::Error>> {
        if self.faults.lock().contains(op) {
            return Err(tracerr::new!(database::Error::from(Fault(op))));
        }
        Ok(())
    }
}

/// Value stored in a [`State`] table.
pub(crate) trait Stored {
    /// Puts this value into its [`State`] table, replacing the existing one.
    fn store(self, state: &mut State);
}

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        self.check("Transact")?;
        if self.staged.is_some() {
            return Ok(self.clone());
        }
        let snapshot = self.committed.lock().clone();
        Ok(Self {
            staged: Some(Arc::new(Mutex::new(snapshot))),
            ..self.clone()
        })
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.check("Commit")?;
        if let Some(staged) = &self.staged {
            *self.committed.lock() = staged.lock().clone();
        }
        Ok(())
    }
}

/// Implements the by-ID operations of an entity stored in a [`State`] table.
macro_rules! impl_entity {
    ($($ty:ident in $table:ident by $id:ty),* $(,)?) => {$(
        impl Stored for $ty {
            fn store(self, state: &mut State) {
                _ = state.$table.insert(self.id, self);
            }
        }

        impl Database<Select<By<Option<$ty>, $id>>> for Memory {
            type Ok = Option<$ty>;
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Select(by): Select<By<Option<$ty>, $id>>,
            ) -> Result<Self::Ok, Self::Err> {
                self.check(concat!("Select<", stringify!($ty), ">"))?;
                Ok(self.state().$table.get(by.as_inner()).cloned())
            }
        }

        impl Database<Insert<$ty>> for Memory {
            type Ok = ();
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Insert(value): Insert<$ty>,
            ) -> Result<Self::Ok, Self::Err> {
                self.check(concat!("Insert<", stringify!($ty), ">"))?;
                value.store(&mut self.state());
                Ok(())
            }
        }

        impl Database<Update<$ty>> for Memory {
            type Ok = ();
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Update(value): Update<$ty>,
            ) -> Result<Self::Ok, Self::Err> {
                self.check(concat!("Update<", stringify!($ty), ">"))?;
                value.store(&mut self.state());
                Ok(())
            }
        }

        impl Database<Lock<By<$ty, $id>>> for Memory {
            type Ok = ();
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                _: Lock<By<$ty, $id>>,
            ) -> Result<Self::Ok, Self::Err> {
                self.check(concat!("Lock<", stringify!($ty), ">"))
            }
        }
    )*};
}

impl_entity! {
    User in users by user::Id,
    Property in properties by property::Id,
    Unit in units by unit::Id,
    Tenant in tenants by tenant::Id,
    Meldung in meldungen by meldung::Id,
    Message in messages by message::Id,
    Notification in notifications by notification::Id,
}

impl Database<Select<By<HashMap<user::Id, User>, Vec<user::Id>>>> for Memory {
    type Ok = HashMap<user::Id, User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<user::Id, User>, Vec<user::Id>>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check("Select<User>")?;
        let state = self.state();
        Ok(by
            .into_inner()
            .into_iter()
            .filter_map(|id| state.users.get(&id).map(|u| (id, u.clone())))
            .collect())
    }
}

impl<'l> Database<Select<By<Option<User>, &'l user::Email>>> for Memory {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check("Select<User>")?;
        let email = by.into_inner();
        Ok(self
            .state()
            .users
            .values()
            .find(|u| u.email == *email)
            .cloned())
    }
}

impl<'l> Database<Select<By<Option<User>, &'l password_reset::TokenHash>>>
    for Memory
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l password_reset::TokenHash>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check("Select<User>")?;
        let hash = by.into_inner();
        Ok(self
            .state()
            .users
            .values()
            .find(|u| {
                u.password_reset
                    .as_ref()
                    .is_some_and(|r| r.token_hash == *hash)
            })
            .cloned())
    }
}

impl<'l> Database<Select<By<Option<User>, &'l subscription::ProviderId>>>
    for Memory
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'l subscription::ProviderId>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check("Select<User>")?;
        let id = by.into_inner();
        Ok(self
            .state()
            .users
            .values()
            .find(|u| u.subscription().is_some_and(|s| s.id == *id))
            .cloned())
    }
}

impl Database<Select<By<Vec<Property>, user::Id>>> for Memory {
    type Ok = Vec<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Property>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check("Select<Property>")?;
        let owner_id = by.into_inner();
        let mut properties = self
            .state()
            .properties
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect::<Vec<_>>();
        properties.sort_by_key(|p| p.created_at);
        Ok(properties)
    }
}

impl Database<Select<By<property::TotalUnits, property::Id>>> for Memory {
    type Ok = property::TotalUnits;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<property::TotalUnits, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check("Select<Unit>")?;
        let property_id = by.into_inner();
        let count = self
            .state()
            .units
            .values()
            .filter(|u| u.property_id == property_id)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX).into())
    }
}

impl Database<Select<By<read::unit::OwnedCount, user::Id>>> for Memory {
    type Ok = read::unit::OwnedCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::unit::OwnedCount, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check("Select<Unit>")?;
        let owner_id = by.into_inner();
        let state = self.state();
        let count = state
            .units
            .values()
            .filter(|u| {
                state
                    .properties
                    .get(&u.property_id)
                    .is_some_and(|p| p.owner_id == owner_id)
            })
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX).into())
    }
}

impl Database<Select<By<Option<Unit>, tenant::Id>>> for Memory {
    type Ok = Option<Unit>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Unit>, tenant::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check("Select<Unit>")?;
        let tenant_id = by.into_inner();
        Ok(self
            .state()
            .units
            .values()
            .find(|u| u.pending_tenant == Some(tenant_id))
            .cloned())
    }
}

impl Database<Select<By<Vec<Unit>, property::Id>>> for Memory {
    type Ok = Vec<Unit>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Unit>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check("Select<Unit>")?;
        let property_id = by.into_inner();
        let mut units = self
            .state()
            .units
            .values()
            .filter(|u| u.property_id == property_id)
            .cloned()
            .collect::<Vec<_>>();
        units.sort_by(|a, b| a.label.to_string().cmp(&b.label.to_string()));
        Ok(units)
    }
}

impl<'l> Database<Select<By<Option<Tenant>, &'l tenant::InvitationToken>>>
    for Memory
{
    type Ok = Option<Tenant>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Tenant>, &'l tenant::InvitationToken>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check("Select<Tenant>")?;
        let token = by.into_inner();
        Ok(self
            .state()
            .tenants
            .values()
            .find(|t| t.invitation.as_ref().is_some_and(|i| i.token == *token))
            .cloned())
    }
}

impl<'l> Database<Select<By<Vec<Tenant>, &'l user::Email>>> for Memory {
    type Ok = Vec<Tenant>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Tenant>, &'l user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check("Select<Tenant>")?;
        let email = by.into_inner();
        Ok(self
            .state()
            .tenants
            .values()
            .filter(|t| t.email == *email)
            .cloned()
            .collect())
    }
}

impl Database<Delete<By<Tenant, tenant::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Tenant, tenant::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check("Delete<Tenant>")?;
        _ = self.state().tenants.remove(by.as_inner());
        Ok(())
    }
}

impl Database<Select<By<read::meldung::Chain, meldung::Id>>> for Memory {
    type Ok = read::meldung::Chain;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::meldung::Chain, meldung::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check("Select<Meldung>")?;
        let state = self.state();
        let meldung = state.meldungen.get(by.as_inner()).cloned();
        let unit = meldung
            .as_ref()
            .and_then(|m| state.units.get(&m.unit_id))
            .cloned();
        let property = unit
            .as_ref()
            .and_then(|u| state.properties.get(&u.property_id))
            .cloned();
        let owner = property
            .as_ref()
            .and_then(|p| state.users.get(&p.owner_id))
            .cloned();
        Ok(read::meldung::Chain {
            meldung,
            unit,
            property,
            owner,
        })
    }
}

impl Database<Select<By<Vec<Meldung>, read::meldung::list::Selector>>>
    for Memory
{
    type Ok = Vec<Meldung>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Meldung>, read::meldung::list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        use read::meldung::list::Selector as S;

        self.check("Select<Meldung>")?;
        let state = self.state();
        let selector = by.into_inner();
        let mut meldungen = state
            .meldungen
            .values()
            .filter(|m| match selector {
                S::Reporter(id) => m.reporter_id == id,
                S::Assignee(id) => m.assigned_to == Some(id),
                S::Owner(id) => state
                    .units
                    .get(&m.unit_id)
                    .and_then(|u| state.properties.get(&u.property_id))
                    .is_some_and(|p| p.owner_id == id),
            })
            .cloned()
            .collect::<Vec<_>>();
        meldungen.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(meldungen)
    }
}

impl Database<Select<By<Vec<Message>, meldung::Id>>> for Memory {
    type Ok = Vec<Message>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Message>, meldung::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check("Select<Message>")?;
        let meldung_id = by.into_inner();
        let mut messages = self
            .state()
            .messages
            .values()
            .filter(|m| m.meldung_id == meldung_id)
            .cloned()
            .collect::<Vec<_>>();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}

impl Database<Select<By<Vec<Notification>, property::Id>>> for Memory {
    type Ok = Vec<Notification>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Notification>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.check("Select<Notification>")?;
        let property_id = by.into_inner();
        let mut notifications = self
            .state()
            .notifications
            .values()
            .filter(|n| n.property_id == property_id)
            .cloned()
            .collect::<Vec<_>>();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Commit, Insert, Select, Transact};

    use crate::{
        domain::{property, unit, Unit},
        infra::Database as _,
    };

    use super::Memory;

    #[tokio::test]
    async fn uncommitted_changes_are_invisible() {
        let db = Memory::default();
        let unit = unit::spec::vacant(property::Id::new());

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(unit.clone())).await.unwrap();

        let found = db
            .execute(Select(By::<Option<Unit>, _>::new(unit.id)))
            .await
            .unwrap();
        assert!(found.is_none());

        tx.execute(Commit).await.unwrap();
        let found = db
            .execute(Select(By::<Option<Unit>, _>::new(unit.id)))
            .await
            .unwrap();
        assert_eq!(found, Some(unit));
    }

    #[tokio::test]
    async fn injects_faults() {
        let db = Memory::default();
        db.fail_on("Insert<Unit>");

        let res = db
            .execute(Insert(unit::spec::vacant(property::Id::new())))
            .await;

        assert!(res.is_err());
        assert!(db.committed().units.is_empty());
    }
}
