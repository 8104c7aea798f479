//! [`Command`] for moving a tenant [`User`] into another [`Unit`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{property, tenant, unit, user, Property, Tenant, Unit, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for moving a tenant [`User`] into a [`Unit`] of a
/// [`Property`] owned by the landlord.
///
/// Keeps a single tenant per [`Unit`]:
/// - the previous [`Unit`] of the tenant is vacated, if it still points at
///   the tenant;
/// - a different tenant living in the destination [`Unit`] is evicted;
/// - a pending invitation of the destination [`Unit`] is dropped.
#[derive(Clone, Copy, Debug)]
pub struct ReassignTenant {
    /// ID of the landlord [`User`] owning the destination [`Unit`].
    pub landlord_id: user::Id,

    /// ID of the tenant [`User`] to be moved.
    pub tenant_user_id: user::Id,

    /// ID of the destination [`Unit`].
    pub unit_id: unit::Id,
}

impl<Db, Bill> Command<ReassignTenant> for Service<Db, Bill>
where
    Db: Database<
            Select<By<Option<Unit>, unit::Id>>,
            Ok = Option<Unit>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
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
        > + Database<
            Lock<By<Unit, unit::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Unit>, unit::Id>>,
            Ok = Option<Unit>,
            Err = Traced<database::Error>,
        > + Database<
            Delete<By<Tenant, tenant::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Update<Unit>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Unit;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ReassignTenant,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ReassignTenant {
            landlord_id,
            tenant_user_id,
            unit_id,
        } = cmd;

        let property_id = self
            .database()
            .execute(Select(By::<Option<Unit>, _>::new(unit_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UnitNotExists(unit_id))
            .map_err(tracerr::wrap!())?
            .property_id;
        let owned = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .is_some_and(|p| p.owner_id == landlord_id);
        if !owned {
            return Err(tracerr::new!(E::NotOwner(property_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `User` and `Unit`s.
        tx.execute(Lock(By::<User, _>::new(tenant_user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(tenant_user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(tenant_user_id))
            .map_err(tracerr::wrap!())?;
        if user.role() != user::Role::Tenant {
            return Err(tracerr::new!(E::NotTenant(tenant_user_id)));
        }
        let previous_id = user.assigned_unit().filter(|id| *id != unit_id);

        for id in lock_order(unit_id, previous_id) {
            tx.execute(Lock(By::<Unit, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }

        let mut unit = tx
            .execute(Select(By::<Option<Unit>, _>::new(unit_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UnitNotExists(unit_id))
            .map_err(tracerr::wrap!())?;

        if let Some(previous_id) = previous_id {
            let previous = tx
                .execute(Select(By::<Option<Unit>, _>::new(previous_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .filter(|u| u.current_tenant == Some(user.id));
            if let Some(mut previous) = previous {
                previous.vacate();
                tx.execute(Update(previous))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
            }
        }

        if let Some(pending_id) = unit.pending_tenant {
            log::debug!(
                "dropping `Tenant(id: {pending_id})` invitation of \
                 `Unit(id: {unit_id})`",
            );
            tx.execute(Delete(By::new(pending_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            unit.clear_pending();
        }

        if let Some(evicted_id) = unit.occupy(user.id) {
            tx.execute(Lock(By::<User, _>::new(evicted_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            let evicted = tx
                .execute(Select(By::<Option<User>, _>::new(evicted_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .filter(|u| u.assigned_unit() == Some(unit_id));
            if let Some(mut evicted) = evicted {
                evicted.profile = user::Profile::Tenant {
                    assigned_unit: None,
                };
                tx.execute(Update(evicted))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?;
            }
        }

        user.profile = user::Profile::Tenant {
            assigned_unit: Some(unit_id),
        };
        tx.execute(Update(user))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Update(unit.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(unit)
    }
}

/// Returns the [`Unit`]s to be locked in ascending ID order, so crossing
/// reassignments never wait on each other's locks.
fn lock_order(
    unit_id: unit::Id,
    previous_id: Option<unit::Id>,
) -> Vec<unit::Id> {
    let mut ids: Vec<_> = previous_id.into_iter().chain([unit_id]).collect();
    ids.sort_unstable();
    ids
}

/// Error of [`ReassignTenant`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Unit`] doesn't exist.
    #[display("`Unit(id: {_0})` does not exist")]
    #[from(ignore)]
    UnitNotExists(#[error(not(source))] unit::Id),

    /// [`Property`] of the [`Unit`] is not owned by the landlord.
    #[display("`Property(id: {_0})` is not owned by the landlord")]
    #[from(ignore)]
    NotOwner(#[error(not(source))] property::Id),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`User`] is not a tenant.
    #[display("`User(id: {_0})` is not a tenant")]
    #[from(ignore)]
    NotTenant(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::create_tenant::spec::{fixture, invitation},
        domain::{unit, user, Unit, User},
        Command as _,
    };

    use super::{lock_order, ExecutionError, ReassignTenant};

    fn living_in(unit: &mut Unit) -> User {
        let mut tenant = user::spec::with_role(user::Role::Tenant);
        tenant.profile = user::Profile::Tenant {
            assigned_unit: Some(unit.id),
        };
        _ = unit.occupy(tenant.id);
        tenant
    }

    #[tokio::test]
    async fn keeps_single_tenant_per_unit() {
        let (svc, _, property, mut from) = fixture();
        let mut to = unit::spec::vacant(property.id);
        let mover = living_in(&mut from);
        let evicted = living_in(&mut to);
        for u in [&from, &to] {
            svc.database().put(u.clone());
        }
        svc.database().put(mover.clone());
        svc.database().put(evicted.clone());

        let unit = svc
            .execute(ReassignTenant {
                landlord_id: property.owner_id,
                tenant_user_id: mover.id,
                unit_id: to.id,
            })
            .await
            .unwrap();
        assert_eq!(unit.current_tenant, Some(mover.id));

        let state = svc.database().committed();
        assert!(!state.units[&from.id].is_occupied());
        assert_eq!(state.units[&to.id].current_tenant, Some(mover.id));
        assert_eq!(state.units[&to.id].status, unit::Status::Occupied);
        assert_eq!(state.users[&mover.id].assigned_unit(), Some(to.id));
        assert_eq!(state.users[&evicted.id].assigned_unit(), None);
    }

    #[tokio::test]
    async fn drops_pending_invitation() {
        let (svc, _, property, unit) = fixture();
        let pending = svc
            .execute(invitation(&property, &unit, "jonas@example.org"))
            .await
            .unwrap();
        let mover = user::spec::with_role(user::Role::Tenant);
        svc.database().put(mover.clone());

        drop(
            svc.execute(ReassignTenant {
                landlord_id: property.owner_id,
                tenant_user_id: mover.id,
                unit_id: unit.id,
            })
            .await
            .unwrap(),
        );

        let state = svc.database().committed();
        assert!(!state.tenants.contains_key(&pending.id));
        assert_eq!(state.units[&unit.id].pending_tenant, None);
        assert_eq!(state.units[&unit.id].current_tenant, Some(mover.id));
    }

    #[tokio::test]
    async fn keeps_previous_unit_of_someone_else() {
        let (svc, _, property, mut from) = fixture();
        let to = unit::spec::vacant(property.id);
        let mut mover = user::spec::with_role(user::Role::Tenant);
        mover.profile = user::Profile::Tenant {
            assigned_unit: Some(from.id),
        };
        let resident = living_in(&mut from);
        svc.database().put(from.clone());
        svc.database().put(to.clone());
        svc.database().put(mover.clone());

        drop(
            svc.execute(ReassignTenant {
                landlord_id: property.owner_id,
                tenant_user_id: mover.id,
                unit_id: to.id,
            })
            .await
            .unwrap(),
        );

        let state = svc.database().committed();
        assert_eq!(state.units[&from.id].current_tenant, Some(resident.id));
    }

    #[tokio::test]
    async fn rejects_non_tenant() {
        let (svc, _, property, unit) = fixture();
        let craftsman = user::spec::with_role(user::Role::Craftsman);
        svc.database().put(craftsman.clone());

        let err = svc
            .execute(ReassignTenant {
                landlord_id: property.owner_id,
                tenant_user_id: craftsman.id,
                unit_id: unit.id,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotTenant(_)));
        assert_eq!(svc.database().committed().units[&unit.id], unit);
    }

    #[test]
    fn locks_units_in_same_order_both_ways() {
        let (a, b) = (unit::Id::new(), unit::Id::new());

        assert_eq!(lock_order(a, Some(b)), lock_order(b, Some(a)));
        assert!(lock_order(a, Some(b)).windows(2).all(|w| w[0] < w[1]));
        assert_eq!(lock_order(a, None), [a]);
    }

    #[tokio::test]
    async fn swaps_tenants_between_units() {
        let (svc, _, property, mut first) = fixture();
        let mut second = unit::spec::vacant(property.id);
        let anna = living_in(&mut first);
        let ben = living_in(&mut second);
        for u in [&first, &second] {
            svc.database().put(u.clone());
        }
        svc.database().put(anna.clone());
        svc.database().put(ben.clone());

        for (user, unit) in [(anna.id, second.id), (ben.id, first.id)] {
            drop(
                svc.execute(ReassignTenant {
                    landlord_id: property.owner_id,
                    tenant_user_id: user,
                    unit_id: unit,
                })
                .await
                .unwrap(),
            );
        }

        let state = svc.database().committed();
        assert_eq!(state.units[&first.id].current_tenant, Some(ben.id));
        assert_eq!(state.units[&second.id].current_tenant, Some(anna.id));
        assert_eq!(state.users[&anna.id].assigned_unit(), Some(second.id));
        assert_eq!(state.users[&ben.id].assigned_unit(), Some(first.id));
    }
}
