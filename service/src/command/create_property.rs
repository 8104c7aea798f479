//! [`Command`] for creating a new [`Property`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{property, user, Property, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Property`] owned by a landlord [`User`].
#[derive(Clone, Debug)]
pub struct CreateProperty {
    /// ID of the landlord [`User`] owning the new [`Property`].
    pub owner_id: user::Id,

    /// Name of the new [`Property`].
    pub name: property::Name,

    /// Address of the new [`Property`].
    pub address: property::Address,
}

impl<Db, Bill> Command<CreateProperty> for Service<Db, Bill>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Property>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Property;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateProperty,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateProperty {
            owner_id,
            name,
            address,
        } = cmd;

        let owner = self
            .database()
            .execute(Select(By::new(owner_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(owner_id))
            .map_err(tracerr::wrap!())?;
        if owner.role() != user::Role::Landlord {
            return Err(tracerr::new!(E::NotLandlord(owner_id)));
        }

        let property = Property {
            id: property::Id::new(),
            owner_id,
            name,
            address,
            created_at: DateTime::now().coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(property.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(property)
    }
}

/// Error of [`CreateProperty`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
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
}

#[cfg(test)]
mod spec {
    use crate::{
        domain::{property, user},
        spec::service,
        Command as _,
    };

    use super::{CreateProperty, ExecutionError};

    fn create(owner_id: user::Id) -> CreateProperty {
        let template = property::spec::owned_by(owner_id);
        CreateProperty {
            owner_id,
            name: template.name,
            address: template.address,
        }
    }

    #[tokio::test]
    async fn stores_property_of_landlord() {
        let (svc, _) = service();
        let landlord = user::spec::with_role(user::Role::Landlord);
        svc.database().put(landlord.clone());

        let property = svc.execute(create(landlord.id)).await.unwrap();

        let state = svc.database().committed();
        assert_eq!(state.properties[&property.id].owner_id, landlord.id);
    }

    #[tokio::test]
    async fn rejects_non_landlord() {
        let (svc, _) = service();
        let tenant = user::spec::with_role(user::Role::Tenant);
        svc.database().put(tenant.clone());

        let err = svc.execute(create(tenant.id)).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotLandlord(_)));
        assert!(svc.database().committed().properties.is_empty());
    }
}
