//! [`Tenant`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        tenant::{self, Invitation},
        user, Tenant,
    },
    infra::{
        database::{
            self,
            postgres::{Connection, Postgres},
        },
        Database,
    },
};

/// Columns of the `tenants` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, name, email, phone, property_id, unit_id, move_in, \
    invitation_token, invitation_expires_at, \
    user_id, is_active, created_at";

/// Decodes a [`Tenant`] from a `tenants` [`Row`].
fn from_row(row: &Row) -> Tenant {
    Tenant {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        property_id: row.get("property_id"),
        unit_id: row.get("unit_id"),
        move_in: row.get("move_in"),
        invitation: row
            .get::<_, Option<tenant::InvitationToken>>("invitation_token")
            .map(|token| Invitation {
                token,
                expires_at: row.get("invitation_expires_at"),
            }),
        user_id: row.get("user_id"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Tenant>, tenant::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Tenant>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Tenant>, tenant::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!("SELECT {COLUMNS} FROM tenants WHERE id = $1::UUID");
        Ok(self
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<'l, C> Database<Select<By<Option<Tenant>, &'l tenant::InvitationToken>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Tenant>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Tenant>, &'l tenant::InvitationToken>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM tenants \
             WHERE invitation_token = $1::VARCHAR \
             LIMIT 1",
        );
        Ok(self
            .query_opt(sql.as_str(), &[&token])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<'l, C> Database<Select<By<Vec<Tenant>, &'l user::Email>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Tenant>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Tenant>, &'l user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM tenants \
             WHERE email = $1::VARCHAR \
             ORDER BY created_at ASC",
        );
        Ok(self
            .query(sql.as_str(), &[&email])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Tenant>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Tenant>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(tenant): Insert<Tenant>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(tenant)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Tenant>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(tenant): Update<Tenant>,
    ) -> Result<Self::Ok, Self::Err> {
        let Tenant {
            id,
            name,
            email,
            phone,
            property_id,
            unit_id,
            move_in,
            invitation,
            user_id,
            is_active,
            created_at,
        } = tenant;
        let (token, expires_at) = invitation
            .map(|i| (Some(i.token), Some(i.expires_at)))
            .unwrap_or_default();

        const SQL: &str = "\
            INSERT INTO tenants (\
                id, name, email, phone, property_id, unit_id, move_in, \
                invitation_token, invitation_expires_at, \
                user_id, is_active, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, \
                $5::UUID, $6::UUID, $7::TIMESTAMPTZ, \
                $8::VARCHAR, $9::TIMESTAMPTZ, \
                $10::UUID, $11::BOOL, $12::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                email = EXCLUDED.email, \
                phone = EXCLUDED.phone, \
                unit_id = EXCLUDED.unit_id, \
                move_in = EXCLUDED.move_in, \
                invitation_token = EXCLUDED.invitation_token, \
                invitation_expires_at = EXCLUDED.invitation_expires_at, \
                user_id = EXCLUDED.user_id, \
                is_active = EXCLUDED.is_active";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &email,
                &phone,
                &property_id,
                &unit_id,
                &move_in,
                &token,
                &expires_at,
                &user_id,
                &is_active,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Delete<By<Tenant, tenant::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Tenant, tenant::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM tenants \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Tenant, tenant::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Tenant, tenant::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO tenants_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
