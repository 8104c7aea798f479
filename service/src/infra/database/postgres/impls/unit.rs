//! [`Unit`]-related [`Database`] implementations.

use common::operations::{By, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{property, tenant, unit, user, Unit},
    infra::{
        database::{
            self,
            postgres::{Connection, Postgres},
        },
        Database,
    },
    read,
};

/// Columns of the `units` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, property_id, label, floor, area, rent, status, \
    current_tenant, pending_tenant, lease_start, created_at";

/// Decodes a [`Unit`] from a `units` [`Row`].
fn from_row(row: &Row) -> Unit {
    Unit {
        id: row.get("id"),
        property_id: row.get("property_id"),
        label: row.get("label"),
        floor: row.get("floor"),
        area: row.get("area"),
        rent: row.get("rent"),
        status: row.get("status"),
        current_tenant: row.get("current_tenant"),
        pending_tenant: row.get("pending_tenant"),
        lease_start: row.get("lease_start"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Unit>, unit::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Unit>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Unit>, unit::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!("SELECT {COLUMNS} FROM units WHERE id = $1::UUID");
        Ok(self
            .query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Option<Unit>, tenant::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Unit>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Unit>, tenant::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let tenant_id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM units \
             WHERE pending_tenant = $1::UUID \
             LIMIT 1",
        );
        Ok(self
            .query_opt(sql.as_str(), &[&tenant_id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Unit>, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Unit>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Unit>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let property_id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM units \
             WHERE property_id = $1::UUID \
             ORDER BY label ASC",
        );
        Ok(self
            .query(sql.as_str(), &[&property_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Unit>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Unit>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(unit): Insert<Unit>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(unit)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Unit>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(unit): Update<Unit>,
    ) -> Result<Self::Ok, Self::Err> {
        let Unit {
            id,
            property_id,
            label,
            floor,
            area,
            rent,
            status,
            current_tenant,
            pending_tenant,
            lease_start,
            created_at,
        } = unit;

        const SQL: &str = "\
            INSERT INTO units (\
                id, property_id, label, floor, area, rent, status, \
                current_tenant, pending_tenant, lease_start, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, $4::INT2, $5::NUMERIC, \
                $6::VARCHAR, $7::INT2, \
                $8::UUID, $9::UUID, $10::TIMESTAMPTZ, $11::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET label = EXCLUDED.label, \
                floor = EXCLUDED.floor, \
                area = EXCLUDED.area, \
                rent = EXCLUDED.rent, \
                status = EXCLUDED.status, \
                current_tenant = EXCLUDED.current_tenant, \
                pending_tenant = EXCLUDED.pending_tenant, \
                lease_start = EXCLUDED.lease_start";
        self.exec(
            SQL,
            &[
                &id,
                &property_id,
                &label,
                &floor,
                &area,
                &rent,
                &status,
                &current_tenant,
                &pending_tenant,
                &lease_start,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Unit, unit::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Unit, unit::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO units_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<read::unit::OwnedCount, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = read::unit::OwnedCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::unit::OwnedCount, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let owner_id = by.into_inner();

        const SQL: &str = "\
            SELECT COUNT(*) AS count \
            FROM units AS u \
            INNER JOIN properties AS p ON p.id = u.property_id \
            WHERE p.owner_id = $1::UUID";
        let rows = self
            .query(SQL, &[&owner_id])
            .await
            .map_err(tracerr::wrap!())?;
        Ok(rows.first().map(super::count).unwrap_or_default().into())
    }
}
