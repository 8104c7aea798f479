//! [`User`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        user::{
            self, password_reset, subscription, PasswordReset, Profile,
            Subscription,
        },
        User,
    },
    infra::{
        database::{
            self,
            postgres::{Connection, Postgres},
        },
        Database,
    },
};

/// Columns of the `users` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, name, email, password_hash, phone, role, \
    assigned_unit, specialization, rating, \
    subscription_id, subscription_status, subscription_quantity, \
    subscription_updated_at, \
    password_reset_hash, password_reset_expires_at, \
    created_at";

/// Decodes a [`User`] from a `users` [`Row`].
fn from_row(row: &Row) -> User {
    let profile = match row.get::<_, user::Role>("role") {
        user::Role::Landlord => Profile::Landlord {
            subscription: row
                .get::<_, Option<subscription::ProviderId>>("subscription_id")
                .map(|id| Subscription {
                    id,
                    status: row.get("subscription_status"),
                    quantity: u32::try_from(
                        row.get::<_, i32>("subscription_quantity"),
                    )
                    .unwrap_or_default(),
                    updated_at: row.get("subscription_updated_at"),
                }),
        },
        user::Role::Tenant => Profile::Tenant {
            assigned_unit: row.get("assigned_unit"),
        },
        user::Role::Craftsman => Profile::Craftsman {
            specialization: row.get("specialization"),
            rating: user::Rating::new(row.get("rating"))
                .unwrap_or(user::Rating::MIN),
        },
    };
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        phone: row.get("phone"),
        profile,
        password_reset: row
            .get::<_, Option<password_reset::TokenHash>>("password_reset_hash")
            .map(|token_hash| PasswordReset {
                token_hash,
                expires_at: row.get("password_reset_expires_at"),
            }),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<HashMap<user::Id, User>, Vec<user::Id>>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = HashMap<user::Id, User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<user::Id, User>, Vec<user::Id>>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM users \
             WHERE id = ANY($1::UUID[])",
        );
        Ok(self
            .query(sql.as_str(), &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                let user = from_row(row);
                (user.id, user)
            })
            .collect())
    }
}

/// Implements selecting a single [`User`] by the provided column.
macro_rules! impl_select_by {
    ($($(#[$lt:lifetime])? $by:ty => $column:literal),* $(,)?) => {$(
        impl<$($lt,)? C> Database<Select<By<Option<User>, $by>>>
            for Postgres<C>
        where
            C: Connection,
        {
            type Ok = Option<User>;
            type Err = Traced<database::Error>;

            async fn execute(
                &self,
                Select(by): Select<By<Option<User>, $by>>,
            ) -> Result<Self::Ok, Self::Err> {
                let value = by.into_inner();

                let sql = format!(
                    "SELECT {COLUMNS} \
                     FROM users \
                     WHERE {} = $1 \
                     LIMIT 1",
                    $column,
                );
                Ok(self
                    .query_opt(sql.as_str(), &[&value])
                    .await
                    .map_err(tracerr::wrap!())?
                    .as_ref()
                    .map(from_row))
            }
        }
    )*};
}

impl_select_by! {
    user::Id => "id",
    #['l] &'l user::Email => "email",
    #['l] &'l password_reset::TokenHash => "password_reset_hash",
    #['l] &'l subscription::ProviderId => "subscription_id",
}

impl<C> Database<Insert<User>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<User>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(user)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<User>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let role = user.role();
        let User {
            id,
            name,
            email,
            password_hash,
            phone,
            profile,
            password_reset,
            created_at,
        } = user;

        let (mut assigned_unit, mut specialization, mut rating) =
            (None, None, None);
        let mut subscription = None;
        match profile {
            Profile::Landlord { subscription: s } => subscription = s,
            Profile::Tenant { assigned_unit: u } => assigned_unit = u,
            Profile::Craftsman {
                specialization: s,
                rating: r,
            } => {
                specialization = Some(s);
                rating = Some(r.get());
            }
        }
        let (sub_id, sub_status, sub_quantity, sub_updated_at) = subscription
            .map(|s| {
                (
                    Some(s.id),
                    Some(s.status),
                    Some(i32::try_from(s.quantity).unwrap_or(i32::MAX)),
                    Some(s.updated_at),
                )
            })
            .unwrap_or_default();
        let (reset_hash, reset_expires_at) = password_reset
            .map(|r| (Some(r.token_hash), Some(r.expires_at)))
            .unwrap_or_default();

        const SQL: &str = "\
            INSERT INTO users (\
                id, name, email, password_hash, phone, role, \
                assigned_unit, specialization, rating, \
                subscription_id, subscription_status, subscription_quantity, \
                subscription_updated_at, \
                password_reset_hash, password_reset_expires_at, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::VARCHAR, \
                $5::VARCHAR, $6::INT2, \
                $7::UUID, $8::VARCHAR, $9::REAL, \
                $10::VARCHAR, $11::INT2, $12::INT4, \
                $13::TIMESTAMPTZ, \
                $14::VARCHAR, $15::TIMESTAMPTZ, \
                $16::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                email = EXCLUDED.email, \
                password_hash = EXCLUDED.password_hash, \
                phone = EXCLUDED.phone, \
                role = EXCLUDED.role, \
                assigned_unit = EXCLUDED.assigned_unit, \
                specialization = EXCLUDED.specialization, \
                rating = EXCLUDED.rating, \
                subscription_id = EXCLUDED.subscription_id, \
                subscription_status = EXCLUDED.subscription_status, \
                subscription_quantity = EXCLUDED.subscription_quantity, \
                subscription_updated_at = EXCLUDED.subscription_updated_at, \
                password_reset_hash = EXCLUDED.password_reset_hash, \
                password_reset_expires_at = \
                    EXCLUDED.password_reset_expires_at";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &email,
                &password_hash,
                &phone,
                &role,
                &assigned_unit,
                &specialization,
                &rating,
                &sub_id,
                &sub_status,
                &sub_quantity,
                &sub_updated_at,
                &reset_hash,
                &reset_expires_at,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<User, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO users_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
