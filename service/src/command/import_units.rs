//! [`Command`] for importing [`Unit`]s from tabular rows.

use std::collections::HashMap;

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime, Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{property, unit, user, Property, Unit},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for importing [`Unit`]s into a [`Property`] from already split
/// rows (e.g. of a CSV file).
///
/// Recognized columns are `label` (required), `floor`, `area`, `rent` and
/// `status`. Rows missing the `label` or having a malformed value are
/// skipped.
#[derive(Clone, Debug)]
pub struct ImportUnits {
    /// ID of the landlord importing the [`Unit`]s.
    pub landlord_id: user::Id,

    /// ID of the [`Property`] the [`Unit`]s are imported into.
    pub property_id: property::Id,

    /// Rows to import, keyed by column names.
    pub rows: Vec<HashMap<String, String>>,
}

impl ImportUnits {
    /// Parses a single row into a new vacant or in-maintenance [`Unit`].
    ///
    /// [`unit::Status::Occupied`] cannot be imported without a tenant, so
    /// such rows become [`unit::Status::Vacant`].
    fn parse(
        property_id: property::Id,
        row: &HashMap<String, String>,
    ) -> Result<Unit, &'static str> {
        /// Returns the trimmed non-empty value of the named column.
        fn column<'r>(
            row: &'r HashMap<String, String>,
            name: &str,
        ) -> Option<&'r str> {
            row.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
        }

        let label = column(row, "label")
            .ok_or("missing `label`")?
            .parse::<unit::Label>()?;
        let floor = column(row, "floor")
            .map(str::parse::<unit::Floor>)
            .transpose()
            .map_err(|_| "invalid `floor`")?;
        let area = column(row, "area")
            .map(str::parse::<unit::Area>)
            .transpose()?;
        let rent = column(row, "rent")
            .map(str::parse::<Money>)
            .transpose()?
            .filter(|r| !r.is_negative());
        let status = match column(row, "status")
            .map(|s| s.to_ascii_lowercase().parse::<unit::Status>())
            .transpose()
            .map_err(|_| "invalid `status`")?
        {
            Some(unit::Status::Maintenance) => unit::Status::Maintenance,
            Some(unit::Status::Vacant | unit::Status::Occupied) | None => {
                unit::Status::Vacant
            }
        };

        Ok(Unit {
            id: unit::Id::new(),
            property_id,
            label,
            floor,
            area,
            rent,
            status,
            current_tenant: None,
            pending_tenant: None,
            lease_start: None,
            created_at: DateTime::now().coerce(),
        })
    }
}

impl<Db, Bill> Command<ImportUnits> for Service<Db, Bill>
where
    Db: Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Unit>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = usize;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: ImportUnits) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ImportUnits {
            landlord_id,
            property_id,
            rows,
        } = cmd;

        let property = self
            .database()
            .execute(Select(By::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())?;
        if property.owner_id != landlord_id {
            return Err(tracerr::new!(E::NotOwner(property_id)));
        }

        let units = rows
            .iter()
            .enumerate()
            .filter_map(|(n, row)| {
                ImportUnits::parse(property_id, row)
                    .map_err(|e| log::debug!("skipping row {n}: {e}"))
                    .ok()
            })
            .collect::<Vec<_>>();
        if units.is_empty() {
            return Ok(0);
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let count = units.len();
        for unit in units {
            tx.execute(Insert(unit))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "imported {count} of {} rows into `Property(id: {property_id})`",
            rows.len(),
        );
        Ok(count)
    }
}

/// Error of [`ImportUnits`] [`Command`] execution.
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
    #[display("`Property(id: {_0})` is not owned by the landlord")]
    #[from(ignore)]
    NotOwner(#[error(not(source))] property::Id),
}

#[cfg(test)]
mod spec {
    use std::collections::HashMap;

    use crate::{
        command::{CreateUnit, ImportUnits},
        domain::{property, unit, user},
        query,
        spec::service,
        Command as _, Query as _,
    };

    use super::ExecutionError;

    fn row(cells: &[(&str, &str)]) -> HashMap<String, String> {
        cells
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[tokio::test]
    async fn skips_malformed_rows() {
        let (svc, _) = service();
        let landlord = user::spec::with_role(user::Role::Landlord);
        let property = property::spec::owned_by(landlord.id);
        svc.database().put(property.clone());

        let count = svc
            .execute(ImportUnits {
                landlord_id: landlord.id,
                property_id: property.id,
                rows: vec![
                    row(&[("label", "WE 1"), ("floor", "0"), ("area", "54,5")]),
                    row(&[("floor", "1")]),
                    row(&[("label", "WE 2"), ("rent", "750EUR")]),
                    row(&[("label", "WE 3"), ("floor", "erster")]),
                    row(&[("label", "WE 4"), ("status", "occupied")]),
                    row(&[("label", "WE 5"), ("status", "Maintenance")]),
                ],
            })
            .await
            .unwrap();
        assert_eq!(count, 4);

        let units = svc.database().committed().units;
        let status = |label: &str| {
            units
                .values()
                .find(|u| u.label.to_string() == label)
                .map(|u| u.status)
        };
        assert_eq!(status("WE 4"), Some(unit::Status::Vacant));
        assert_eq!(status("WE 5"), Some(unit::Status::Maintenance));
        assert_eq!(status("WE 3"), None);
    }

    #[tokio::test]
    async fn total_units_is_derived() {
        let (svc, _) = service();
        let landlord = user::spec::with_role(user::Role::Landlord);
        let property = property::spec::owned_by(landlord.id);
        svc.database().put(property.clone());

        drop(
            svc.execute(ImportUnits {
                landlord_id: landlord.id,
                property_id: property.id,
                rows: vec![
                    row(&[("label", "WE 1")]),
                    row(&[("label", "WE 2")]),
                ],
            })
            .await
            .unwrap(),
        );
        drop(
            svc.execute(CreateUnit {
                landlord_id: landlord.id,
                property_id: property.id,
                label: unit::Label::new("WE 3").unwrap(),
                floor: Some(2),
                area: None,
                rent: None,
            })
            .await
            .unwrap(),
        );

        let total = svc
            .execute(query::property::TotalUnits::by(property.id))
            .await
            .unwrap();
        assert_eq!(u32::from(total), 3);
    }

    #[tokio::test]
    async fn rejects_foreign_property() {
        let (svc, _) = service();
        let property = property::spec::owned_by(user::Id::new());
        svc.database().put(property.clone());

        let err = svc
            .execute(ImportUnits {
                landlord_id: user::Id::new(),
                property_id: property.id,
                rows: vec![row(&[("label", "WE 1")])],
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotOwner(_)));
        assert!(svc.database().committed().units.is_empty());
    }
}
