//! [`Status`] of a [`Meldung`] and its transition rules.

use common::define_kind;
use derive_more::{Display, Error};

#[cfg(doc)]
use crate::domain::Meldung;
use crate::domain::user::Role;

define_kind! {
    #[doc = "Workflow status of a [`Meldung`]."]
    enum Status {
        #[doc = "Filed by the tenant, nobody works on it yet."]
        Offen = 1,

        #[doc = "Assigned craftsman works on it."]
        InBearbeitung = 2,

        #[doc = "Craftsman reports the work as done."]
        HandwerkerErledigt = 3,

        #[doc = "Tenant confirmed the resolution."]
        Abgeschlossen = 4,

        #[doc = "Cancelled."]
        Storniert = 5,
    }
}

impl Status {
    /// Initial [`Status`] of every [`Meldung`].
    pub const INITIAL: Self = Self::Offen;

    /// Indicates whether no further work happens in this [`Status`].
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Abgeschlossen | Self::Storniert)
    }

    /// Checks whether a user of the provided [`Role`] may move a [`Meldung`]
    /// from this [`Status`] into the `to` one.
    ///
    /// Craftsmen follow the work order strictly, tenants may only confirm a
    /// finished job.
    ///
    /// # Errors
    ///
    /// With [`InvalidTransition`] if the transition is not allowed.
    pub fn transition(
        self,
        role: Role,
        to: Self,
    ) -> Result<Self, InvalidTransition> {
        let allowed = match role {
            Role::Craftsman => matches!(
                (self, to),
                (Self::Offen, Self::InBearbeitung)
                    | (Self::InBearbeitung, Self::HandwerkerErledigt),
            ),
            Role::Tenant => matches!(
                (self, to),
                (Self::HandwerkerErledigt, Self::Abgeschlossen),
            ),
            // FIXME: Landlords update the status unguarded, cancellation
            //        included, until the product decides on a table for them.
            Role::Landlord => true,
        };
        if allowed {
            Ok(to)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }
}

/// Error of a [`Status`] transition not allowed by the workflow.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
#[display("`{from}` -> `{to}` transition is not allowed")]
pub struct InvalidTransition {
    /// [`Status`] the transition started from.
    pub from: Status,

    /// Rejected target [`Status`].
    pub to: Status,
}

/// Converts a stored status string into a [`Status`], accepting the legacy
/// lowercase spellings (`neu`, `in_bearbeitung`, `erledigt`, ...).
///
/// Applied when reading rows and importing data only. Every write stores the
/// canonical [`Status`] representation.
///
/// # Errors
///
/// If the string is neither a canonical nor a legacy [`Status`].
pub fn normalize(raw: &str) -> Result<Status, strum::ParseError> {
    let raw = raw.trim();
    match raw.to_ascii_lowercase().as_str() {
        "neu" => Ok(Status::Offen),
        "erledigt" => Ok(Status::HandwerkerErledigt),
        _ => raw.to_ascii_uppercase().parse(),
    }
}

#[cfg(test)]
mod spec {
    use crate::domain::user::Role;

    use super::{normalize, InvalidTransition, Status};

    const ALL: [Status; 5] = [
        Status::Offen,
        Status::InBearbeitung,
        Status::HandwerkerErledigt,
        Status::Abgeschlossen,
        Status::Storniert,
    ];

    #[test]
    fn craftsman_follows_strict_table() {
        for from in ALL {
            for to in ALL {
                let res = from.transition(Role::Craftsman, to);
                let allowed = matches!(
                    (from, to),
                    (Status::Offen, Status::InBearbeitung)
                        | (Status::InBearbeitung, Status::HandwerkerErledigt),
                );
                if allowed {
                    assert_eq!(res, Ok(to));
                } else {
                    assert_eq!(res, Err(InvalidTransition { from, to }));
                }
            }
        }
    }

    #[test]
    fn craftsman_cannot_skip_or_leave_done() {
        assert!(Status::Offen
            .transition(Role::Craftsman, Status::HandwerkerErledigt)
            .is_err());
        for to in ALL {
            assert!(Status::HandwerkerErledigt
                .transition(Role::Craftsman, to)
                .is_err());
        }
    }

    #[test]
    fn tenant_only_confirms_finished_work() {
        for from in ALL {
            for to in ALL {
                let res = from.transition(Role::Tenant, to);
                if from == Status::HandwerkerErledigt
                    && to == Status::Abgeschlossen
                {
                    assert!(res.is_ok());
                } else {
                    assert_eq!(res, Err(InvalidTransition { from, to }));
                }
            }
        }
    }

    #[test]
    fn landlord_is_unguarded() {
        for from in ALL {
            assert_eq!(
                from.transition(Role::Landlord, Status::Storniert),
                Ok(Status::Storniert),
            );
        }
    }

    #[test]
    fn normalizes_legacy_strings() {
        assert_eq!(normalize("neu"), Ok(Status::Offen));
        assert_eq!(normalize("in_bearbeitung"), Ok(Status::InBearbeitung));
        assert_eq!(normalize("Abgeschlossen"), Ok(Status::Abgeschlossen));
        assert_eq!(normalize("erledigt"), Ok(Status::HandwerkerErledigt));
        assert_eq!(normalize(" storniert "), Ok(Status::Storniert));
        assert_eq!(
            normalize("HANDWERKER_ERLEDIGT"),
            Ok(Status::HandwerkerErledigt),
        );
        assert!(normalize("unknown").is_err());
    }

    #[test]
    fn displays_canonical_names() {
        assert_eq!(Status::InBearbeitung.to_string(), "IN_BEARBEITUNG");
        assert_eq!(
            InvalidTransition {
                from: Status::Offen,
                to: Status::Abgeschlossen,
            }
            .to_string(),
            "`OFFEN` -> `ABGESCHLOSSEN` transition is not allowed",
        );
    }
}
