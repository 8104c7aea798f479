//! [`Meldung`]-related read definitions.

use crate::domain::{user, Meldung, Message, Property, Unit, User};

/// [`Meldung`] with its ownership chain resolved.
///
/// Any link may be missing (e.g. a [`Unit`] deleted after the [`Meldung`]
/// was filed).
#[derive(Clone, Debug, Default)]
pub struct Chain {
    /// The [`Meldung`] itself.
    pub meldung: Option<Meldung>,

    /// [`Unit`] the [`Meldung`] is filed against.
    pub unit: Option<Unit>,

    /// [`Property`] the [`Unit`] belongs to.
    pub property: Option<Property>,

    /// Landlord [`User`] owning the [`Property`].
    pub owner: Option<User>,
}

impl Chain {
    /// Indicates whether the provided [`User`] may access the [`Meldung`]
    /// thread.
    ///
    /// Access is denied whenever any link of this [`Chain`] is missing.
    /// Otherwise it's granted to the reporter, the assigned craftsman, the
    /// [`Property`] owner and anyone with the [`user::Role::Landlord`].
    #[must_use]
    pub fn grants(&self, user_id: user::Id, role: user::Role) -> bool {
        let (Some(meldung), Some(_), Some(property), Some(owner)) =
            (&self.meldung, &self.unit, &self.property, &self.owner)
        else {
            return false;
        };

        // FIXME: Any landlord sees any `Meldung`, including the ones of
        //        properties owned by other landlords. Needs a product
        //        decision before being restricted to `owner.id`.
        let is_landlord = role == user::Role::Landlord;

        meldung.involves(user_id) || owner.id == user_id || is_landlord
    }

    /// Returns the [`Meldung`] only if the provided [`User`] may access it,
    /// see [`Chain::grants()`].
    #[must_use]
    pub fn granted_to(
        self,
        user_id: user::Id,
        role: user::Role,
    ) -> Option<Meldung> {
        self.grants(user_id, role).then_some(self.meldung).flatten()
    }
}

/// [`Meldung`] along with its [`Message`]s.
#[derive(Clone, Debug)]
pub struct Thread {
    /// The [`Meldung`] the [`Message`]s are about.
    pub meldung: Meldung,

    /// [`Message`]s in the order they were sent.
    pub messages: Vec<Message>,
}

pub mod list {
    //! [`Meldung`]s list definitions.

    use crate::domain::user;
    #[cfg(doc)]
    use crate::domain::{Meldung, Property, User};

    /// Selector of the [`Meldung`]s visible to a [`User`], newest first.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum Selector {
        /// [`Meldung`]s filed by the tenant [`User`].
        Reporter(user::Id),

        /// [`Meldung`]s assigned to the craftsman [`User`].
        Assignee(user::Id),

        /// [`Meldung`]s of all the [`Property`]s owned by the landlord
        /// [`User`].
        Owner(user::Id),
    }

    impl Selector {
        /// Returns the [`Selector`] matching the provided [`user::Role`].
        #[must_use]
        pub const fn of(user_id: user::Id, role: user::Role) -> Self {
            match role {
                user::Role::Tenant => Self::Reporter(user_id),
                user::Role::Craftsman => Self::Assignee(user_id),
                user::Role::Landlord => Self::Owner(user_id),
            }
        }
    }
}
