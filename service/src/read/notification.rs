//! [`Notification`]-related read definitions.

#[cfg(doc)]
use crate::domain::Notification;
use crate::domain::{Property, Unit, User};

/// Indicates whether the [`Notification`]s of the provided [`Property`] are
/// shown to the provided [`User`].
///
/// They are shown to the owner and to the tenants currently living in one of
/// the [`Property`]'s [`Unit`]s, given as the `residence` of the [`User`].
#[must_use]
pub fn visible_to(
    property: &Property,
    user: &User,
    residence: Option<&Unit>,
) -> bool {
    property.owner_id == user.id
        || residence.is_some_and(|u| {
            u.property_id == property.id && u.current_tenant == Some(user.id)
        })
}

#[cfg(test)]
mod spec {
    use crate::domain::{property, unit, user};

    use super::visible_to;

    #[test]
    fn owner_and_residents_only() {
        let owner = user::spec::with_role(user::Role::Landlord);
        let property = property::spec::owned_by(owner.id);
        let tenant = user::spec::with_role(user::Role::Tenant);
        let mut home = unit::spec::vacant(property.id);
        _ = home.occupy(tenant.id);
        let mut elsewhere = unit::spec::vacant(property::Id::new());
        _ = elsewhere.occupy(tenant.id);

        assert!(visible_to(&property, &owner, None));
        assert!(visible_to(&property, &tenant, Some(&home)));
        assert!(!visible_to(&property, &tenant, Some(&elsewhere)));
        assert!(!visible_to(&property, &tenant, None));

        home.vacate();
        assert!(!visible_to(&property, &tenant, Some(&home)), "moved out");
    }
}
