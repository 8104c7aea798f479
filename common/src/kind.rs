//! Macros for defining kind enums.

/// Macro for defining a kind enum.
///
/// The enum is stored as `INT2` in Postgres and exposed as a string (via
/// [`strum`] and `serde`) everywhere else. The string case defaults to
/// `SCREAMING_SNAKE_CASE` and may be overridden with `#[serialize_all]`.
/// A single variant may be renamed with `#[rename]`.
///
/// # Example
///
/// ```rust
/// use common::define_kind;
///
/// define_kind! {
///     #[doc = "Priority of a ticket."]
///     #[serialize_all = "lowercase"]
///     enum Priority {
///         #[doc = "Can wait."]
///         Low = 1,
///
///         #[doc = "Cannot wait."]
///         #[rename = "ASAP"]
///         Urgent = 2,
///     }
/// }
/// ```
///
/// [`strum`]: crate::private::strum
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_kind {
    (
        #[doc = $doc:literal]
        enum $name:ident {
            $(
                #[doc = $variant_doc:literal]
                $( #[rename = $rename:literal] )?
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $crate::define_kind! {
            #[doc = $doc]
            #[serialize_all = "SCREAMING_SNAKE_CASE"]
            enum $name {
                $(
                    #[doc = $variant_doc]
                    $( #[rename = $rename] )?
                    $variant = $value,
                )*
            }
        }
    };

    (
        #[doc = $doc:literal]
        #[serialize_all = $case:literal]
        enum $name:ident {
            $(
                #[doc = $variant_doc:literal]
                $( #[rename = $rename:literal] )?
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            $crate::private::strum::Display,
            $crate::private::strum::EnumString,
            Eq,
            Hash,
            PartialEq,
        )]
        #[cfg_attr(
            feature = "serde",
            derive(
                $crate::private::serde::Deserialize,
                $crate::private::serde::Serialize,
            ),
            serde(rename_all = $case),
        )]
        #[doc = $doc]
        #[repr(u8)]
        #[strum(serialize_all = $case)]
        pub enum $name {
            $(
                #[doc = $variant_doc]
                $(
                    #[strum(serialize = $rename)]
                    #[cfg_attr(feature = "serde", serde(rename = $rename))]
                )?
                $variant = $value,
            )*
        }

        impl $name {
            /// Converts this into its [`u8`] representation.
            #[must_use]
            pub const fn u8(self) -> u8 {
                self as u8
            }

            /// Converts the provided [`u8`] representation back.
            ///
            /// [`None`] is returned if the value doesn't match any variant.
            #[must_use]
            pub const fn from_u8(v: u8) -> Option<Self> {
                $(
                    if v == Self::$variant.u8() {
                        return Some(Self::$variant);
                    }
                )*
                None
            }
        }

        $(
            impl $crate::FromParam<$value> for $name {
                const VALUE: $name = $name::$variant;
            }
        )*

        #[cfg(feature = "postgres")]
        impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
            $crate::private::postgres_types::accepts!(INT2);

            fn from_sql(
                ty: &$crate::private::postgres_types::Type,
                raw: &[u8],
            ) -> Result<
                $name,
                Box<dyn ::std::error::Error
                    + ::core::marker::Sync
                    + ::core::marker::Send>,
            > {
                let v = u8::try_from(i16::from_sql(ty, raw)?)?;
                Self::from_u8(v).ok_or_else(|| ::std::format!(
                    "invalid `{}` value: {v}",
                    ::core::stringify!($name),
                ).into())
            }
        }

        #[cfg(feature = "postgres")]
        impl $crate::private::postgres_types::ToSql for $name {
            $crate::private::postgres_types::accepts!(INT2);
            $crate::private::postgres_types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &$crate::private::postgres_types::Type,
                w: &mut $crate::private::postgres_types::private::BytesMut,
            ) -> Result<
                $crate::private::postgres_types::IsNull,
                ::std::boxed::Box<
                    dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send
                >,
            > {
                i16::from(self.u8()).to_sql(ty, w)
            }
        }
    };
}

/// Helper trait converting const parameter to a value.
pub trait FromParam<const PARAM: u8> {
    /// Value of the parameter.
    const VALUE: Self;
}
