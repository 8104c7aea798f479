//! [`Money`]-related definitions.

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;

use crate::define_kind;

/// Amount of money in some [`Currency`].
///
/// Textual form is `{amount}{currency}`, e.g. `750EUR` or `129.90EUR`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Money {
    /// Amount of this [`Money`].
    pub amount: Decimal,

    /// [`Currency`] of this amount.
    pub currency: Currency,
}

impl Money {
    /// Indicates whether the amount of this [`Money`] is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount.normalize(), self.currency)
    }
}

impl FromStr for Money {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() < 4 || !s.is_char_boundary(s.len() - 3) {
            return Err("too short");
        }

        let (amount, currency) = s.split_at(s.len() - 3);
        let amount = Decimal::from_str(amount.trim())
            .map_err(|_| "invalid amount")?;
        let currency = Currency::from_str(&currency.to_ascii_uppercase())
            .map_err(|_| "invalid currency")?;

        Ok(Self { amount, currency })
    }
}

define_kind! {
    #[doc = "Currency of a [`Money`] amount."]
    enum Currency {
        #[doc = "Euro."]
        Eur = 1,

        #[doc = "Swiss Franc."]
        Chf = 2,

        #[doc = "US Dollar."]
        Usd = 3,
    }
}

#[cfg(feature = "postgres")]
mod postgres {
    //! Module providing integration with [`postgres_types`] crate.
    //!
    //! [`Money`] is stored as its textual form in a `VARCHAR` column.

    use std::{error::Error as StdError, str::FromStr as _};

    use postgres_types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    };

    use super::Money;

    impl<'a> FromSql<'a> for Money {
        accepts!(VARCHAR, TEXT);

        fn from_sql(
            ty: &Type,
            raw: &'a [u8],
        ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
            let s = <&str>::from_sql(ty, raw)?;
            Money::from_str(s).map_err(Into::into)
        }
    }

    impl ToSql for Money {
        accepts!(VARCHAR, TEXT);
        to_sql_checked!();

        fn to_sql(
            &self,
            ty: &Type,
            w: &mut BytesMut,
        ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
            self.to_string().to_sql(ty, w)
        }
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Money in `{major}.{minor}{currency}` format, where:
    /// - `major` is an integer;
    /// - `minor` is an optional integer;
    /// - `currency` is a three-letter currency code (`EUR`, `CHF`, `USD`).
    #[graphql_scalar(with = Self, parse_token(String))]
    type Money = super::Money;

    impl Money {
        fn to_output<S: ScalarValue>(m: &Money) -> Value<S> {
            Value::scalar(m.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Money` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Money` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use rust_decimal::Decimal;

    use super::{Currency, Money};

    fn eur(s: &str) -> Money {
        Money {
            amount: s.parse::<Decimal>().unwrap(),
            currency: Currency::Eur,
        }
    }

    #[test]
    fn parses_rent_amounts() {
        assert_eq!(Money::from_str("750EUR").unwrap(), eur("750"));
        assert_eq!(Money::from_str("129.90EUR").unwrap(), eur("129.90"));
        assert_eq!(Money::from_str(" 129.90eur ").unwrap(), eur("129.90"));
        assert_eq!(
            Money::from_str("80CHF").unwrap().currency,
            Currency::Chf,
        );
    }

    #[test]
    fn rejects_malformed() {
        assert!(Money::from_str("750").is_err());
        assert!(Money::from_str("EUR").is_err());
        assert!(Money::from_str("abcEUR").is_err());
        assert!(Money::from_str("750Euro").is_err());
        assert!(Money::from_str("750GBP").is_err());
    }

    #[test]
    fn displays_without_trailing_zeros() {
        assert_eq!(eur("750.00").to_string(), "750EUR");
        assert_eq!(eur("129.90").to_string(), "129.9EUR");
        assert_eq!(eur("0.5").to_string(), "0.5EUR");
    }

    #[test]
    fn detects_negative_amounts() {
        assert!(eur("-1").is_negative());
        assert!(!eur("0").is_negative());
        assert!(!eur("12").is_negative());
    }
}
