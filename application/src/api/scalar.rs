//! GraphQL scalar definitions.

use std::{fmt, marker::PhantomData, str::FromStr};

use juniper::{
    GraphQLType, InputValue, ParseScalarResult, ParseScalarValue, ScalarToken,
    ScalarValue, Value,
};

/// Helper type to use in `#[graphql(with = ..)]` attribute.
///
/// Uses [`FromStr`]/[`Display`] impls of `As` type to convert the target type
/// to/from GraphQL scalar.
///
/// Target type must implement [`TryFrom`] and [`AsRef`] for `As` type.
///
/// [`Display`]: fmt::Display
#[derive(Debug)]
pub struct Via<As>(PhantomData<As>);

impl<As> Via<As> {
    /// Convert the target type into scalar [`Value`] by using [`Display`] impl
    /// of `As` type.
    ///
    /// [`Display`]: fmt::Display
    pub fn to_output<T, S>(value: &T) -> Value<S>
    where
        As: fmt::Display,
        T: AsRef<As>,
        S: ScalarValue,
    {
        Value::from(value.as_ref().to_string())
    }

    /// Constructs the target type from scalar [`Value`] by using [`FromStr`]
    /// impl of `As` type.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the input value is not a string;
    /// - the input value cannot be parsed into `As` type;
    /// - the parsed value cannot be converted into the target type.
    pub fn from_input<T, S>(input: &InputValue<S>) -> Result<T, String>
    where
        As: FromStr + fmt::Display,
        As::Err: fmt::Display,
        T: TryFrom<As> + GraphQLType<S, TypeInfo = ()>,
        T::Error: fmt::Display,
        S: ScalarValue,
    {
        let s = input.as_string_value().ok_or_else(|| {
            format!(
                "Cannot parse input scalar `{}`: expected string input \
                 value, found: {input}",
                Self::name_of::<T, S>(),
            )
        })?;
        s.parse::<As>()
            .map_err(|e| {
                format!(
                    "Cannot parse input scalar `{}` from \"{s}\" string: {e}",
                    Self::name_of::<T, S>(),
                )
            })?
            .try_into()
            .map_err(|e| {
                format!(
                    "Cannot parse input scalar `{}`: {e}",
                    Self::name_of::<T, S>(),
                )
            })
    }

    /// Returns the GraphQL name of the target type.
    fn name_of<T, S>() -> &'static str
    where
        T: GraphQLType<S, TypeInfo = ()>,
        S: ScalarValue,
    {
        T::name(&()).unwrap_or("<unnamed>")
    }

    /// Parse the provided [`ScalarToken`].
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be parsed as [`String`].
    pub fn parse_token<S: ScalarValue>(
        value: ScalarToken<'_>,
    ) -> ParseScalarResult<S> {
        <String as ParseScalarValue<S>>::from_str(value)
    }
}

#[cfg(test)]
mod spec {
    use juniper::{DefaultScalarValue, InputValue};
    use service::domain;

    use crate::api;

    use super::Via;

    type EmailVia = Via<domain::user::Email>;

    #[test]
    fn parses_valid_string() {
        let input = InputValue::<DefaultScalarValue>::scalar("mia@example.org");

        let email: api::user::Email = EmailVia::from_input(&input).unwrap();

        assert_eq!(email.to_string(), "mia@example.org");
    }

    #[test]
    fn names_scalar_on_failure() {
        let input = InputValue::<DefaultScalarValue>::scalar("kein-at");
        let err = EmailVia::from_input::<api::user::Email, _>(&input)
            .unwrap_err();
        assert!(err.contains("`UserEmail`"), "{err}");

        let input = InputValue::<DefaultScalarValue>::scalar(7);
        let err = EmailVia::from_input::<api::user::Email, _>(&input)
            .unwrap_err();
        assert!(err.contains("expected string"), "{err}");
    }
}
