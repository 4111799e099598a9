//! Newtype IDs for type-safe entity references.
//!
//! Every table in FreshCart uses a `SERIAL` primary key. The `define_id!` macro
//! wraps those integers so a `ProductId` can never be passed where a `CartItemId`
//! is expected, which matters in the cart and order code where several ids are
//! in flight at once.

/// Error returned when an ID cannot be parsed from a string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid id: {0}")]
pub struct ParseIdError(pub String);

/// Define a type-safe ID wrapper around `i32`.
///
/// The generated type has:
/// - `Serialize`/`Deserialize` as a bare integer
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `new()`, `as_i32()`, `Display`, `FromStr`
/// - `From<i32>` / `Into<i32>`
/// - `sqlx` `Type`, `Encode`, and `Decode` (with the `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use freshcart_core::define_id;
/// define_id!(ShelfId);
///
/// let shelf: ShelfId = "42".parse().unwrap();
/// assert_eq!(shelf.as_i32(), 42);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create an ID from its database value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// The database value of this ID.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::id::ParseIdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim()
                    .parse::<i32>()
                    .map(Self)
                    .map_err(|_| $crate::types::id::ParseIdError(s.to_owned()))
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(UserId);
define_id!(CategoryId);
define_id!(ProductId);
define_id!(CartId);
define_id!(CartItemId);
define_id!(OrderId);
define_id!(OrderItemId);
define_id!(WishlistItemId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id: ProductId = "17".parse().unwrap();
        assert_eq!(id, ProductId::new(17));
        assert_eq!(" 3 ".parse::<OrderId>().unwrap().as_i32(), 3);
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!("abc".parse::<CartItemId>().is_err());
        assert!("".parse::<UserId>().is_err());
    }

    #[test]
    fn test_id_serializes_as_integer() {
        let json = serde_json::to_string(&CategoryId::new(9)).unwrap();
        assert_eq!(json, "9");
        let back: CategoryId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_i32(), 9);
    }
}
