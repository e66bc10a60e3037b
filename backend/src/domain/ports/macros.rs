//! Macro generating port error enums with snake_case constructors.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Constructor coverage through the crate's port errors.

    use rstest::rstest;

    use crate::domain::ports::{
        EnrichmentSourceError, HistoryRepositoryError, MeasurementRepositoryError,
    };

    #[rstest]
    fn owner_constructor_accepts_owned_and_borrowed_text() {
        let borrowed = MeasurementRepositoryError::owner_not_found("web test 3");
        let owned = MeasurementRepositoryError::owner_not_found(String::from("web test 3"));

        assert_eq!(borrowed, owned);
        assert_eq!(borrowed.to_string(), "measurement owner web test 3 not found");
    }

    #[rstest]
    #[case(
        MeasurementRepositoryError::connection("refused").to_string(),
        "measurement repository connection failed: refused"
    )]
    #[case(
        HistoryRepositoryError::query("timeout").to_string(),
        "history repository query failed: timeout"
    )]
    #[case(
        EnrichmentSourceError::query("bad mac").to_string(),
        "enrichment source query failed: bad mac"
    )]
    fn messages_follow_each_variant_template(#[case] rendered: String, #[case] expected: &str) {
        assert_eq!(rendered, expected);
    }

    #[rstest]
    fn variants_with_the_same_text_stay_distinct() {
        assert_ne!(
            MeasurementRepositoryError::connection("down"),
            MeasurementRepositoryError::query("down")
        );
    }
}
