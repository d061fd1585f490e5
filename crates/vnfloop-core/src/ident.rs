macro_rules! identifier {
    ($name: ident, $inner: ty) => {
        #[allow(missing_docs)]
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Display,
            derive_more::FromStr,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Creates a new ID.
            pub const fn new(val: $inner) -> Self {
                Self(val)
            }

            /// Returns the inner representation of the ID.
            pub const fn inner(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            fn from(val: $inner) -> Self {
                Self::new(val)
            }
        }
    };
}
