//! Opaque identifiers shared by chunks and modules
//!
//! Build tools emit ids either as integers or as names; both forms compare,
//! hash and serialize as the bare value.

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(untagged)]
        pub enum $name {
            Number(u64),
            Name(String),
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    Self::Number(n) => write!(f, "{}", n),
                    Self::Name(s) => f.write_str(s),
                }
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> Self {
                Self::Number(n)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::Name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::Name(s)
            }
        }
    };
}

pub(crate) use opaque_id;
