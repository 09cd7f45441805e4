//! Built-in configuration document kinds
//!
//! - `shared-session-config` (1.0, 2.0): session manager settings shared by
//!   the web modules of a deployment
//! - `subsystem` (1.0, 2.0, 3.0): the tracing subsystem
//!
//! Each kind declares its versions as a [`VersionedSchema`](crate::schema::VersionedSchema)
//! enum and provides one reader per version plus a writer for the latest.

/// Declares an enumerated attribute or text value with its XML spelling.
macro_rules! xml_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Accepted spellings, for error messages
            pub fn expected() -> String {
                format!("one of {}", [$($text),+].join(", "))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(other.to_string()),
                }
            }
        }
    };
}

pub mod opentracing;
pub mod shared_session;

pub use opentracing::OpenTracingSchema;
pub use shared_session::SharedSessionConfigSchema;
