//! Declarative helpers shared across breakwater crates

/// Implements `Display` and `FromStr` for a fieldless enum from a table of
/// names
///
/// `Display` writes the mapped name. `FromStr` accepts the same names in any
/// case and reports unknown input with the enum's type name.
///
/// # Example
///
/// ```rust
/// use std::str::FromStr;
///
/// use breakwater_common::impl_status_conversions;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// pub enum Gate {
///     Open,
///     Shut,
/// }
///
/// impl_status_conversions!(Gate {
///     Open => "open",
///     Shut => "shut",
/// });
///
/// assert_eq!(Gate::Shut.to_string(), "shut");
/// assert_eq!(Gate::from_str("OPEN"), Ok(Gate::Open));
/// ```
#[macro_export]
macro_rules! impl_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
