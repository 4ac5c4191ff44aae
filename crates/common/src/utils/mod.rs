//! Common utility functions and helper macros
//!
//! - **[`macros`]**: name table conversions for fieldless enums
//! - **[`serde`]**: millisecond duration encodings for configuration files

#[macro_use]
pub mod macros;
pub mod serde;

pub use self::serde::optional_duration_millis;
