//! Core types and functionality for sigtree.
//!
//! This module is the foundation of sigtree's type system: the error
//! taxonomy that separates fatal configuration mistakes from recoverable
//! data conditions, and the user-friendly error reporting used by host
//! tools that embed the crate.
//!
//! # Error Management
//!
//! sigtree distinguishes two failure classes:
//! - **Configuration errors** ([`SigtreeError`]) — invalid cache sizes,
//!   unknown presets, divergent shared-instance reconfiguration. These are
//!   fatal and raised at construction time only.
//! - **Data conditions** — signatures that cannot be classified and
//!   references that cannot be resolved. These are never errors: they are
//!   carried as flags on the produced values so a documentation run keeps
//!   going and the rendering layer can show "unknown type" or "broken
//!   reference" in place.
//!
//! # Examples
//!
//! ```rust
//! use sigtree::core::{SigtreeError, user_friendly_error};
//!
//! fn configure() -> anyhow::Result<()> {
//!     Err(SigtreeError::UnknownPreset { name: "warp".to_string() }.into())
//! }
//!
//! if let Err(e) = configure() {
//!     let friendly = user_friendly_error(e);
//!     friendly.display(); // colored error with a suggestion
//! }
//! ```

pub mod error;

pub use error::{ErrorContext, SigtreeError, user_friendly_error};
