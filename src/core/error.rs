//! Error handling for sigtree.
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`SigtreeError`]) for precise handling in code
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions
//!    for the host tool's CLI surface
//!
//! Only misconfiguration is fatal in this crate. Failures arising from the
//! data being processed (an unclassifiable signature, an unresolvable
//! reference) are surfaced as flags on [`PropertyNode`](crate::decompose::PropertyNode)
//! and [`ResolvedSymbol`](crate::resolver::ResolvedSymbol) values instead of
//! errors, so a documentation run never aborts on unusual input shapes.
//!
//! # Examples
//!
//! ```rust
//! use sigtree::core::user_friendly_error;
//! use sigtree::cache::MemoizingCache;
//!
//! let result = MemoizingCache::<String, u64>::new(0, true);
//! match result {
//!     Ok(_) => unreachable!(),
//!     Err(e) => {
//!         let ctx = user_friendly_error(e);
//!         // Shows a colored error with a suggestion attached
//!         let message = format!("{ctx}");
//!         assert!(message.contains("cache"));
//!     }
//! }
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for sigtree operations.
///
/// Every variant belongs to one of two classes:
/// - **Configuration errors** ([`InvalidCacheSize`], [`InvalidMaxDepth`],
///   [`UnknownPreset`], [`SharedInstanceMismatch`]) — fatal, raised at
///   construction time only, and indicative of a programming error in the
///   caller rather than a data condition.
/// - **Key derivation** ([`KeyDerivation`]) — raised when a cache key cannot
///   be built from the canonical fields of an input. Propagated loudly
///   instead of degrading to an under-discriminating key, because a colliding
///   key makes the cache return a different entity's result.
///
/// [`InvalidCacheSize`]: SigtreeError::InvalidCacheSize
/// [`InvalidMaxDepth`]: SigtreeError::InvalidMaxDepth
/// [`UnknownPreset`]: SigtreeError::UnknownPreset
/// [`SharedInstanceMismatch`]: SigtreeError::SharedInstanceMismatch
/// [`KeyDerivation`]: SigtreeError::KeyDerivation
#[derive(Error, Debug)]
pub enum SigtreeError {
    /// A cache was constructed with a capacity of zero entries.
    ///
    /// There is no silent clamping: a zero-sized cache would evict every
    /// entry immediately and turn memoization into pure overhead.
    ///
    /// # Fields
    /// - `cache`: which cache the size applies to (e.g. "type", "reference")
    /// - `size`: the rejected size
    #[error("Invalid size for {cache} cache: {size} (must be at least 1)")]
    InvalidCacheSize {
        /// Which cache the size applies to (e.g. "type", "reference")
        cache: String,
        /// The rejected size
        size: usize,
    },

    /// A decomposer was configured with a maximum depth of zero.
    ///
    /// Depth zero would truncate every tree at its root, producing no
    /// property information at all.
    #[error("Invalid maximum decomposition depth: {depth} (must be at least 1)")]
    InvalidMaxDepth {
        /// The rejected depth
        depth: usize,
    },

    /// A configuration preset name did not match any known preset.
    ///
    /// # Fields
    /// - `name`: the unrecognized preset name
    #[error("Unknown cache configuration preset: {name}")]
    UnknownPreset {
        /// The unrecognized preset name
        name: String,
    },

    /// The shared coordinator was requested with options that differ from
    /// how it was first configured.
    ///
    /// Silently discarding the caller's requested configuration would
    /// produce cache behavior that diverges unnoticed from what the caller
    /// believes it configured, so the mismatch is fatal instead.
    #[error(
        "Shared cache coordinator is already configured differently; \
         construct an explicit CacheCoordinator instead"
    )]
    SharedInstanceMismatch,

    /// A cache key could not be derived from an input's canonical fields.
    ///
    /// # Fields
    /// - `reason`: which canonical field was missing or empty
    #[error("Cannot derive cache key: {reason}")]
    KeyDerivation {
        /// Which canonical field was missing or empty
        reason: String,
    },
}

impl SigtreeError {
    /// Whether this error belongs to the fatal configuration class.
    ///
    /// Configuration errors indicate a programming error and should abort
    /// the run; everything else is recoverable.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidCacheSize { .. }
                | Self::InvalidMaxDepth { .. }
                | Self::UnknownPreset { .. }
                | Self::SharedInstanceMismatch
        )
    }
}

/// Wrapper that pairs an error with a user-friendly suggestion and details.
///
/// Host tools embedding sigtree can display configuration failures with
/// actionable guidance instead of a bare error chain.
///
/// # Examples
///
/// ```rust
/// use sigtree::core::{ErrorContext, SigtreeError};
///
/// let error = SigtreeError::UnknownPreset { name: "huge".to_string() };
/// let context = ErrorContext::new(error.into())
///     .with_suggestion("Available presets: default, comprehensive, minimal, disabled");
///
/// let rendered = format!("{context}");
/// assert!(rendered.contains("huge"));
/// assert!(rendered.contains("Available presets"));
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: anyhow::Error,
    /// An actionable suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Additional details about the failure
    pub details: Option<String>,
}

impl ErrorContext {
    /// Creates a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: anyhow::Error) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attaches an actionable suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attaches additional details about the failure.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{} {}", "Error:".red().bold(), self.error);
        if let Some(details) = &self.details {
            eprintln!("  {} {details}", "Details:".yellow());
        }
        if let Some(suggestion) = &self.suggestion {
            eprintln!("  {} {suggestion}", "Suggestion:".green());
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }
        Ok(())
    }
}

/// Converts any error into an [`ErrorContext`] with contextual suggestions.
///
/// Known [`SigtreeError`] variants receive tailored suggestions; other
/// errors pass through unchanged.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let suggestion = match error.downcast_ref::<SigtreeError>() {
        Some(SigtreeError::InvalidCacheSize { cache, .. }) => Some(format!(
            "Configure the {cache} cache with a positive entry count, or disable it entirely"
        )),
        Some(SigtreeError::InvalidMaxDepth { .. }) => {
            Some("Use a maximum depth of at least 1 (the default is 10)".to_string())
        }
        Some(SigtreeError::UnknownPreset { .. }) => {
            Some("Available presets: default, comprehensive, minimal, disabled".to_string())
        }
        Some(SigtreeError::SharedInstanceMismatch) => Some(
            "Call CacheCoordinator::new to get an independently configured instance, \
             or request the shared instance with its original configuration"
                .to_string(),
        ),
        Some(SigtreeError::KeyDerivation { .. }) => {
            Some("Ensure the declaration reference carries a non-empty symbol path".to_string())
        }
        None => None,
    };

    let mut context = ErrorContext::new(error);
    if let Some(suggestion) = suggestion {
        context = context.with_suggestion(suggestion);
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_class_membership() {
        assert!(
            SigtreeError::InvalidCacheSize {
                cache: "type".to_string(),
                size: 0
            }
            .is_configuration()
        );
        assert!(SigtreeError::InvalidMaxDepth { depth: 0 }.is_configuration());
        assert!(
            SigtreeError::UnknownPreset {
                name: "x".to_string()
            }
            .is_configuration()
        );
        assert!(SigtreeError::SharedInstanceMismatch.is_configuration());

        assert!(
            !SigtreeError::KeyDerivation {
                reason: "empty symbol path".to_string()
            }
            .is_configuration()
        );
    }

    #[test]
    fn test_error_context_display_includes_all_parts() {
        let error = SigtreeError::InvalidCacheSize {
            cache: "reference".to_string(),
            size: 0,
        };
        let context = ErrorContext::new(error.into())
            .with_details("received from preset validation")
            .with_suggestion("use a positive size");

        let rendered = format!("{context}");
        assert!(rendered.contains("reference cache"));
        assert!(rendered.contains("Details: received from preset validation"));
        assert!(rendered.contains("Suggestion: use a positive size"));
    }

    #[test]
    fn test_user_friendly_error_attaches_preset_suggestion() {
        let error = SigtreeError::UnknownPreset {
            name: "gigantic".to_string(),
        };
        let context = user_friendly_error(error.into());

        let suggestion = context.suggestion.expect("suggestion should be attached");
        assert!(suggestion.contains("default"));
        assert!(suggestion.contains("disabled"));
    }

    #[test]
    fn test_user_friendly_error_passes_unknown_errors_through() {
        let context = user_friendly_error(anyhow::anyhow!("something else"));
        assert!(context.suggestion.is_none());
        assert_eq!(format!("{context}"), "something else");
    }

    #[test]
    fn test_error_messages_name_the_offending_value() {
        let error = SigtreeError::UnknownPreset {
            name: "warp".to_string(),
        };
        assert!(error.to_string().contains("warp"));

        let error = SigtreeError::KeyDerivation {
            reason: "symbol path is empty".to_string(),
        };
        assert!(error.to_string().contains("symbol path is empty"));
    }
}
