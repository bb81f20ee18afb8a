//! Hidden-entry predicate.

use std::ffi::OsStr;

/// Leading character that marks an entry as hidden.
pub const HIDDEN_MARKER: char = '.';

/// Predicate over a final name component.
pub type HiddenPredicate = fn(&OsStr) -> bool;

/// Check whether a name starts with [`HIDDEN_MARKER`].
///
/// Applies to files and directories alike.
pub fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with(HIDDEN_MARKER)
}
