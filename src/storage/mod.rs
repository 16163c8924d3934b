//! Upload directory access
//!
//! Everything that turns attacker-controlled names into filesystem paths lives
//! here, so the handlers never join paths themselves.

mod filename;
mod listing;
mod path;

pub use filename::{is_valid_filename, sanitize_filename, FilenameError};
pub use listing::{list_upload_dir, StoredFile};
pub use path::{ensure_within, safe_join, PathError};
