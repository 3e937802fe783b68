//! Naming heuristics for remote profile container files.
//!
//! Given a configured share location and a resolved identity, produce
//! the glob patterns that may match the user's container files:
//!
//! - `<location>\<name>.<ext>` and `<location>\<SID>.<ext>` for every
//!   extension case variant;
//! - `<location>\<name>\*.vhd*` and `<location>\<SID>\*.vhd*`;
//! - the agent's default folder layouts `<location>\<SID>_<name>\*.vhd*`
//!   and `<location>\<name>_<SID>\*.vhd*`.
//!
//! These are guesses at site naming conventions. They can miss
//! containers named some other way, and the subfolder wildcards can match
//! unrelated disk images placed in a user's folder.

use std::collections::BTreeSet;
use std::path::MAIN_SEPARATOR_STR;

use glob::Pattern;

use crate::identity::{is_dots_only, ResolvedIdentity};

/// Container extensions, both formats in both cases.
pub const CONTAINER_EXTENSIONS: [&str; 4] = ["vhdx", "VHDX", "vhd", "VHD"];

/// File pattern used inside per-user subfolders.
pub const SUBFOLDER_PATTERN: &str = "*.vhd*";

/// Candidate glob patterns for `identity` under `location`.
///
/// Literal parts (location, name, SID) are escaped so only the wildcards
/// added here are active. Returns an empty set for a blank location.
pub fn candidates(location: &str, identity: &ResolvedIdentity) -> BTreeSet<String> {
    let mut out = BTreeSet::new();

    let root = location.trim().trim_end_matches(['\\', '/']);
    if root.is_empty() {
        return out;
    }
    let root = Pattern::escape(root);
    let sid = Pattern::escape(identity.sid.as_str());
    // A period-only stem would address the share's parent directory.
    let name = identity
        .account_name()
        .filter(|n| !is_dots_only(n))
        .map(Pattern::escape);

    let mut stems = vec![sid.clone()];
    stems.extend(name.clone());

    for stem in &stems {
        for ext in CONTAINER_EXTENSIONS {
            out.insert(join(&[&root, &format!("{stem}.{ext}")]));
        }
        out.insert(join(&[&root, stem, SUBFOLDER_PATTERN]));
    }

    if let Some(name) = &name {
        out.insert(join(&[&root, &format!("{sid}_{name}"), SUBFOLDER_PATTERN]));
        out.insert(join(&[&root, &format!("{name}_{sid}"), SUBFOLDER_PATTERN]));
    }

    out
}

fn join(parts: &[&str]) -> String {
    parts.join(MAIN_SEPARATOR_STR)
}
