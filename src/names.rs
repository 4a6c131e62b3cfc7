// Name resolution: maps the name variants humans actually type to stable
// participant IDs.

use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;

/// Stable participant identifier. Kept as a string because it keys JSON
/// objects in the persisted snapshot.
pub type PlayerId = String;

/// Lookup table from normalized name variants to participant IDs.
///
/// Ephemeral: rebuilt on every sync, since membership is externally mutable.
pub type NameMap = HashMap<String, PlayerId>;

/// One member of the group, as reported by the transport collaborator.
#[derive(Debug, Clone)]
pub struct Member {
    pub id: u64,
    /// Per-group display name (may carry emoji or other decorations).
    pub display_name: String,
    /// Account handle.
    pub username: String,
    /// Optional secondary public name.
    pub global_name: Option<String>,
}

/// Strip decorations from a display name: NFKD-decompose, then keep only
/// alphanumeric characters plus space, hyphen, underscore, period, and comma.
/// Diacritics decompose into combining marks and fall out of the filter.
pub fn clean_name(name: &str) -> String {
    name.nfkd()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | ','))
        .collect()
}

/// Build the name lookup table for a membership list.
///
/// Up to four variants per member are inserted, all lower-cased and trimmed:
/// display name, account username, global name (when set), and the
/// de-decorated display name. When two members normalize to the same key the
/// later member silently wins; mention extraction in the parser runs before
/// fuzzy name lookup, so explicit ID references are never affected by
/// collisions.
pub fn build_name_map(members: &[Member]) -> NameMap {
    let mut map = NameMap::new();
    for member in members {
        let uid = member.id.to_string();
        map.insert(member.display_name.trim().to_lowercase(), uid.clone());
        map.insert(member.username.trim().to_lowercase(), uid.clone());
        if let Some(global) = &member.global_name {
            map.insert(global.trim().to_lowercase(), uid.clone());
        }
        let cleaned = clean_name(&member.display_name).trim().to_lowercase();
        if !cleaned.is_empty() {
            map.insert(cleaned, uid);
        }
    }
    map
}
