// Persisted snapshot: cursor, chronological game history, and per-player
// aggregates, stored as a single JSON file.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::names::PlayerId;
use crate::stats;
use crate::transport::MessageId;

/// Current snapshot schema version. Version 1 snapshots carried only the
/// cursor and game list; version 2 added the `players` aggregate.
pub const SCHEMA_VERSION: u32 = 2;

/// One day's parsed game: which participants played and what they scored.
/// Immutable once created; appended to the cache's game list and never
/// mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: MessageId,
    /// Unix seconds of the source message.
    pub date: i64,
    pub scores: BTreeMap<PlayerId, u32>,
}

/// Running statistics for one participant. Created lazily on first
/// appearance, mutated only by [`stats::process_game`], never removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub scores: Vec<u32>,
    /// Cumulative WAR after each of this player's games, in order.
    pub war_history: Vec<f64>,
    pub total_war: f64,
    pub total_score: u32,
    pub wins: u32,
    pub games_played: u32,
}

/// The aggregate root. Owned by the sync engine; all mutation happens under
/// its single-writer lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cache {
    /// Snapshots written before versioning carry no field and deserialize
    /// as version 1.
    #[serde(default = "legacy_version")]
    pub schema_version: u32,
    pub last_message_id: Option<MessageId>,
    /// Games in ascending timestamp order.
    pub games: Vec<GameRecord>,
    #[serde(default)]
    pub players: HashMap<PlayerId, PlayerStats>,
}

fn legacy_version() -> u32 {
    1
}

impl Cache {
    pub fn empty() -> Self {
        Cache {
            schema_version: SCHEMA_VERSION,
            last_message_id: None,
            games: Vec::new(),
            players: HashMap::new(),
        }
    }
}

impl Default for Cache {
    fn default() -> Self {
        Cache::empty()
    }
}

/// Loads and persists the snapshot file.
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CacheStore { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Load the persisted snapshot.
    ///
    /// Never fails: a missing file yields an empty cache, an unreadable or
    /// malformed file is logged and replaced by an empty cache, and a
    /// snapshot at an older schema version is migrated (and the migrated
    /// form persisted) before being returned. `fail_penalty` is needed
    /// because migration replays the game list through the aggregator.
    pub fn load(&self, fail_penalty: u32) -> Cache {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Cache::empty(),
            Err(e) => {
                warn!(
                    "failed to read snapshot {}: {e}; starting from an empty cache",
                    self.path.display()
                );
                return Cache::empty();
            }
        };

        let mut cache: Cache = match serde_json::from_str(&text) {
            Ok(cache) => cache,
            Err(e) => {
                warn!(
                    "corrupt snapshot {}: {e}; starting from an empty cache",
                    self.path.display()
                );
                return Cache::empty();
            }
        };

        if cache.schema_version < SCHEMA_VERSION {
            self.migrate(&mut cache, fail_penalty);
        }
        cache
    }

    /// Apply one migration step per historical version, in order, then
    /// persist the migrated snapshot.
    fn migrate(&self, cache: &mut Cache, fail_penalty: u32) {
        while cache.schema_version < SCHEMA_VERSION {
            match cache.schema_version {
                1 => {
                    info!("migrating snapshot v1 -> v2: rebuilding player aggregates");
                    stats::rebuild(cache, fail_penalty);
                    cache.schema_version = 2;
                }
                v => {
                    warn!("snapshot has unknown version {v}; rebuilding aggregates");
                    stats::rebuild(cache, fail_penalty);
                    cache.schema_version = SCHEMA_VERSION;
                }
            }
        }
        if let Err(e) = self.save(cache) {
            warn!("failed to persist migrated snapshot: {e}");
        }
    }

    /// Serialize and overwrite the snapshot. Overwrites any prior file; not
    /// transactional.
    pub fn save(&self, cache: &Cache) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create snapshot directory {}", parent.display())
                })?;
            }
        }
        let text = serde_json::to_string_pretty(cache).context("failed to serialize snapshot")?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("failed to write snapshot {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn temp_store(name: &str) -> CacheStore {
        let dir = std::env::temp_dir().join("streakboard_cache_tests");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = fs::remove_file(&path);
        CacheStore::new(path)
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn missing_file_loads_empty() {
        let store = temp_store("missing.json");
        let cache = store.load(7);
        assert!(cache.last_message_id.is_none());
        assert!(cache.games.is_empty());
        assert!(cache.players.is_empty());
        assert_eq!(cache.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let store = temp_store("corrupt.json");
        fs::write(store.path(), "{ not json at all").unwrap();
        let cache = store.load(7);
        assert!(cache.games.is_empty());
        assert!(cache.players.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = temp_store("roundtrip.json");
        let mut cache = Cache::empty();
        cache.last_message_id = Some(42);
        cache.games.push(GameRecord {
            id: 42,
            date: 1_700_000_000,
            scores: [("100".to_string(), 3u32)].into_iter().collect(),
        });
        stats::rebuild(&mut cache, 7);
        store.save(&cache).unwrap();

        let loaded = store.load(7);
        assert_eq!(loaded.last_message_id, Some(42));
        assert_eq!(loaded.games, cache.games);
        assert_eq!(loaded.players["100"], cache.players["100"]);
    }

    #[test]
    fn legacy_snapshot_is_migrated_and_persisted() {
        let store = temp_store("legacy.json");
        // A v1-era snapshot: no schema_version, no players aggregate.
        let legacy = r#"{
            "last_message_id": 7,
            "games": [
                { "id": 6, "date": 2000, "scores": { "a": 6, "b": 3 } },
                { "id": 5, "date": 1000, "scores": { "a": 2, "b": 5 } }
            ]
        }"#;
        fs::write(store.path(), legacy).unwrap();

        let cache = store.load(7);
        assert_eq!(cache.schema_version, SCHEMA_VERSION);
        assert_eq!(cache.last_message_id, Some(7));
        // Rebuild sorted the games and produced aggregates.
        assert_eq!(cache.games[0].id, 5);
        assert_eq!(cache.players["a"].scores, vec![2, 6]);
        assert_eq!(cache.players["a"].games_played, 2);
        assert_eq!(
            cache.players["a"].games_played as usize,
            cache.players["a"].war_history.len()
        );

        // The migrated form hit disk before load() returned.
        let on_disk = read_json(store.path());
        assert_eq!(on_disk["schema_version"], SCHEMA_VERSION);
        assert!(on_disk["players"]["a"].is_object());
    }

    #[test]
    fn snapshot_schema_matches_wire_format() {
        let store = temp_store("schema.json");
        let mut cache = Cache::empty();
        cache.last_message_id = Some(9);
        cache.games.push(GameRecord {
            id: 9,
            date: 123,
            scores: [("100".to_string(), 4u32)].into_iter().collect(),
        });
        stats::rebuild(&mut cache, 7);
        store.save(&cache).unwrap();

        let v = read_json(store.path());
        assert_eq!(v["last_message_id"], 9);
        assert_eq!(v["games"][0]["scores"]["100"], 4);
        let p = &v["players"]["100"];
        for key in [
            "scores",
            "war_history",
            "total_war",
            "total_score",
            "wins",
            "games_played",
        ] {
            assert!(!p[key].is_null(), "missing field {key}");
        }
    }
}
