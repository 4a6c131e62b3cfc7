// Sync engine: debounced incremental or full scans of the message stream,
// folded into the cached aggregates under a single-writer lock.

use std::collections::BTreeMap;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{Cache, CacheStore, GameRecord};
use crate::config::Settings;
use crate::names::{self, Member};
use crate::parser;
use crate::stats;
use crate::transport::{MessageTransport, TransportError};

#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote fetch failed mid-scan. Nothing was persisted; the cache
    /// keeps its pre-scan state.
    #[error("transport failure during scan: {0}")]
    Transport(#[source] TransportError),

    /// The updated snapshot could not be written.
    #[error("failed to persist snapshot: {0}")]
    Store(#[source] anyhow::Error),
}

/// State carried between sync calls. The cache itself is re-loaded inside
/// the lock on every call, so the only carried state is the debounce clock.
struct SyncState {
    last_fetch: Option<Instant>,
}

/// Orchestrates the load -> scan -> fold -> persist cycle.
///
/// One engine per group's message history. Concurrent triggers (query
/// commands, passive listeners) all serialize through the internal lock.
pub struct SyncEngine {
    store: CacheStore,
    settings: Settings,
    state: Mutex<SyncState>,
}

impl SyncEngine {
    pub fn new(store: CacheStore, settings: Settings) -> Self {
        SyncEngine {
            store,
            settings,
            state: Mutex::new(SyncState { last_fetch: None }),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Scan the message stream and return the up-to-date cache snapshot.
    ///
    /// Holds the single-writer lock for the entire cycle. Within the
    /// debounce TTL a non-forced call skips the remote fetch and returns
    /// the stored snapshot unchanged. `force_full_rescan` discards all
    /// prior games and aggregates and re-fetches from the configured start
    /// date; the same fallback runs when the stored cursor no longer
    /// resolves against the transport.
    ///
    /// The snapshot is written at most once, at the end of a scan that
    /// advanced the cursor or produced new games. On transport failure
    /// nothing is persisted and the debounce clock is not stamped.
    pub async fn sync(
        &self,
        transport: &dyn MessageTransport,
        members: &[Member],
        force_full_rescan: bool,
    ) -> Result<Cache, SyncError> {
        let mut state = self.state.lock().await;

        let mut cache = self.store.load(self.settings.fail_penalty);

        if !force_full_rescan {
            if let Some(last) = state.last_fetch {
                if last.elapsed() < self.settings.debounce_ttl {
                    debug!("within debounce TTL; skipping remote fetch");
                    return Ok(cache);
                }
            }
        }

        let name_map = names::build_name_map(members);

        let messages = match cache.last_message_id {
            Some(cursor) if !force_full_rescan => match transport.fetch_after(cursor).await {
                Ok(messages) => messages,
                Err(TransportError::StaleCursor) => {
                    warn!("cursor {cursor} no longer resolves; falling back to a full scan");
                    cache = Cache::empty();
                    transport
                        .fetch_from(self.settings.streak_start)
                        .await
                        .map_err(SyncError::Transport)?
                }
                Err(e) => return Err(SyncError::Transport(e)),
            },
            _ => {
                info!("performing full scan from {}", self.settings.streak_start);
                cache = Cache::empty();
                transport
                    .fetch_from(self.settings.streak_start)
                    .await
                    .map_err(SyncError::Transport)?
            }
        };

        let prior_cursor = cache.last_message_id;
        let mut scan_cursor = prior_cursor;
        let mut new_games = 0usize;

        for msg in &messages {
            // The cursor advances on every observed message, game or not.
            scan_cursor = Some(msg.id);
            if msg.timestamp < self.settings.streak_start {
                continue;
            }
            let parsed = parser::parse(&msg.text, &name_map, self.settings.fail_penalty);
            if parsed.is_empty() {
                continue;
            }
            let game = GameRecord {
                id: msg.id,
                date: msg.timestamp.timestamp(),
                scores: parsed.into_iter().collect::<BTreeMap<_, _>>(),
            };
            stats::process_game(&mut cache.players, &game, self.settings.fail_penalty);
            cache.games.push(game);
            new_games += 1;
        }

        if new_games > 0 || scan_cursor != prior_cursor {
            cache.last_message_id = scan_cursor;
            self.store.save(&cache).map_err(SyncError::Store)?;
            info!(
                "scan complete: {} new games, cursor at {:?}",
                new_games, scan_cursor
            );
        } else {
            debug!("scan produced no changes; skipping snapshot write");
        }

        state.last_fetch = Some(Instant::now());
        Ok(cache)
    }
}
