// Stateful aggregation: folds parsed games into per-player running stats.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::{Cache, GameRecord, PlayerStats};
use crate::names::PlayerId;

/// Fold one game into the player aggregates.
///
/// The WAR delta for a participant is `day_avg - score`: scoring below the
/// day's average (lower is better) earns positive WAR, and the deltas of a
/// single game sum to zero across its participants. A game with an empty
/// score map is skipped entirely.
///
/// A pure fold of `(prior state, game)`: replaying a fixed chronological
/// game list from an empty map reproduces the incrementally built map.
pub fn process_game(
    players: &mut HashMap<PlayerId, PlayerStats>,
    game: &GameRecord,
    fail_penalty: u32,
) {
    if game.scores.is_empty() {
        return;
    }
    let day_avg =
        game.scores.values().map(|&s| f64::from(s)).sum::<f64>() / game.scores.len() as f64;

    for (uid, &score) in &game.scores {
        let p = players.entry(uid.clone()).or_default();
        let delta = day_avg - f64::from(score);
        p.scores.push(score);
        p.war_history.push(p.total_war + delta);
        p.total_war += delta;
        p.total_score += score;
        if score < fail_penalty {
            p.wins += 1;
        }
        p.games_played += 1;
    }
}

/// Recompute every player aggregate from scratch.
///
/// Sorts the game list ascending by date (ties broken by message id) and
/// replays it through [`process_game`] from an empty player map. Used for
/// schema migration and forced full rescans.
pub fn rebuild(cache: &mut Cache, fail_penalty: u32) {
    debug!("rebuilding player aggregates from {} games", cache.games.len());
    cache.players.clear();
    cache.games.sort_by_key(|g| (g.date, g.id));

    let games = std::mem::take(&mut cache.games);
    for game in &games {
        process_game(&mut cache.players, game, fail_penalty);
    }
    cache.games = games;
}
