// Leaderboard rendering: fixed-width text table sorted by total WAR.

use std::cmp::Ordering;

use crate::cache::Cache;
use crate::names::{clean_name, Member};

struct Row {
    name: String,
    full_name: String,
    avg: f64,
    win_rate: f64,
    war: f64,
    games: u32,
}

/// Render the season leaderboard as a chat-ready text block.
///
/// Players with fewer than `min_games` games are filtered out; the rest are
/// ranked by total WAR descending. Display names come from the current
/// membership list, de-decorated for the table; players who left the group
/// fall back to `ID: <uid>`.
pub fn leaderboard(cache: &Cache, members: &[Member], min_games: usize) -> String {
    let mut rows: Vec<Row> = Vec::new();
    for (uid, stats) in &cache.players {
        if (stats.games_played as usize) < min_games {
            continue;
        }
        let games = f64::from(stats.games_played);
        let full_name = members
            .iter()
            .find(|m| m.id.to_string() == *uid)
            .map(|m| m.display_name.clone())
            .unwrap_or_else(|| format!("ID: {uid}"));
        rows.push(Row {
            name: clean_name(&full_name),
            full_name,
            avg: f64::from(stats.total_score) / games,
            win_rate: f64::from(stats.wins) / games * 100.0,
            war: stats.total_war,
            games: stats.games_played,
        });
    }

    if rows.is_empty() {
        return format!(
            "**📊 OFFICIAL WORDLE ANALYTICS**\n⚠️ Not enough data yet (Need {min_games}+ games)."
        );
    }

    rows.sort_by(|a, b| b.war.partial_cmp(&a.war).unwrap_or(Ordering::Equal));

    let header = format!(
        "{:<3} {:<14} {:<5} {:<5} {:<6} {}",
        "RK", "NAME", "AVG", "WIN%", "WAR", "GAMES"
    );
    let mut lines = vec![header.clone(), "=".repeat(header.len())];
    for (i, row) in rows.iter().enumerate() {
        let display: String = if row.name.chars().count() > 12 {
            let truncated: String = row.name.chars().take(12).collect();
            format!("{truncated}..")
        } else {
            row.name.clone()
        };
        lines.push(format!(
            "#{:<2} {:<14} {:.2}  {:.0}%   {:+.1}   {}",
            i + 1,
            display,
            row.avg,
            row.win_rate,
            row.war,
            row.games
        ));
    }

    format!(
        "**📊 OFFICIAL WORDLE ANALYTICS**\n*Season 1 Data ({} days)*\n\n```text\n{}\n```\n👑 **MVP:** {}\n💀 **LVP:** {}",
        cache.games.len(),
        lines.join("\n"),
        rows[0].full_name,
        rows[rows.len() - 1].full_name,
    )
}
