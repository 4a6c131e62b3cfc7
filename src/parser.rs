// Score extraction from streak result posts.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::names::{clean_name, NameMap, PlayerId};

/// Literal trigger substring marking a scheduled results post. Matched
/// case-sensitively, as observed in the source stream.
pub const STREAK_TRIGGER: &str = "Your group is on a";

/// One score line: a digit 1-6 or `X`, then `/6:` and the participant list.
fn score_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([1-6X])/6:(.*)").expect("score pattern is valid"))
}

/// Structured participant reference embedding a numeric ID: `<@123>` or
/// `<@!123>`.
fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<@!?(\d+)>").expect("mention pattern is valid"))
}

/// Extract `(participant, score)` pairs from one message's text.
///
/// Returns an empty vec unless the text contains [`STREAK_TRIGGER`]. Each
/// line matching the score grammar yields one pair per unique resolved
/// participant, with `X` mapping to `fail_penalty`. Mentions are resolved
/// first and stripped from the line; the remainder is tokenized on
/// whitespace (after treating `@` and `,` as separators) and looked up
/// against the name map, raw form first, de-decorated form second.
///
/// Lines that don't match the grammar and tokens that don't resolve are
/// dropped without comment: streak posts share the channel with ordinary
/// chat, so a miss is normal control flow, not an error.
pub fn parse(text: &str, name_map: &NameMap, fail_penalty: u32) -> Vec<(PlayerId, u32)> {
    if !text.contains(STREAK_TRIGGER) {
        return Vec::new();
    }

    let mut results = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        let Some(caps) = score_line_re().captures(line) else {
            continue;
        };
        let raw = &caps[1];
        let score = if raw == "X" {
            fail_penalty
        } else {
            raw.parse::<u32>().expect("capture group only admits digits")
        };
        let user_part = &caps[2];

        // Explicit mentions carry the ID directly and take precedence over
        // fuzzy name matching.
        let mut found: HashSet<PlayerId> = HashSet::new();
        for mention in mention_re().captures_iter(user_part) {
            found.insert(mention[1].to_string());
        }
        let stripped = mention_re().replace_all(user_part, " ");

        // Fuzzy text matching over what's left of the line.
        let normalized = stripped.replace(['@', ','], " ");
        for token in normalized.split_whitespace() {
            let raw = token.to_lowercase();
            if let Some(uid) = name_map.get(&raw) {
                found.insert(uid.clone());
                continue;
            }
            let cleaned = clean_name(&raw);
            if let Some(uid) = name_map.get(&cleaned) {
                found.insert(uid.clone());
            }
        }

        for uid in found {
            results.push((uid, score));
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::{build_name_map, Member};

    fn member(id: u64, display: &str, username: &str) -> Member {
        Member {
            id,
            display_name: display.into(),
            username: username.into(),
            global_name: None,
        }
    }

    fn sample_map() -> NameMap {
        build_name_map(&[
            member(100, "Alice", "alice_a"),
            member(200, "Bob", "bob_b"),
            member(300, "🔥Carol", "carol_c"),
        ])
    }

    fn sorted(mut pairs: Vec<(PlayerId, u32)>) -> Vec<(PlayerId, u32)> {
        pairs.sort();
        pairs
    }

    #[test]
    fn parses_scores_and_fail_penalty() {
        let text = "Your group is on a 12 day streak!\n3/6: @Alice\nX/6: @Bob";
        let pairs = parse(text, &sample_map(), 7);
        assert_eq!(
            sorted(pairs),
            vec![("100".to_string(), 3), ("200".to_string(), 7)]
        );
    }

    #[test]
    fn digit_scores_map_to_their_value() {
        for digit in 1..=6u32 {
            let text = format!("Your group is on a streak\n{digit}/6: alice");
            let pairs = parse(&text, &sample_map(), 7);
            assert_eq!(pairs, vec![("100".to_string(), digit)]);
        }
    }

    #[test]
    fn rejects_text_without_trigger() {
        let text = "3/6: @Alice\nX/6: @Bob";
        assert!(parse(text, &sample_map(), 7).is_empty());
    }

    #[test]
    fn trigger_match_is_case_sensitive() {
        let text = "your group is on a 3 day streak\n3/6: @Alice";
        assert!(parse(text, &sample_map(), 7).is_empty());
    }

    #[test]
    fn resolves_explicit_mentions() {
        let text = "Your group is on a streak\n4/6: <@100> <@!200>";
        let pairs = parse(text, &sample_map(), 7);
        assert_eq!(
            sorted(pairs),
            vec![("100".to_string(), 4), ("200".to_string(), 4)]
        );
    }

    #[test]
    fn mention_and_name_for_same_participant_dedupe() {
        let text = "Your group is on a streak\n2/6: <@100> alice";
        let pairs = parse(text, &sample_map(), 7);
        assert_eq!(pairs, vec![("100".to_string(), 2)]);
    }

    #[test]
    fn decorated_name_resolves_via_cleaned_form() {
        // The member's display name is "🔥Carol"; the post says "Carol".
        let text = "Your group is on a streak\n5/6: carol";
        let pairs = parse(text, &sample_map(), 7);
        assert_eq!(pairs, vec![("300".to_string(), 5)]);
    }

    #[test]
    fn comma_and_at_separate_names() {
        let text = "Your group is on a streak\n6/6: alice,bob";
        let pairs = parse(text, &sample_map(), 7);
        assert_eq!(
            sorted(pairs),
            vec![("100".to_string(), 6), ("200".to_string(), 6)]
        );
    }

    #[test]
    fn unresolved_tokens_are_dropped() {
        let text = "Your group is on a streak\n3/6: @Alice @Mallory";
        let pairs = parse(text, &sample_map(), 7);
        assert_eq!(pairs, vec![("100".to_string(), 3)]);
    }

    #[test]
    fn score_line_with_no_resolvable_names_contributes_nothing() {
        let text = "Your group is on a streak\n3/6: @Mallory";
        assert!(parse(text, &sample_map(), 7).is_empty());
    }

    #[test]
    fn non_matching_lines_are_ignored() {
        let text = "Your group is on a streak\nhello everyone\n9/6: @Alice\n0/6: @Bob\n4/6: bob";
        // 9 and 0 are outside the 1-6 grammar; only the 4/6 line counts.
        let pairs = parse(text, &sample_map(), 7);
        assert_eq!(pairs, vec![("200".to_string(), 4)]);
    }
}
