//! Due-notification selection.
//!
//! Pure functions over full UTC instants. Comparing complete date-times
//! (never hour-of-day alone) is what keeps blocks on either side of a
//! midnight boundary from being confused with each other.

use chrono::{DateTime, Duration, Utc};

use quiet_core::types::QuietBlock;

/// Blocks due for an upcoming reminder: not yet notified and starting within
/// `[now, now + lookahead_minutes]`, both ends inclusive.
///
/// A lookahead of 0 therefore selects only blocks starting at `now` exactly;
/// blocks whose start has already passed are never "upcoming" (see
/// [`select_late`] for the missed-window policy).
///
/// Output is ordered ascending by start, ties broken by id so repeated calls
/// over the same input are deterministic.
pub fn select_due(
    now: DateTime<Utc>,
    lookahead_minutes: i64,
    blocks: &[QuietBlock],
) -> Vec<QuietBlock> {
    let horizon = now + Duration::minutes(lookahead_minutes);
    let mut due: Vec<QuietBlock> = blocks
        .iter()
        .filter(|b| !b.notified && b.starts_at >= now && b.starts_at <= horizon)
        .cloned()
        .collect();
    sort_schedule(&mut due);
    due
}

/// Blocks whose reminder window was missed but whose start is still recent:
/// not yet notified and starting within `[now - grace_minutes, now)`.
///
/// These get a late reminder rather than being dropped silently, so a run of
/// provider outages doesn't turn into invisible delivery loss. A grace of 0
/// disables late reminders. Same ordering contract as [`select_due`].
pub fn select_late(
    now: DateTime<Utc>,
    grace_minutes: i64,
    blocks: &[QuietBlock],
) -> Vec<QuietBlock> {
    let floor = now - Duration::minutes(grace_minutes);
    let mut late: Vec<QuietBlock> = blocks
        .iter()
        .filter(|b| !b.notified && b.starts_at < now && b.starts_at >= floor)
        .cloned()
        .collect();
    sort_schedule(&mut late);
    late
}

fn sort_schedule(blocks: &mut [QuietBlock]) {
    blocks.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn block(id: &str, start: &str, end: &str, notified: bool) -> QuietBlock {
        QuietBlock {
            id: id.to_string(),
            owner_id: "u1".to_string(),
            starts_at: t(start),
            ends_at: t(end),
            description: format!("session {id}"),
            notified,
            created_at: t("2024-01-01T00:00:00Z"),
            updated_at: t("2024-01-01T00:00:00Z"),
        }
    }

    #[test]
    fn empty_input_yields_empty_result() {
        assert!(select_due(t("2024-01-16T09:50:00Z"), 10, &[]).is_empty());
    }

    #[test]
    fn selects_only_blocks_inside_window() {
        // now = 09:50, lookahead 10: 09:55 in, 10:05 out, 08:00 (past) out.
        let now = t("2024-01-16T09:50:00Z");
        let blocks = vec![
            block("a", "2024-01-16T09:55:00Z", "2024-01-16T10:55:00Z", false),
            block("b", "2024-01-16T10:05:00Z", "2024-01-16T11:05:00Z", false),
            block("c", "2024-01-16T08:00:00Z", "2024-01-16T09:00:00Z", false),
        ];
        let due = select_due(now, 10, &blocks);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "a");
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let now = t("2024-01-16T09:50:00Z");
        let blocks = vec![
            block("at-now", "2024-01-16T09:50:00Z", "2024-01-16T10:00:00Z", false),
            block("at-edge", "2024-01-16T10:00:00Z", "2024-01-16T11:00:00Z", false),
            block("past-edge", "2024-01-16T10:00:01Z", "2024-01-16T11:00:01Z", false),
        ];
        let ids: Vec<_> = select_due(now, 10, &blocks)
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, ["at-now", "at-edge"]);
    }

    #[test]
    fn zero_lookahead_selects_only_exact_now() {
        let now = t("2024-01-16T09:50:00Z");
        let blocks = vec![
            block("exact", "2024-01-16T09:50:00Z", "2024-01-16T10:00:00Z", false),
            block("soon", "2024-01-16T09:50:01Z", "2024-01-16T10:00:00Z", false),
            block("late", "2024-01-16T09:49:59Z", "2024-01-16T10:00:00Z", false),
        ];
        let due = select_due(now, 0, &blocks);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "exact");
    }

    #[test]
    fn notified_blocks_are_excluded() {
        let now = t("2024-01-16T09:50:00Z");
        let blocks = vec![block(
            "a",
            "2024-01-16T09:55:00Z",
            "2024-01-16T10:55:00Z",
            true,
        )];
        assert!(select_due(now, 10, &blocks).is_empty());
    }

    #[test]
    fn output_sorted_by_start_then_id() {
        let now = t("2024-01-16T09:50:00Z");
        let blocks = vec![
            block("z", "2024-01-16T09:55:00Z", "2024-01-16T10:55:00Z", false),
            block("a", "2024-01-16T09:55:00Z", "2024-01-16T10:55:00Z", false),
            block("m", "2024-01-16T09:52:00Z", "2024-01-16T10:52:00Z", false),
        ];
        let ids: Vec<_> = select_due(now, 10, &blocks)
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, ["m", "a", "z"]);
    }

    #[test]
    fn midnight_spanning_block_is_selected_on_absolute_instants() {
        // A block from 23:58 to 00:10 the next day, with now = 23:55, is due.
        // An hour-of-day comparison (23*60+58 vs 0*60+5) would also pull in a
        // block at 00:05 of a *different* day; full instants must not.
        let now = t("2024-01-16T23:55:00Z");
        let blocks = vec![
            block("tonight", "2024-01-16T23:58:00Z", "2024-01-17T00:10:00Z", false),
            block("next-week", "2024-01-23T00:05:00Z", "2024-01-23T01:00:00Z", false),
            block("yesterday", "2024-01-16T00:05:00Z", "2024-01-16T01:00:00Z", false),
        ];
        let ids: Vec<_> = select_due(now, 10, &blocks)
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, ["tonight"]);
    }

    #[test]
    fn late_window_is_half_open_below_now() {
        let now = t("2024-01-16T10:00:00Z");
        let blocks = vec![
            block("missed", "2024-01-16T09:45:00Z", "2024-01-16T10:45:00Z", false),
            block("at-floor", "2024-01-16T09:30:00Z", "2024-01-16T10:30:00Z", false),
            block("too-old", "2024-01-16T09:29:59Z", "2024-01-16T10:29:00Z", false),
            block("at-now", "2024-01-16T10:00:00Z", "2024-01-16T11:00:00Z", false),
        ];
        let ids: Vec<_> = select_late(now, 30, &blocks)
            .into_iter()
            .map(|b| b.id)
            .collect();
        // `at-now` belongs to the due window, not the late one; the two
        // windows are disjoint so the dispatcher never sees a block twice.
        assert_eq!(ids, ["at-floor", "missed"]);
    }

    #[test]
    fn zero_grace_disables_late_reminders() {
        let now = t("2024-01-16T10:00:00Z");
        let blocks = vec![block(
            "missed",
            "2024-01-16T09:59:00Z",
            "2024-01-16T10:59:00Z",
            false,
        )];
        assert!(select_late(now, 0, &blocks).is_empty());
    }
}
