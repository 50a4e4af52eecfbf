//! Overlay selection: which overlays apply to a context, and in what order.
//!
//! An overlay is a candidate when `now` falls inside its validity window and
//! every selector key is present in the context with an equal value. Candidates
//! are returned in application order, ascending by
//! `(priority, specificity, created_at, overlay_id)`, so the overlay applied
//! last has the final say.

use chrono::{DateTime, Utc};

use crate::domain::models::{Context, Overlay, Selector};

/// Whether every selector key is present in `context` with an exactly equal value.
/// Extra context keys are ignored; an empty selector matches everything.
pub fn selector_matches(selector: &Selector, context: &Context) -> bool {
    selector
        .iter()
        .all(|(key, expected)| context.get(key).is_some_and(|actual| actual == expected))
}

/// Whether `overlay` applies to `context` at `now`.
pub fn is_candidate(overlay: &Overlay, context: &Context, now: DateTime<Utc>) -> bool {
    overlay.is_active_at(now) && selector_matches(&overlay.selector, context)
}

/// Filter `overlays` down to those applicable to `context` at `now`, in
/// application order.
pub fn select<'a>(overlays: &'a [Overlay], context: &Context, now: DateTime<Utc>) -> Vec<&'a Overlay> {
    let mut selected: Vec<&Overlay> = overlays.iter().filter(|o| is_candidate(o, context, now)).collect();
    selected.sort_by(|a, b| {
        (a.priority, a.specificity(), a.created_at, a.overlay_id).cmp(&(
            b.priority,
            b.specificity(),
            b.created_at,
            b.overlay_id,
        ))
    });
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::NewOverlay;
    use chrono::{Duration, TimeZone};
    use serde_json::{json, Value};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn map(pairs: &[(&str, Value)]) -> Selector {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn overlay(priority: i32, selector: Selector, created_offset_secs: i64) -> Overlay {
        let mut o = Overlay::from_new(
            "default",
            "revenue",
            NewOverlay::new(json!({})).with_selector(selector).with_priority(priority),
        );
        o.created_at = now() - Duration::days(1) + Duration::seconds(created_offset_secs);
        o
    }

    #[test]
    fn test_selector_requires_exact_values() {
        let context = map(&[("team", json!("marketing")), ("region", json!("eu")), ("tier", json!(1))]);

        assert!(selector_matches(&Selector::new(), &context));
        assert!(selector_matches(&map(&[("team", json!("marketing"))]), &context));
        assert!(!selector_matches(&map(&[("team", json!("sales"))]), &context));
        assert!(!selector_matches(&map(&[("use_case", json!("weekly"))]), &context));
        // no coercion between string and number
        assert!(!selector_matches(&map(&[("tier", json!("1"))]), &context));
    }

    #[test]
    fn test_priority_then_specificity_ordering() {
        let team = || map(&[("team", json!("marketing"))]);
        let team_use_case = map(&[("team", json!("marketing")), ("use_case", json!("weekly"))]);

        let p0_s1 = overlay(0, team(), 0);
        let p0_s2 = overlay(0, team_use_case, 1);
        let p10_s1 = overlay(10, team(), 2);
        let overlays = vec![p10_s1.clone(), p0_s2.clone(), p0_s1.clone()];

        let context = map(&[("team", json!("marketing")), ("use_case", json!("weekly"))]);
        let ids: Vec<_> = select(&overlays, &context, now()).iter().map(|o| o.overlay_id).collect();
        assert_eq!(ids, vec![p0_s1.overlay_id, p0_s2.overlay_id, p10_s1.overlay_id]);
    }

    #[test]
    fn test_recency_breaks_priority_and_specificity_ties() {
        let older = overlay(3, Selector::new(), 0);
        let newer = overlay(3, Selector::new(), 60);
        let overlays = vec![newer.clone(), older.clone()];

        let ids: Vec<_> = select(&overlays, &Context::new(), now()).iter().map(|o| o.overlay_id).collect();
        assert_eq!(ids, vec![older.overlay_id, newer.overlay_id]);
    }

    #[test]
    fn test_full_tie_is_ordered_by_id() {
        let a = overlay(0, Selector::new(), 0);
        let mut b = overlay(0, Selector::new(), 0);
        b.created_at = a.created_at;
        let expected = if a.overlay_id < b.overlay_id { vec![a.overlay_id, b.overlay_id] } else { vec![b.overlay_id, a.overlay_id] };

        for overlays in [vec![a.clone(), b.clone()], vec![b.clone(), a.clone()]] {
            let ids: Vec<_> = select(&overlays, &Context::new(), now()).iter().map(|o| o.overlay_id).collect();
            assert_eq!(ids, expected);
        }
    }

    #[test]
    fn test_validity_window_filtering() {
        let with_window = |from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>| {
            let mut o = overlay(0, Selector::new(), 0);
            o.valid_from = from;
            o.valid_to = to;
            o
        };
        let future = with_window(Some(now() + Duration::hours(1)), None);
        let expired = with_window(None, Some(now() - Duration::hours(1)));
        let unbounded = with_window(None, None);
        let ends_now = with_window(None, Some(now()));
        let starts_now = with_window(Some(now()), None);
        let overlays = vec![future, expired, unbounded.clone(), ends_now, starts_now.clone()];

        let selected = select(&overlays, &Context::new(), now());
        let ids: Vec<_> = selected.iter().map(|o| o.overlay_id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&unbounded.overlay_id));
        assert!(ids.contains(&starts_now.overlay_id));
    }

    #[test]
    fn test_extra_context_keys_are_ignored() {
        let o = overlay(0, map(&[("team", json!("finance"))]), 0);
        let context = map(&[("team", json!("finance")), ("dashboard", json!("q3"))]);
        assert!(is_candidate(&o, &context, now()));
    }
}
