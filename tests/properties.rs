use std::rc::Rc;

use dragon_landing::page::FundingState;
use dragon_landing::{
    format_count, percentage, QuoteCarousel, QuoteEntry, VirtualClock, ROTATION_INTERVAL_MS,
};
use proptest::prelude::*;

fn quotes(n: usize) -> Vec<QuoteEntry> {
    (0..n)
        .map(|i| QuoteEntry::new(format!("quote {i}"), format!("author {i}")))
        .collect()
}

#[test]
fn zero_goal_is_zero_percent() {
    assert_eq!(percentage(400.0, 0.0), 0.0);
    assert_eq!(percentage(0.0, 0.0), 0.0);
}

proptest! {
    #[test]
    fn prop_percentage_bounded(current in -1e9f64..1e9, goal in 1e-3f64..1e9) {
        let pct = percentage(current, goal);
        prop_assert!((0.0..=100.0).contains(&pct));
    }

    #[test]
    fn prop_percentage_monotonic(a in 0f64..1e7, b in 0f64..1e7, goal in 1f64..1e7) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(percentage(low, goal) <= percentage(high, goal));
    }

    #[test]
    fn prop_non_positive_goal_is_zero(current in -1e9f64..1e9, goal in -1e9f64..=0.0) {
        prop_assert_eq!(percentage(current, goal), 0.0);
    }

    #[test]
    fn prop_grouping_preserves_digits(n in 0u64..1_000_000_000_000) {
        let formatted = format_count(n as f64);
        prop_assert_eq!(formatted.replace(',', ""), n.to_string());
        for group in formatted.split(',').skip(1) {
            prop_assert_eq!(group.len(), 3);
        }
    }

    #[test]
    fn prop_carousel_index_wraps(len in 1usize..12, ticks in 0u64..40) {
        let clock = VirtualClock::new();
        let carousel = QuoteCarousel::new(quotes(len));
        let mounted = carousel.mount(clock.clone());

        let fired = clock.advance(ticks * u64::from(ROTATION_INTERVAL_MS));
        prop_assert_eq!(fired as u64, ticks);
        prop_assert_eq!(mounted.index(), (ticks as usize) % len);

        drop(mounted);
        prop_assert_eq!(clock.active_intervals(), 0);
        prop_assert_eq!(clock.advance(u64::from(ROTATION_INTERVAL_MS)), 0);
        prop_assert_eq!(Rc::strong_count(&clock), 1);
    }

    #[test]
    fn prop_pledges_never_lower_progress(pledges in prop::collection::vec(-100f64..500.0, 0..20)) {
        let mut funding = FundingState::new(400.0, 1000.0);
        let mut last = funding.progress().percentage;
        for amount in pledges {
            let accepted = funding.record_pledge(amount);
            prop_assert_eq!(accepted, amount > 0.0);
            let now = funding.progress().percentage;
            prop_assert!(now >= last);
            last = now;
        }
    }
}
