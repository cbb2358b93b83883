//! # engine::patterns
//!
//! Candlestick tags for the most recent bar (and the one before it for the
//! two-bar engulfing formations).
//!
//! ```text
//!        │  ← upper shadow
//!      ┌─┴─┐
//!      │   │ ← body  = |close − open|
//!      └─┬─┘
//!        │  ← lower shadow
//! range = max(high − low, ε)
//! ```
//!
//! Patterns are not exclusive: a bar can be both a Doji and a Hammer.

use serde::Serialize;

use crate::models::Bar;

/// Floor for the bar range so ratios stay defined on zero-range bars.
pub const RANGE_EPSILON: f64 = 1e-12;

const DOJI_BODY_RATIO: f64 = 0.1;
const LONG_SHADOW_RATIO: f64 = 0.5;
const SHORT_SHADOW_RATIO: f64 = 0.2;

/// Tags in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CandlePattern {
    Doji,
    Hammer,
    ShootingStar,
    BullishEngulfing,
    BearishEngulfing,
}

fn is_doji(bar: &Bar) -> bool {
    bar.body() <= DOJI_BODY_RATIO * bar.range(RANGE_EPSILON)
}

/// Long lower wick, short upper wick, closing at or above the open.
fn is_hammer(bar: &Bar) -> bool {
    let range = bar.range(RANGE_EPSILON);
    bar.lower_shadow() >= LONG_SHADOW_RATIO * range
        && bar.upper_shadow() <= SHORT_SHADOW_RATIO * range
        && bar.close >= bar.open
}

/// Long upper wick, short lower wick, closing at or below the open.
fn is_shooting_star(bar: &Bar) -> bool {
    let range = bar.range(RANGE_EPSILON);
    bar.upper_shadow() >= LONG_SHADOW_RATIO * range
        && bar.lower_shadow() <= SHORT_SHADOW_RATIO * range
        && bar.close <= bar.open
}

/// Bearish `prev`, bullish `cur`, and `cur`'s body covers `prev`'s body.
fn is_bullish_engulfing(prev: &Bar, cur: &Bar) -> bool {
    prev.is_bearish()
        && cur.is_bullish()
        && cur.open <= prev.close
        && cur.close >= prev.open
}

fn is_bearish_engulfing(prev: &Bar, cur: &Bar) -> bool {
    prev.is_bullish()
        && cur.is_bearish()
        && cur.open >= prev.close
        && cur.close <= prev.open
}

/// Patterns formed by the last bar of `bars`, in a fixed order.
pub fn detect_patterns(bars: &[Bar]) -> Vec<CandlePattern> {
    let Some(cur) = bars.last() else {
        return Vec::new();
    };

    let mut found = Vec::new();
    if is_doji(cur) {
        found.push(CandlePattern::Doji);
    }
    if is_hammer(cur) {
        found.push(CandlePattern::Hammer);
    }
    if is_shooting_star(cur) {
        found.push(CandlePattern::ShootingStar);
    }

    if let [.., prev, cur] = bars {
        if is_bullish_engulfing(prev, cur) {
            found.push(CandlePattern::BullishEngulfing);
        }
        if is_bearish_engulfing(prev, cur) {
            found.push(CandlePattern::BearishEngulfing);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(0, open, high, low, close, 0.0)
    }

    #[test]
    fn test_empty_sequence_has_no_patterns() {
        assert!(detect_patterns(&[]).is_empty());
    }

    #[test]
    fn test_doji() {
        // body 0.05, range 2
        let tags = detect_patterns(&[bar(100.0, 101.0, 99.0, 100.05)]);
        assert_eq!(tags, vec![CandlePattern::Doji]);
    }

    #[test]
    fn test_hammer_with_flat_body() {
        // lower shadow 10 of range 10.2, upper shadow 0.2
        let tags = detect_patterns(&[bar(100.0, 100.2, 90.0, 100.0)]);
        assert!(tags.contains(&CandlePattern::Hammer));
        assert!(tags.contains(&CandlePattern::Doji));
        assert!(!tags.contains(&CandlePattern::ShootingStar));
    }

    #[test]
    fn test_bullish_hammer() {
        let tags = detect_patterns(&[bar(98.0, 100.5, 90.0, 100.0)]);
        assert_eq!(tags, vec![CandlePattern::Hammer]);
    }

    #[test]
    fn test_bearish_close_is_not_a_hammer() {
        let tags = detect_patterns(&[bar(100.0, 100.5, 90.0, 98.0)]);
        assert!(!tags.contains(&CandlePattern::Hammer));
    }

    #[test]
    fn test_shooting_star() {
        let tags = detect_patterns(&[bar(100.0, 110.0, 99.5, 98.5)]);
        assert_eq!(tags, vec![CandlePattern::ShootingStar]);
    }

    #[test]
    fn test_zero_range_bar_is_doji() {
        let tags = detect_patterns(&[bar(5.0, 5.0, 5.0, 5.0)]);
        assert_eq!(tags[0], CandlePattern::Doji);
    }

    #[test]
    fn test_bullish_engulfing() {
        let prev = bar(105.0, 106.0, 99.0, 100.0);
        let cur = bar(99.5, 108.0, 99.0, 107.0);
        assert_eq!(detect_patterns(&[prev, cur]), vec![CandlePattern::BullishEngulfing]);
    }

    #[test]
    fn test_bearish_engulfing() {
        let prev = bar(100.0, 106.0, 99.5, 105.0);
        let cur = bar(106.0, 107.0, 98.0, 99.0);
        assert_eq!(detect_patterns(&[prev, cur]), vec![CandlePattern::BearishEngulfing]);
    }

    #[test]
    fn test_partial_cover_is_not_engulfing() {
        let prev = bar(105.0, 106.0, 99.0, 100.0);
        let cur = bar(101.0, 106.0, 100.5, 104.0);
        assert!(detect_patterns(&[prev, cur]).is_empty());
    }

    #[test]
    fn test_only_last_two_bars_matter() {
        let engulfing = [bar(105.0, 106.0, 99.0, 100.0), bar(99.5, 108.0, 99.0, 107.0)];
        let mut bars = vec![bar(1.0, 1.0, 1.0, 1.0); 5];
        bars.extend(engulfing);
        assert_eq!(detect_patterns(&bars), vec![CandlePattern::BullishEngulfing]);
    }

    #[test]
    fn test_serialized_tag_names() {
        let text = serde_json::to_string(&[CandlePattern::Doji, CandlePattern::ShootingStar]).unwrap();
        assert_eq!(text, r#"["Doji","ShootingStar"]"#);
    }
}
