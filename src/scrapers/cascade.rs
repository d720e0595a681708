//! Ordered fallback cascades.
//!
//! Each extracted field (title, date, body, lead image) is recovered by trying
//! a list of strategies in order. A strategy returns an [`Attempt`]: either a
//! value or a [`Miss`] saying why it produced nothing. The cascade decides
//! when to advance; strategies never swallow their own failures.

use thiserror::Error;
use tracing::debug;

/// Why a strategy produced nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Miss {
    /// The markup the strategy looks for is not on the page.
    #[error("markup absent")]
    Absent,
    /// The markup is there but its value could not be interpreted.
    #[error("unparseable value: {0}")]
    Unparseable(String),
    /// A value was found but fails the strategy's own quality floor.
    #[error("found {found}, need {required}")]
    BelowGate { found: usize, required: usize },
}

/// Result of one strategy.
pub type Attempt<T> = Result<T, Miss>;

/// A named extraction step over input `I`.
pub struct Strategy<I: ?Sized, T> {
    pub name: &'static str,
    pub run: fn(&I) -> Attempt<T>,
}

impl<I: ?Sized, T> Strategy<I, T> {
    pub const fn new(name: &'static str, run: fn(&I) -> Attempt<T>) -> Self {
        Self { name, run }
    }
}

/// Run strategies in order and return the first success.
pub fn first_success<I: ?Sized, T>(strategies: &[Strategy<I, T>], input: &I) -> Option<T> {
    for strategy in strategies {
        match (strategy.run)(input) {
            Ok(value) => {
                debug!(strategy = strategy.name, "Cascade strategy succeeded");
                return Some(value);
            }
            Err(miss) => debug!(strategy = strategy.name, %miss, "Cascade strategy missed"),
        }
    }
    None
}

/// Run strategies in order and return the first success that passes `gate`.
///
/// When no success passes the gate, the most recent success is returned so
/// the caller can apply a looser final floor.
pub fn first_qualifying<I: ?Sized, T>(
    strategies: &[Strategy<I, T>],
    input: &I,
    gate: impl Fn(&T) -> bool,
) -> Option<T> {
    let mut fallback = None;
    for strategy in strategies {
        match (strategy.run)(input) {
            Ok(value) if gate(&value) => {
                debug!(strategy = strategy.name, "Cascade strategy qualified");
                return Some(value);
            }
            Ok(value) => {
                debug!(strategy = strategy.name, "Cascade strategy below gate; continuing");
                fallback = Some(value);
            }
            Err(miss) => debug!(strategy = strategy.name, %miss, "Cascade strategy missed"),
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_display() {
        assert_eq!(Miss::Absent.to_string(), "markup absent");
        assert_eq!(
            Miss::Unparseable("soon".to_string()).to_string(),
            "unparseable value: soon"
        );
        assert_eq!(
            Miss::BelowGate { found: 2, required: 3 }.to_string(),
            "found 2, need 3"
        );
    }

    fn absent(_: &str) -> Attempt<String> {
        Err(Miss::Absent)
    }

    fn short(_: &str) -> Attempt<String> {
        Ok("short".to_string())
    }

    fn echo(input: &str) -> Attempt<String> {
        Ok(input.to_string())
    }

    fn unparseable(input: &str) -> Attempt<String> {
        Err(Miss::Unparseable(input.to_string()))
    }

    #[test]
    fn test_first_success_skips_misses() {
        let strategies = [
            Strategy::new("absent", absent),
            Strategy::new("unparseable", unparseable),
            Strategy::new("echo", echo),
            Strategy::new("short", short),
        ];
        assert_eq!(
            first_success(&strategies, "value"),
            Some("value".to_string())
        );
    }

    #[test]
    fn test_first_success_all_miss() {
        let strategies = [Strategy::new("absent", absent)];
        assert_eq!(first_success(&strategies, "value"), None);
    }

    #[test]
    fn test_first_qualifying_passes_over_short_result() {
        let strategies = [Strategy::new("short", short), Strategy::new("echo", echo)];
        let got = first_qualifying(&strategies, "long enough value", |s: &String| s.len() > 10);
        assert_eq!(got, Some("long enough value".to_string()));
    }

    #[test]
    fn test_first_qualifying_returns_latest_below_gate() {
        let strategies = [
            Strategy::new("echo", echo),
            Strategy::new("short", short),
            Strategy::new("absent", absent),
        ];
        let got = first_qualifying(&strategies, "tiny", |s: &String| s.len() > 100);
        assert_eq!(got, Some("short".to_string()));
    }
}
