//! Streak transition applied whenever a habit's week vector is written.

use crate::models::WEEK_DAYS;

/// Next streak value given the previous one and the vector being written.
///
/// The transition runs on every update, not on week rollover: a write that
/// leaves the week fully checked increments the streak, a write that leaves
/// any day unchecked resets it to zero. Each write is a transition, not a
/// state assertion, so repeating an all-true write keeps incrementing.
pub fn next_streak(previous: u32, days_checked: &[bool; WEEK_DAYS]) -> u32 {
    if days_checked.iter().all(|done| *done) {
        previous + 1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_week_increments() {
        assert_eq!(next_streak(0, &[true; WEEK_DAYS]), 1);
        assert_eq!(next_streak(4, &[true; WEEK_DAYS]), 5);
    }

    #[test]
    fn any_unchecked_day_resets() {
        let mut days = [true; WEEK_DAYS];
        days[3] = false;
        assert_eq!(next_streak(0, &days), 0);
        assert_eq!(next_streak(12, &days), 0);
        assert_eq!(next_streak(1, &[false; WEEK_DAYS]), 0);
    }

    #[test]
    fn transition_is_not_idempotent() {
        // Two consecutive all-true writes count twice.
        let once = next_streak(0, &[true; WEEK_DAYS]);
        let twice = next_streak(once, &[true; WEEK_DAYS]);
        assert_eq!(twice, 2);
    }
}
