// Step counting toward the destination room
// Routes come in as two room numbers parsed from recognized speech

use crate::constants::{MILESTONE_INTERVAL, NEAR_DESTINATION_STEPS, STEPS_PER_ROOM};
use crate::speech::phrases;
use regex::Regex;
use serde::Serialize;

/// Narration trigger produced by a step advance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Narration {
    /// stepsRemaining reached zero
    Arrived,
    /// stepsRemaining is in the near window (1..=NEAR_DESTINATION_STEPS)
    NearDestination,
    /// stepsRemaining hit a milestone multiple above the near window
    StepsAway(u32),
}

impl Narration {
    /// The spoken form of this narration
    pub fn phrase(&self) -> String {
        match self {
            Narration::Arrived => phrases::ARRIVED.to_string(),
            Narration::NearDestination => phrases::NEAR_DESTINATION.to_string(),
            Narration::StepsAway(n) => phrases::steps_away(*n),
        }
    }
}

/// Extract the first two integers from free-form recognized speech
///
/// Anything without two numbers is not a route; the caller speaks the retry
/// prompt.
pub fn parse_rooms(text: &str) -> Option<(i32, i32)> {
    // Room numbers are small; ignore tokens that overflow i32
    let re = Regex::new(r"\d+").ok()?;
    let mut nums = re
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<i32>().ok());
    let start = nums.next()?;
    let dest = nums.next()?;
    Some((start, dest))
}

/// Tracks remaining steps and produces narration triggers on thresholds
///
/// Owned by the top-level coordinator; a new `set_route` resets it, and only
/// `advance` ever mutates the count, by exactly one.
#[derive(Debug, Clone)]
pub struct NavigationCounter {
    start_room: i32,
    dest_room: i32,
    steps_per_room: u32,
    steps_remaining: u32,
}

impl NavigationCounter {
    /// Create a counter with no route set
    pub fn new() -> Self {
        Self::with_steps_per_room(STEPS_PER_ROOM)
    }

    /// Create a counter with a custom steps-per-room calibration
    pub fn with_steps_per_room(steps_per_room: u32) -> Self {
        Self {
            start_room: 0,
            dest_room: 0,
            steps_per_room,
            steps_remaining: 0,
        }
    }

    /// Set (or replace) the route; returns the total step count
    ///
    /// Room numbers come out of free-form recognized speech, so a pair whose
    /// step count overflows is misrecognition, not a walkable route; it is
    /// rejected and the current route kept.
    pub fn set_route(&mut self, start_room: i32, dest_room: i32) -> Option<u32> {
        let total = self
            .steps_per_room
            .checked_mul(start_room.abs_diff(dest_room))?;
        self.start_room = start_room;
        self.dest_room = dest_room;
        self.steps_remaining = total;
        crate::info!(
            "[navigation] Route set {} -> {}, {} steps",
            start_room,
            dest_room,
            total
        );
        Some(total)
    }

    /// Steps left to the destination
    pub fn steps_remaining(&self) -> u32 {
        self.steps_remaining
    }

    /// Room numbers of the current route
    #[allow(dead_code)] // Utility accessor for status checks
    pub fn route(&self) -> (i32, i32) {
        (self.start_room, self.dest_room)
    }

    /// Record one step taken; returns at most one narration trigger
    ///
    /// A no-op once the count has reached zero. Thresholds are evaluated in
    /// priority order after the decrement; the highest-priority match wins.
    pub fn advance(&mut self) -> Option<Narration> {
        if self.steps_remaining == 0 {
            return None;
        }
        self.steps_remaining -= 1;

        let remaining = self.steps_remaining;
        if remaining == 0 {
            Some(Narration::Arrived)
        } else if remaining <= NEAR_DESTINATION_STEPS {
            Some(Narration::NearDestination)
        } else if remaining % MILESTONE_INTERVAL == 0 {
            Some(Narration::StepsAway(remaining))
        } else {
            None
        }
    }
}

impl Default for NavigationCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_route_computes_total() {
        let mut nav = NavigationCounter::new();
        assert_eq!(nav.set_route(302, 307), Some(75));
        assert_eq!(nav.steps_remaining(), 75);
    }

    #[test]
    fn test_reversed_route_is_positive() {
        let mut nav = NavigationCounter::new();
        assert_eq!(nav.set_route(307, 302), Some(75));
    }

    #[test]
    fn test_overflowing_route_rejected_and_old_route_kept() {
        let mut nav = NavigationCounter::new();
        nav.set_route(302, 307).unwrap();

        // Misrecognized speech can hand over arbitrarily large numbers
        assert_eq!(nav.set_route(0, 300_000_000), None);
        assert_eq!(nav.route(), (302, 307));
        assert_eq!(nav.steps_remaining(), 75);
    }

    #[test]
    fn test_full_walk_narration_schedule() {
        let mut nav = NavigationCounter::new();
        nav.set_route(302, 307).unwrap();

        let mut arrived = 0;
        let mut near = Vec::new();
        let mut milestones = Vec::new();
        for _ in 0..75 {
            match nav.advance() {
                Some(Narration::Arrived) => arrived += 1,
                Some(Narration::NearDestination) => near.push(nav.steps_remaining()),
                Some(Narration::StepsAway(n)) => milestones.push(n),
                None => {}
            }
        }

        assert_eq!(arrived, 1);
        assert_eq!(near, vec![5, 4, 3, 2, 1]);
        assert_eq!(milestones, vec![70, 60, 50, 40, 30, 20, 10]);
        assert_eq!(nav.steps_remaining(), 0);
    }

    #[test]
    fn test_advance_past_zero_is_noop() {
        let mut nav = NavigationCounter::with_steps_per_room(1);
        nav.set_route(1, 2).unwrap();
        assert_eq!(nav.advance(), Some(Narration::Arrived));
        assert_eq!(nav.advance(), None);
        assert_eq!(nav.steps_remaining(), 0);
    }

    #[test]
    fn test_new_route_resets_count() {
        let mut nav = NavigationCounter::new();
        nav.set_route(302, 307).unwrap();
        nav.advance();
        nav.advance();

        assert_eq!(nav.set_route(100, 102), Some(30));
        assert_eq!(nav.steps_remaining(), 30);
    }

    #[test]
    fn test_arrived_wins_over_lower_priority_thresholds_at_zero() {
        // Zero is both a milestone multiple and inside the near window;
        // Arrived has the highest priority
        let mut nav = NavigationCounter::with_steps_per_room(10);
        nav.set_route(0, 1).unwrap();
        for _ in 0..9 {
            nav.advance();
        }
        assert_eq!(nav.advance(), Some(Narration::Arrived));
    }

    #[test]
    fn test_parse_rooms_from_speech() {
        assert_eq!(parse_rooms("302 to 307"), Some((302, 307)));
        assert_eq!(parse_rooms("from room 12 go to room 19 please"), Some((12, 19)));
    }

    #[test]
    fn test_parse_rooms_requires_two_numbers() {
        assert_eq!(parse_rooms("just room 302"), None);
        assert_eq!(parse_rooms("no numbers here"), None);
        assert_eq!(parse_rooms(""), None);
    }

    #[test]
    fn test_narration_phrases() {
        assert_eq!(Narration::Arrived.phrase(), "You have reached the destination");
        assert_eq!(
            Narration::NearDestination.phrase(),
            "You are near the destination"
        );
        assert_eq!(Narration::StepsAway(30).phrase(), "30 steps away");
    }
}
