// Turn direction selection
// The random choice is behind a trait so tests and hosts can supply a
// deterministic source

/// A turn direction announced after an accepted classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// Spoken guidance for this direction
    pub fn narration(&self) -> &'static str {
        match self {
            Direction::Left => "Turn left and move forward",
            Direction::Right => "Turn right and move forward",
        }
    }
}

/// Chooses which way to send the user around an obstacle
pub trait DirectionChooser: Send + Sync {
    fn choose(&self) -> Direction;
}

/// Coin-flip chooser used in production
pub struct RandomDirection;

impl DirectionChooser for RandomDirection {
    fn choose(&self) -> Direction {
        if rand::random::<bool>() {
            Direction::Left
        } else {
            Direction::Right
        }
    }
}

/// Always answers the same direction; for tests and guided deployments
pub struct FixedDirection(pub Direction);

impl DirectionChooser for FixedDirection {
    fn choose(&self) -> Direction {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_direction_is_deterministic() {
        let chooser = FixedDirection(Direction::Left);
        for _ in 0..10 {
            assert_eq!(chooser.choose(), Direction::Left);
        }
    }

    #[test]
    fn test_narrations_differ() {
        assert_ne!(Direction::Left.narration(), Direction::Right.narration());
        assert!(Direction::Left.narration().contains("left"));
        assert!(Direction::Right.narration().contains("right"));
    }

    #[test]
    fn test_random_chooser_returns_valid_direction() {
        let chooser = RandomDirection;
        // Either answer is fine; it must simply not panic
        let _ = chooser.choose();
    }
}
