use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Difficulty of a lab work. [`Difficulty::ALL`] lists the levels from easiest
/// to hardest and is the only ordering: comparison, rank and decrement all read it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    VeryEasy,
    Easy,
    Insane,
    Hopeless,
}

impl Difficulty {
    pub const ALL: [Self; 4] = [Self::VeryEasy, Self::Easy, Self::Insane, Self::Hopeless];

    /// Position in [`Difficulty::ALL`], `0` being the easiest level.
    #[must_use]
    pub fn ordinal(self) -> usize {
        Self::ALL.iter().position(|level| *level == self).unwrap_or(0)
    }

    /// Ranking weight; a higher value is harder.
    #[must_use]
    pub fn rank(self) -> i64 {
        i64::try_from(self.ordinal()).unwrap_or(i64::MAX)
    }

    #[must_use]
    pub fn from_ordinal(ordinal: usize) -> Option<Self> {
        Self::ALL.get(ordinal).copied()
    }

    /// Rejects a decrement of fewer than one level.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidArgument`] when `steps < 1`.
    pub fn check_steps(steps: i64) -> Result<(), DomainError> {
        if steps < 1 {
            return Err(DomainError::InvalidArgument("steps must be >= 1".to_string()));
        }
        Ok(())
    }

    /// Move `steps` levels towards [`Difficulty::VeryEasy`], clamping at the floor.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidArgument`] when `steps < 1`.
    pub fn decrease(self, steps: i64) -> Result<Self, DomainError> {
        Self::check_steps(steps)?;
        let steps = usize::try_from(steps).unwrap_or(usize::MAX);
        Ok(Self::from_ordinal(self.ordinal().saturating_sub(steps)).unwrap_or(Self::VeryEasy))
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryEasy => "VERY_EASY",
            Self::Easy => "EASY",
            Self::Insane => "INSANE",
            Self::Hopeless => "HOPELESS",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "VERY_EASY" => Some(Self::VeryEasy),
            "EASY" => Some(Self::Easy),
            "INSANE" => Some(Self::Insane),
            "HOPELESS" => Some(Self::Hopeless),
            _ => None,
        }
    }
}

impl PartialOrd for Difficulty {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Difficulty {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal().cmp(&other.ordinal())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn any_difficulty() -> impl Strategy<Value = Difficulty> {
        prop::sample::select(Difficulty::ALL.to_vec())
    }

    #[test]
    fn all_is_ordered_easiest_to_hardest() {
        for pair in Difficulty::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].rank() < pair[1].rank());
        }
        for (index, level) in Difficulty::ALL.iter().enumerate() {
            assert_eq!(level.ordinal(), index);
            assert_eq!(Difficulty::from_ordinal(index), Some(*level));
        }
        assert_eq!(Difficulty::from_ordinal(4), None);
    }

    #[test]
    fn decrease_moves_down_and_clamps_at_floor() -> Result<(), DomainError> {
        assert_eq!(Difficulty::Hopeless.decrease(1)?, Difficulty::Insane);
        assert_eq!(Difficulty::Hopeless.decrease(2)?, Difficulty::Easy);
        assert_eq!(Difficulty::Insane.decrease(5)?, Difficulty::VeryEasy);
        assert_eq!(Difficulty::VeryEasy.decrease(1)?, Difficulty::VeryEasy);
        assert_eq!(Difficulty::Easy.decrease(i64::MAX)?, Difficulty::VeryEasy);
        Ok(())
    }

    #[test]
    fn check_steps_accepts_only_positive_counts() {
        assert_eq!(Difficulty::check_steps(1), Ok(()));
        assert_eq!(Difficulty::check_steps(i64::MAX), Ok(()));
        assert!(matches!(Difficulty::check_steps(0), Err(DomainError::InvalidArgument(_))));
    }

    #[test]
    fn decrease_rejects_non_positive_steps() {
        for steps in [0, -1, i64::MIN] {
            match Difficulty::Insane.decrease(steps) {
                Err(DomainError::InvalidArgument(message)) => {
                    assert!(message.contains("steps must be >= 1"));
                }
                other => panic!("expected invalid argument for steps={steps}, got {other:?}"),
            }
        }
    }

    #[test]
    fn names_round_trip_through_parse_and_serde() {
        for level in Difficulty::ALL {
            assert_eq!(Difficulty::parse(level.as_str()), Some(level));
            let json = serde_json::to_string(&level)
                .unwrap_or_else(|err| panic!("difficulty should serialize: {err}"));
            assert_eq!(json, format!("\"{}\"", level.as_str()));
        }
        assert_eq!(Difficulty::parse("very_easy"), None);
    }

    proptest! {
        #[test]
        fn property_decrease_is_monotonic_in_steps(
            level in any_difficulty(),
            s1 in 1_i64..16,
            extra in 0_i64..16,
        ) {
            let s2 = s1 + extra;
            let fewer = level.decrease(s1);
            let more = level.decrease(s2);
            prop_assert!(fewer.is_ok());
            prop_assert!(more.is_ok());
            let fewer = fewer.unwrap_or(Difficulty::VeryEasy);
            let more = more.unwrap_or(Difficulty::VeryEasy);
            prop_assert!(fewer >= more);
            prop_assert!(fewer <= level);
        }

        #[test]
        fn property_floor_is_a_fixed_point(steps in 1_i64..i64::MAX) {
            prop_assert_eq!(Difficulty::VeryEasy.decrease(steps), Ok(Difficulty::VeryEasy));
        }
    }
}
