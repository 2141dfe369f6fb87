use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Overall skill rank of a user. Totally ordered: `None < Beginner < Intermediate < Expert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum SkillLevel {
    #[default]
    None,
    Beginner,
    Intermediate,
    Expert,
}

impl SkillLevel {
    pub fn rank(self) -> i32 {
        match self {
            SkillLevel::None => 0,
            SkillLevel::Beginner => 1,
            SkillLevel::Intermediate => 2,
            SkillLevel::Expert => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SkillLevel::None => "None",
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Expert => "Expert",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(SkillLevel::None),
            other => Level::from_str(other).map(SkillLevel::from),
        }
    }
}

impl From<Level> for SkillLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Beginner => SkillLevel::Beginner,
            Level::Intermediate => SkillLevel::Intermediate,
            Level::Expert => SkillLevel::Expert,
        }
    }
}

/// Awardable level. Keys lesson scores, badges and leaderboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Beginner,
    Intermediate,
    Expert,
}

/// Lesson-score partition (collection) per level, indexed by discriminant.
const LESSON_PARTITIONS: [&str; 3] = [
    "lesson_scores_beginner",
    "lesson_scores_intermediate",
    "lesson_scores_expert",
];

impl Level {
    pub const ALL: [Level; 3] = [Level::Beginner, Level::Intermediate, Level::Expert];

    pub fn as_str(self) -> &'static str {
        SkillLevel::from(self).as_str()
    }

    pub fn lesson_partition(self) -> &'static str {
        LESSON_PARTITIONS[self as usize]
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "expert" => Ok(Level::Expert),
            _ => Err(UnknownLevel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown skill level: {0:?}")]
pub struct UnknownLevel(pub String);
