pub mod chat;
pub mod progression;
pub mod quiz;
pub mod skill;
pub mod user;

pub use progression::{Badge, BadgeAward, LessonQuizRecord, LessonScoreOutcome, SkillTransition};
pub use quiz::{AnsweredQuestion, Question, Quiz, QuizAttempt};
pub use skill::{Level, SkillLevel};
pub use user::Account;
