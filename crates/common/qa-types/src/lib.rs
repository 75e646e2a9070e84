//! # QA Types
//! Shared data structures for the Q&A forum: questions, answers, vote records,
//! user preferences, and the rules that turn a vote action into a vote-record
//! mutation plus reputation changes.
pub mod content;
pub mod error;
pub mod prefs;
pub mod slug;
pub mod vote;

pub use content::{Answer, NewAnswer, NewQuestion, Question};
pub use error::ValidationError;
pub use prefs::{PrefsPatch, UserPrefs};
pub use slug::slugify;
pub use vote::{vote_score, NewVote, TargetType, VoteFilter, VoteRecord, VoteStatus, VoteTransition};
