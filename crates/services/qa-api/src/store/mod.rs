//! Collaborator stores used by the forum service.
//!
//! The document store holds questions, answers and vote records. The
//! preference store holds each user's reputation. The two are independent
//! and share no transaction.
pub mod http_prefs;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use qa_types::{
    Answer, NewAnswer, NewQuestion, NewVote, PrefsPatch, Question, UserPrefs, VoteFilter,
    VoteRecord, VoteStatus,
};

pub use http_prefs::HttpPrefsStore;
pub use memory::{InMemoryDocumentStore, InMemoryPrefsStore};
pub use postgres::{create_pg_pool, PostgresDocumentStore, PostgresPrefsStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("preference service returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Filters for listing questions, newest first.
#[derive(Debug, Clone, Default)]
pub struct QuestionQuery {
    pub tag: Option<String>,
    pub author_id: Option<String>,
    pub limit: Option<u32>,
}

impl QuestionQuery {
    pub fn matches(&self, question: &Question) -> bool {
        self.tag.as_ref().map_or(true, |t| question.tags.contains(t))
            && self.author_id.as_ref().map_or(true, |a| *a == question.author_id)
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Vote records matching every set field of `filter`.
    async fn find_votes(&self, filter: &VoteFilter) -> Result<Vec<VoteRecord>, StoreError>;

    /// Number of vote records matching `filter`.
    async fn count_votes(&self, filter: &VoteFilter) -> Result<u64, StoreError>;

    /// Creates a vote record. Fails with `Conflict` if the voter already
    /// holds a vote on the same target.
    async fn create_vote(&self, vote: NewVote) -> Result<VoteRecord, StoreError>;

    /// Changes the status of an existing vote record.
    async fn update_vote(&self, id: &str, status: VoteStatus) -> Result<VoteRecord, StoreError>;

    async fn delete_vote(&self, id: &str) -> Result<(), StoreError>;

    async fn get_question(&self, id: &str) -> Result<Question, StoreError>;

    async fn create_question(&self, question: NewQuestion) -> Result<Question, StoreError>;

    async fn list_questions(&self, query: &QuestionQuery) -> Result<Vec<Question>, StoreError>;

    async fn get_answer(&self, id: &str) -> Result<Answer, StoreError>;

    async fn create_answer(&self, answer: NewAnswer) -> Result<Answer, StoreError>;

    async fn delete_answer(&self, id: &str) -> Result<(), StoreError>;

    /// Answers to a question, oldest first.
    async fn list_answers(&self, question_id: &str) -> Result<Vec<Answer>, StoreError>;
}

#[async_trait]
pub trait PrefsStore: Send + Sync {
    /// Current preferences. Users without a stored record have reputation 0.
    async fn get_prefs(&self, user_id: &str) -> Result<UserPrefs, StoreError>;

    async fn update_prefs(&self, user_id: &str, patch: PrefsPatch) -> Result<UserPrefs, StoreError>;

    /// Sets reputation to `new` only if it currently equals `expected`.
    /// Returns `false` when another writer got there first.
    ///
    /// The default falls back to read-compare-write, which is not atomic.
    /// Backends with a conditional write primitive override it.
    async fn compare_and_set_reputation(
        &self,
        user_id: &str,
        expected: i64,
        new: i64,
    ) -> Result<bool, StoreError> {
        let current = self.get_prefs(user_id).await?;
        if current.reputation != expected {
            return Ok(false);
        }
        self.update_prefs(user_id, PrefsPatch::reputation(new)).await?;
        Ok(true)
    }
}
