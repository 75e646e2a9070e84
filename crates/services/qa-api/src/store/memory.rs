use async_trait::async_trait;
use chrono::Utc;
use qa_types::{
    Answer, NewAnswer, NewQuestion, NewVote, PrefsPatch, Question, UserPrefs, VoteFilter,
    VoteRecord, VoteStatus,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentStore, PrefsStore, QuestionQuery, StoreError};

#[derive(Debug, Default)]
struct Collections {
    questions: HashMap<String, Question>,
    answers: HashMap<String, Answer>,
    votes: HashMap<String, VoteRecord>,
}

/// Document store kept in process memory. Used by default and in tests.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<Collections>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_votes(&self, filter: &VoteFilter) -> Result<Vec<VoteRecord>, StoreError> {
        let guard = self.inner.read().await;
        let mut votes: Vec<VoteRecord> = guard
            .votes
            .values()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect();
        votes.sort_by_key(|v| v.created_at);
        Ok(votes)
    }

    async fn count_votes(&self, filter: &VoteFilter) -> Result<u64, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.votes.values().filter(|v| filter.matches(v)).count() as u64)
    }

    async fn create_vote(&self, vote: NewVote) -> Result<VoteRecord, StoreError> {
        let mut guard = self.inner.write().await;

        let existing = VoteFilter::voter_on_target(
            vote.voted_by_id.clone(),
            vote.target_type,
            vote.target_id.clone(),
        );
        if guard.votes.values().any(|v| existing.matches(v)) {
            return Err(StoreError::Conflict(format!(
                "{} already voted on {} {}",
                vote.voted_by_id, vote.target_type, vote.target_id
            )));
        }

        let now = Utc::now();
        let record = VoteRecord {
            id: format!("vote_{}", Uuid::new_v4()),
            voted_by_id: vote.voted_by_id,
            vote_status: vote.vote_status,
            target_type: vote.target_type,
            target_id: vote.target_id,
            created_at: now,
            updated_at: now,
        };
        guard.votes.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_vote(&self, id: &str, status: VoteStatus) -> Result<VoteRecord, StoreError> {
        let mut guard = self.inner.write().await;
        let record = guard
            .votes
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("vote", id))?;
        record.vote_status = status;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete_vote(&self, id: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard
            .votes
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("vote", id))
    }

    async fn get_question(&self, id: &str) -> Result<Question, StoreError> {
        let guard = self.inner.read().await;
        guard
            .questions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("question", id))
    }

    async fn create_question(&self, question: NewQuestion) -> Result<Question, StoreError> {
        let record = Question {
            id: format!("question_{}", Uuid::new_v4()),
            title: question.title,
            content: question.content,
            author_id: question.author_id,
            tags: question.tags,
            attachment_id: question.attachment_id,
            created_at: Utc::now(),
        };
        let mut guard = self.inner.write().await;
        guard.questions.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn list_questions(&self, query: &QuestionQuery) -> Result<Vec<Question>, StoreError> {
        let guard = self.inner.read().await;
        let mut questions: Vec<Question> = guard
            .questions
            .values()
            .filter(|q| query.matches(q))
            .cloned()
            .collect();
        questions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        questions.truncate(query.limit.unwrap_or(u32::MAX) as usize);
        Ok(questions)
    }

    async fn get_answer(&self, id: &str) -> Result<Answer, StoreError> {
        let guard = self.inner.read().await;
        guard
            .answers
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("answer", id))
    }

    async fn create_answer(&self, answer: NewAnswer) -> Result<Answer, StoreError> {
        let record = Answer {
            id: format!("answer_{}", Uuid::new_v4()),
            content: answer.content,
            author_id: answer.author_id,
            question_id: answer.question_id,
            created_at: Utc::now(),
        };
        let mut guard = self.inner.write().await;
        guard.answers.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn delete_answer(&self, id: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard
            .answers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("answer", id))
    }

    async fn list_answers(&self, question_id: &str) -> Result<Vec<Answer>, StoreError> {
        let guard = self.inner.read().await;
        let mut answers: Vec<Answer> = guard
            .answers
            .values()
            .filter(|a| a.question_id == question_id)
            .cloned()
            .collect();
        answers.sort_by_key(|a| a.created_at);
        Ok(answers)
    }
}

/// Preference store kept in process memory.
///
/// Conditional reputation writes happen under a single write lock, so
/// concurrent adjustments never overwrite each other.
#[derive(Debug, Default)]
pub struct InMemoryPrefsStore {
    prefs: RwLock<HashMap<String, UserPrefs>>,
}

impl InMemoryPrefsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-populated with the given reputations.
    pub fn with_reputations<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let prefs = entries
            .into_iter()
            .map(|(user, reputation)| (user.into(), UserPrefs { reputation }))
            .collect();
        Self {
            prefs: RwLock::new(prefs),
        }
    }
}

#[async_trait]
impl PrefsStore for InMemoryPrefsStore {
    async fn get_prefs(&self, user_id: &str) -> Result<UserPrefs, StoreError> {
        let guard = self.prefs.read().await;
        Ok(guard.get(user_id).copied().unwrap_or_default())
    }

    async fn update_prefs(&self, user_id: &str, patch: PrefsPatch) -> Result<UserPrefs, StoreError> {
        let mut guard = self.prefs.write().await;
        let prefs = guard.entry(user_id.to_string()).or_default();
        patch.apply(prefs);
        Ok(*prefs)
    }

    async fn compare_and_set_reputation(
        &self,
        user_id: &str,
        expected: i64,
        new: i64,
    ) -> Result<bool, StoreError> {
        let mut guard = self.prefs.write().await;
        let prefs = guard.entry(user_id.to_string()).or_default();
        if prefs.reputation != expected {
            return Ok(false);
        }
        prefs.reputation = new;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_types::TargetType;

    fn new_vote(voter: &str, status: VoteStatus) -> NewVote {
        NewVote {
            voted_by_id: voter.to_string(),
            vote_status: status,
            target_type: TargetType::Question,
            target_id: "q1".to_string(),
        }
    }

    #[tokio::test]
    async fn second_vote_from_same_voter_conflicts() {
        let store = InMemoryDocumentStore::new();
        store.create_vote(new_vote("alice", VoteStatus::Upvoted)).await.unwrap();

        let err = store
            .create_vote(new_vote("alice", VoteStatus::Downvoted))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        store.create_vote(new_vote("bob", VoteStatus::Downvoted)).await.unwrap();
        let all = store
            .count_votes(&VoteFilter::target(TargetType::Question, "q1"))
            .await
            .unwrap();
        assert_eq!(all, 2);
    }

    #[tokio::test]
    async fn update_and_delete_missing_vote_are_not_found() {
        let store = InMemoryDocumentStore::new();
        assert!(matches!(
            store.update_vote("nope", VoteStatus::Upvoted).await,
            Err(StoreError::NotFound { kind: "vote", .. })
        ));
        assert!(matches!(
            store.delete_vote("nope").await,
            Err(StoreError::NotFound { kind: "vote", .. })
        ));
    }

    #[tokio::test]
    async fn count_respects_status_filter() {
        let store = InMemoryDocumentStore::new();
        store.create_vote(new_vote("alice", VoteStatus::Upvoted)).await.unwrap();
        store.create_vote(new_vote("bob", VoteStatus::Upvoted)).await.unwrap();
        store.create_vote(new_vote("carol", VoteStatus::Downvoted)).await.unwrap();

        let target = VoteFilter::target(TargetType::Question, "q1");
        let up = store
            .count_votes(&target.clone().with_status(VoteStatus::Upvoted))
            .await
            .unwrap();
        let down = store
            .count_votes(&target.with_status(VoteStatus::Downvoted))
            .await
            .unwrap();
        assert_eq!((up, down), (2, 1));
    }

    #[tokio::test]
    async fn list_questions_filters_and_limits() {
        let store = InMemoryDocumentStore::new();
        for (title, tag) in [("first", "rust"), ("second", "go"), ("third", "rust")] {
            store
                .create_question(NewQuestion {
                    title: title.to_string(),
                    content: "body".to_string(),
                    author_id: "user_b".to_string(),
                    tags: vec![tag.to_string()],
                    attachment_id: None,
                })
                .await
                .unwrap();
        }

        let rust = store
            .list_questions(&QuestionQuery {
                tag: Some("rust".to_string()),
                ..QuestionQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(rust.len(), 2);
        assert!(rust.iter().all(|q| q.tags.contains(&"rust".to_string())));

        let limited = store
            .list_questions(&QuestionQuery {
                limit: Some(1),
                ..QuestionQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn prefs_default_to_zero_and_cas_checks_expected_value() {
        let store = InMemoryPrefsStore::with_reputations([("user_b", 5)]);
        assert_eq!(store.get_prefs("stranger").await.unwrap().reputation, 0);

        assert!(!store.compare_and_set_reputation("user_b", 4, 10).await.unwrap());
        assert_eq!(store.get_prefs("user_b").await.unwrap().reputation, 5);

        assert!(store.compare_and_set_reputation("user_b", 5, 6).await.unwrap());
        assert_eq!(store.get_prefs("user_b").await.unwrap().reputation, 6);
    }
}
