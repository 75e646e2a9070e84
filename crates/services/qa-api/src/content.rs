use futures::future::try_join_all;
use std::sync::Arc;

use qa_types::{Answer, NewAnswer, NewQuestion, Question, TargetType, UserPrefs};

use crate::reputation::ReputationUpdater;
use crate::store::{DocumentStore, QuestionQuery, StoreError};
use crate::votes::target_score;

/// Reputation granted for posting an answer, taken back when it is deleted.
pub const ANSWER_REPUTATION: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredAnswer {
    pub answer: Answer,
    pub vote_result: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDetail {
    pub question: Question,
    pub vote_result: i64,
    pub answers: Vec<ScoredAnswer>,
}

/// Questions, answers and the reputation side effects of posting them.
#[derive(Clone)]
pub struct ContentService {
    documents: Arc<dyn DocumentStore>,
    reputation: ReputationUpdater,
}

impl ContentService {
    pub fn new(documents: Arc<dyn DocumentStore>, reputation: ReputationUpdater) -> Self {
        Self {
            documents,
            reputation,
        }
    }

    pub async fn create_question(&self, question: NewQuestion) -> Result<Question, StoreError> {
        let question = self.documents.create_question(question).await?;
        tracing::info!(question_id = %question.id, author_id = %question.author_id, "question created");
        Ok(question)
    }

    pub async fn list_questions(&self, query: &QuestionQuery) -> Result<Vec<Question>, StoreError> {
        self.documents.list_questions(query).await
    }

    pub async fn question_detail(&self, id: &str) -> Result<QuestionDetail, StoreError> {
        let question = self.documents.get_question(id).await?;
        let vote_result = target_score(self.documents.as_ref(), TargetType::Question, id).await?;

        let answers = try_join_all(self.documents.list_answers(id).await?.into_iter().map(
            |answer| async move {
                let vote_result =
                    target_score(self.documents.as_ref(), TargetType::Answer, &answer.id).await?;
                Ok::<_, StoreError>(ScoredAnswer {
                    answer,
                    vote_result,
                })
            },
        ))
        .await?;

        Ok(QuestionDetail {
            question,
            vote_result,
            answers,
        })
    }

    /// Stores an answer to an existing question and credits its author.
    pub async fn create_answer(&self, answer: NewAnswer) -> Result<Answer, StoreError> {
        self.documents.get_question(&answer.question_id).await?;

        let answer = self.documents.create_answer(answer).await?;
        self.reputation
            .adjust(&answer.author_id, ANSWER_REPUTATION)
            .await?;
        tracing::info!(
            answer_id = %answer.id,
            question_id = %answer.question_id,
            author_id = %answer.author_id,
            "answer created"
        );
        Ok(answer)
    }

    /// Removes an answer and takes back the reputation its author earned for it.
    pub async fn delete_answer(&self, id: &str) -> Result<Answer, StoreError> {
        let answer = self.documents.get_answer(id).await?;
        self.documents.delete_answer(id).await?;
        self.reputation
            .adjust(&answer.author_id, -ANSWER_REPUTATION)
            .await?;
        tracing::info!(answer_id = %answer.id, author_id = %answer.author_id, "answer deleted");
        Ok(answer)
    }

    pub async fn get_prefs(&self, user_id: &str) -> Result<UserPrefs, StoreError> {
        self.reputation.prefs().get_prefs(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryDocumentStore, InMemoryPrefsStore, PrefsStore};
    use crate::votes::{VoteEngine, VoteRequest};
    use qa_types::VoteStatus;

    fn service() -> (ContentService, VoteEngine, Arc<InMemoryPrefsStore>) {
        let documents = Arc::new(InMemoryDocumentStore::new());
        let prefs = Arc::new(InMemoryPrefsStore::with_reputations([("asker", 3)]));
        let reputation = ReputationUpdater::new(prefs.clone(), 5);
        (
            ContentService::new(documents.clone(), reputation.clone()),
            VoteEngine::new(documents, reputation),
            prefs,
        )
    }

    fn question() -> NewQuestion {
        NewQuestion {
            title: "Why is my future not Send?".to_string(),
            content: "It holds an Rc across an await".to_string(),
            author_id: "asker".to_string(),
            tags: vec!["async".to_string()],
            attachment_id: None,
        }
    }

    fn answer(question_id: &str, author: &str) -> NewAnswer {
        NewAnswer {
            content: "Use Arc".to_string(),
            author_id: author.to_string(),
            question_id: question_id.to_string(),
        }
    }

    #[tokio::test]
    async fn answering_credits_and_deleting_debits() {
        let (service, _, _) = service();
        let q = service.create_question(question()).await.unwrap();

        let a = service.create_answer(answer(&q.id, "helper")).await.unwrap();
        assert_eq!(service.get_prefs("helper").await.unwrap().reputation, 1);

        let deleted = service.delete_answer(&a.id).await.unwrap();
        assert_eq!(deleted.id, a.id);
        assert_eq!(service.get_prefs("helper").await.unwrap().reputation, 0);
    }

    #[tokio::test]
    async fn answering_missing_question_fails_without_credit() {
        let (service, _, prefs) = service();
        let err = service
            .create_answer(answer("question_missing", "helper"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "question", .. }));
        assert_eq!(prefs.get_prefs("helper").await.unwrap().reputation, 0);
    }

    #[tokio::test]
    async fn deleting_missing_answer_is_not_found() {
        let (service, _, prefs) = service();
        let err = service.delete_answer("answer_missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "answer", .. }));
        assert_eq!(prefs.get_prefs("asker").await.unwrap().reputation, 3);
    }

    #[tokio::test]
    async fn detail_includes_scores_for_question_and_answers() {
        let (service, engine, _) = service();
        let q = service.create_question(question()).await.unwrap();
        let first = service.create_answer(answer(&q.id, "helper")).await.unwrap();
        service.create_answer(answer(&q.id, "other")).await.unwrap();

        for (voter, status, target_type, target_id) in [
            ("v1", VoteStatus::Upvoted, TargetType::Question, q.id.clone()),
            ("v2", VoteStatus::Upvoted, TargetType::Question, q.id.clone()),
            ("v1", VoteStatus::Downvoted, TargetType::Answer, first.id.clone()),
        ] {
            engine
                .cast(VoteRequest {
                    voted_by_id: voter.to_string(),
                    vote_status: status,
                    target_type,
                    target_id,
                })
                .await
                .unwrap();
        }

        let detail = service.question_detail(&q.id).await.unwrap();
        assert_eq!(detail.vote_result, 2);
        assert_eq!(detail.answers.len(), 2);
        let scored = detail
            .answers
            .iter()
            .find(|a| a.answer.id == first.id)
            .unwrap();
        assert_eq!(scored.vote_result, -1);
    }
}
