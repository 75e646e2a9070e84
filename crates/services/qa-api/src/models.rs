use chrono::{DateTime, Utc};
use qa_types::{Answer, NewAnswer, NewQuestion, Question, TargetType, UserPrefs, VoteRecord, VoteStatus};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::content::{QuestionDetail, ScoredAnswer};
use crate::store::QuestionQuery;
use crate::votes::{VoteOutcome, VoteRequest};

// Timestamp alias for clarity
pub type Timestamp = DateTime<Utc>;

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VoteBody {
    #[schema(example = "user_a")]
    pub voted_by_id: String,
    #[schema(value_type = String, example = "upvoted")]
    pub vote_status: VoteStatus,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "question")]
    pub target_type: TargetType,
    #[schema(example = "question_abc123")]
    pub type_id: String,
}

impl From<VoteBody> for VoteRequest {
    fn from(body: VoteBody) -> Self {
        VoteRequest {
            voted_by_id: body.voted_by_id,
            vote_status: body.vote_status,
            target_type: body.target_type,
            target_id: body.type_id,
        }
    }
}

/// A vote record as it appears on the wire.
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoteDocument {
    #[schema(example = "vote_4f1c")]
    pub id: String,
    pub voted_by_id: String,
    #[schema(value_type = String, example = "upvoted")]
    pub vote_status: VoteStatus,
    #[serde(rename = "type")]
    #[schema(value_type = String, example = "question")]
    pub target_type: TargetType,
    pub type_id: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<VoteRecord> for VoteDocument {
    fn from(record: VoteRecord) -> Self {
        VoteDocument {
            id: record.id,
            voted_by_id: record.voted_by_id,
            vote_status: record.vote_status,
            target_type: record.target_type,
            type_id: record.target_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VoteData {
    /// `null` after a withdrawal.
    pub document: Option<VoteDocument>,
    #[schema(example = 1)]
    pub vote_result: i64,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct VoteResponse {
    pub data: VoteData,
    #[schema(example = "Voted")]
    pub message: String,
}

impl From<VoteOutcome> for VoteResponse {
    fn from(outcome: VoteOutcome) -> Self {
        VoteResponse {
            message: outcome.message().to_string(),
            data: VoteData {
                document: outcome.document.map(VoteDocument::from),
                vote_result: outcome.vote_result,
            },
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnswerBody {
    #[schema(example = "Wrap it in an Arc.")]
    pub answer: String,
    pub author_id: String,
    pub question_id: String,
}

impl From<CreateAnswerBody> for NewAnswer {
    fn from(body: CreateAnswerBody) -> Self {
        NewAnswer {
            content: body.answer,
            author_id: body.author_id,
            question_id: body.question_id,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAnswerBody {
    #[schema(example = "answer_9a2e")]
    pub answer_id: String,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerView {
    pub id: String,
    /// Answer body.
    pub answer: String,
    pub author_id: String,
    pub question_id: String,
    pub created_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_result: Option<i64>,
}

impl From<Answer> for AnswerView {
    fn from(answer: Answer) -> Self {
        AnswerView {
            id: answer.id,
            answer: answer.content,
            author_id: answer.author_id,
            question_id: answer.question_id,
            created_at: answer.created_at,
            vote_result: None,
        }
    }
}

impl From<ScoredAnswer> for AnswerView {
    fn from(scored: ScoredAnswer) -> Self {
        AnswerView {
            vote_result: Some(scored.vote_result),
            ..AnswerView::from(scored.answer)
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct DeleteAnswerResponse {
    pub data: AnswerView,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionBody {
    #[schema(example = "How do I share state between axum handlers?")]
    pub title: String,
    pub content: String,
    pub author_id: String,
    #[schema(example = json!(["rust", "axum"]))]
    pub tags: Vec<String>,
    #[serde(default)]
    pub attachment_id: Option<String>,
}

impl From<CreateQuestionBody> for NewQuestion {
    fn from(body: CreateQuestionBody) -> Self {
        NewQuestion {
            title: body.title,
            content: body.content,
            author_id: body.author_id,
            tags: body.tags,
            attachment_id: body.attachment_id,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    pub title: String,
    #[schema(example = "how-do-i-share-state-between-axum-handlers")]
    pub slug: String,
    pub content: String,
    pub author_id: String,
    pub tags: Vec<String>,
    pub attachment_id: Option<String>,
    pub created_at: Timestamp,
}

impl From<Question> for QuestionView {
    fn from(question: Question) -> Self {
        QuestionView {
            slug: question.slug(),
            id: question.id,
            title: question.title,
            content: question.content,
            author_id: question.author_id,
            tags: question.tags,
            attachment_id: question.attachment_id,
            created_at: question.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetailView {
    #[serde(flatten)]
    pub question: QuestionView,
    pub vote_result: i64,
    pub answers: Vec<AnswerView>,
}

impl From<QuestionDetail> for QuestionDetailView {
    fn from(detail: QuestionDetail) -> Self {
        QuestionDetailView {
            question: detail.question.into(),
            vote_result: detail.vote_result,
            answers: detail.answers.into_iter().map(AnswerView::from).collect(),
        }
    }
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListQuestionsQuery {
    /// Only questions carrying this tag
    pub tag: Option<String>,
    /// Only questions by this author
    pub author_id: Option<String>,
    /// Maximum number of questions to return
    pub limit: Option<u32>,
}

impl From<ListQuestionsQuery> for QuestionQuery {
    fn from(query: ListQuestionsQuery) -> Self {
        QuestionQuery {
            tag: query.tag,
            author_id: query.author_id,
            limit: query.limit,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, Debug, PartialEq)]
pub struct PrefsView {
    #[schema(example = 42)]
    pub reputation: i64,
}

impl From<UserPrefs> for PrefsView {
    fn from(prefs: UserPrefs) -> Self {
        PrefsView {
            reputation: prefs.reputation,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}
