use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path as AxumPath, Query, State,
    },
    http::StatusCode,
    Json,
};
use qa_types::{NewAnswer, NewQuestion, VoteTransition};

use crate::app::AppState;
use crate::error::ApiError;
use crate::metrics::operations;
use crate::models::*;
use crate::time_op;
use crate::votes::VoteRequest;

// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// POST /vote
#[utoipa::path(
    post,
    path = "/vote",
    request_body = VoteBody,
    responses(
        (status = 201, description = "Vote cast or switched", body = VoteResponse, example = json!({
            "data": {
                "document": {
                    "id": "vote_4f1c",
                    "votedById": "user_a",
                    "voteStatus": "upvoted",
                    "type": "question",
                    "typeId": "question_abc123",
                    "createdAt": "2024-01-01T12:00:00Z",
                    "updatedAt": "2024-01-01T12:00:00Z"
                },
                "voteResult": 1
            },
            "message": "Voted"
        })),
        (status = 200, description = "Vote withdrawn", body = VoteResponse, example = json!({
            "data": { "document": null, "voteResult": 0 },
            "message": "Vote Withdrawn"
        })),
        (status = 400, description = "Malformed or incomplete body", body = ApiError),
        (status = 404, description = "Target question or answer not found", body = ApiError),
        (status = 409, description = "Concurrent update could not be applied", body = ApiError)
    )
)]
pub async fn cast_vote_handler(
    State(state): State<AppState>,
    payload: Result<Json<VoteBody>, JsonRejection>,
) -> Result<(StatusCode, Json<VoteResponse>), ApiError> {
    let Json(body) = payload?;
    let request = VoteRequest::from(body).validate()?;

    let outcome = time_op!(operations::VOTE, { state.votes.cast(request).await })?;

    let status = match outcome.transition {
        VoteTransition::Withdraw(_) => StatusCode::OK,
        VoteTransition::Cast(_) | VoteTransition::Flip { .. } => StatusCode::CREATED,
    };
    Ok((status, Json(VoteResponse::from(outcome))))
}

// POST /answer
#[utoipa::path(
    post,
    path = "/answer",
    request_body = CreateAnswerBody,
    responses(
        (status = 201, description = "Answer created", body = AnswerView),
        (status = 400, description = "Malformed or incomplete body", body = ApiError),
        (status = 404, description = "Question not found", body = ApiError)
    )
)]
pub async fn create_answer_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateAnswerBody>, JsonRejection>,
) -> Result<(StatusCode, Json<AnswerView>), ApiError> {
    let Json(body) = payload?;
    let answer = NewAnswer::from(body).validate()?;

    let answer = time_op!(operations::CREATE_ANSWER, {
        state.content.create_answer(answer).await
    })?;
    Ok((StatusCode::CREATED, Json(answer.into())))
}

// DELETE /answer
#[utoipa::path(
    delete,
    path = "/answer",
    request_body = DeleteAnswerBody,
    responses(
        (status = 200, description = "Answer deleted", body = DeleteAnswerResponse),
        (status = 400, description = "Malformed or incomplete body", body = ApiError),
        (status = 404, description = "Answer not found", body = ApiError)
    )
)]
pub async fn delete_answer_handler(
    State(state): State<AppState>,
    payload: Result<Json<DeleteAnswerBody>, JsonRejection>,
) -> Result<Json<DeleteAnswerResponse>, ApiError> {
    let Json(body) = payload?;
    qa_types::error::require("answerId", &body.answer_id)?;

    let answer = time_op!(operations::DELETE_ANSWER, {
        state.content.delete_answer(&body.answer_id).await
    })?;
    Ok(Json(DeleteAnswerResponse {
        data: answer.into(),
    }))
}

// POST /questions
#[utoipa::path(
    post,
    path = "/questions",
    request_body = CreateQuestionBody,
    responses(
        (status = 201, description = "Question created", body = QuestionView),
        (status = 400, description = "Missing fields or limits exceeded", body = ApiError)
    )
)]
pub async fn create_question_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateQuestionBody>, JsonRejection>,
) -> Result<(StatusCode, Json<QuestionView>), ApiError> {
    let Json(body) = payload?;
    let question = NewQuestion::from(body).validate()?;

    let question = state.content.create_question(question).await?;
    Ok((StatusCode::CREATED, Json(question.into())))
}

// GET /questions
#[utoipa::path(
    get,
    path = "/questions",
    params(ListQuestionsQuery),
    responses(
        (status = 200, description = "Questions, newest first", body = Vec<QuestionView>)
    )
)]
pub async fn list_questions_handler(
    State(state): State<AppState>,
    query: Result<Query<ListQuestionsQuery>, QueryRejection>,
) -> Result<Json<Vec<QuestionView>>, ApiError> {
    let Query(query) = query?;
    let questions = state.content.list_questions(&query.into()).await?;
    Ok(Json(questions.into_iter().map(QuestionView::from).collect()))
}

// GET /questions/:id
#[utoipa::path(
    get,
    path = "/questions/{id}",
    params(
        ("id" = String, Path, description = "Question id")
    ),
    responses(
        (status = 200, description = "Question with score and answers", body = QuestionDetailView),
        (status = 404, description = "Question not found", body = ApiError)
    )
)]
pub async fn get_question_detail_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<QuestionDetailView>, ApiError> {
    let detail = state.content.question_detail(&id).await?;
    Ok(Json(detail.into()))
}

// GET /users/:id/prefs
#[utoipa::path(
    get,
    path = "/users/{id}/prefs",
    params(
        ("id" = String, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User reputation", body = PrefsView)
    )
)]
pub async fn get_prefs_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<PrefsView>, ApiError> {
    let prefs = state.content.get_prefs(&id).await?;
    Ok(Json(prefs.into()))
}
