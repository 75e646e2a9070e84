use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::content::ContentService;
use crate::error::ApiError;
use crate::handlers::{
    cast_vote_handler, create_answer_handler, create_question_handler, delete_answer_handler,
    get_prefs_handler, get_question_detail_handler, health_check_handler, list_questions_handler,
};
use crate::models::{
    AnswerView, CreateAnswerBody, CreateQuestionBody, DeleteAnswerBody, DeleteAnswerResponse,
    HealthResponse, PrefsView, QuestionDetailView, QuestionView, VoteBody, VoteData, VoteDocument,
    VoteResponse,
};
use crate::reputation::ReputationUpdater;
use crate::store::{DocumentStore, PrefsStore};
use crate::votes::VoteEngine;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health_check_handler,
        crate::handlers::cast_vote_handler,
        crate::handlers::create_answer_handler, crate::handlers::delete_answer_handler,
        crate::handlers::create_question_handler, crate::handlers::list_questions_handler,
        crate::handlers::get_question_detail_handler,
        crate::handlers::get_prefs_handler
    ),
    components(
        schemas(
            VoteBody, VoteDocument, VoteData, VoteResponse,
            CreateAnswerBody, DeleteAnswerBody, AnswerView, DeleteAnswerResponse,
            CreateQuestionBody, QuestionView, QuestionDetailView,
            PrefsView, HealthResponse,
            ApiError
        )
    ),
    tags(
        (name = "QA Forum API", description = "Questions, answers, votes and reputation")
    )
)]
pub struct ApiDoc;

/// Shared handler state. Cheap to clone; the stores sit behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub votes: VoteEngine,
    pub content: ContentService,
}

impl AppState {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        prefs: Arc<dyn PrefsStore>,
        max_reputation_attempts: u32,
    ) -> Self {
        let reputation = ReputationUpdater::new(prefs, max_reputation_attempts);
        Self {
            votes: VoteEngine::new(documents.clone(), reputation.clone()),
            content: ContentService::new(documents, reputation),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health_check_handler))
        .route("/vote", post(cast_vote_handler))
        .route(
            "/answer",
            post(create_answer_handler).delete(delete_answer_handler),
        )
        .route(
            "/questions",
            get(list_questions_handler).post(create_question_handler),
        )
        .route("/questions/:id", get(get_question_detail_handler))
        .route("/users/:id/prefs", get(get_prefs_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
