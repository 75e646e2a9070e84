// Integration tests for the forum API, driven over HTTP
use qa_api::{
    app::{create_app, AppState},
    store::{InMemoryDocumentStore, InMemoryPrefsStore},
};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

// Helper function to spawn the app in the background
async fn spawn_app(reputations: &[(&str, i64)]) -> (String, JoinHandle<()>) {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let prefs = Arc::new(InMemoryPrefsStore::with_reputations(
        reputations.iter().map(|(user, rep)| (user.to_string(), *rep)),
    ));
    let app = create_app(AppState::new(documents, prefs, 5));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap(); // Bind to a random available port
    let server_url = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (server_url, handle)
}

async fn create_question(client: &Client, server_url: &str, author_id: &str) -> Value {
    let response = client
        .post(format!("{}/questions", server_url))
        .json(&json!({
            "title": "What does Pin actually guarantee?",
            "content": "The docs confuse me.",
            "authorId": author_id,
            "tags": ["rust", "async", "rust"]
        }))
        .send()
        .await
        .expect("Failed to send create question request");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse question")
}

async fn vote(
    client: &Client,
    server_url: &str,
    voter: &str,
    status: &str,
    target_type: &str,
    target_id: &str,
) -> (StatusCode, Value) {
    let response = client
        .post(format!("{}/vote", server_url))
        .json(&json!({
            "votedById": voter,
            "voteStatus": status,
            "type": target_type,
            "typeId": target_id
        }))
        .send()
        .await
        .expect("Failed to send vote request");
    let status = response.status();
    (status, response.json().await.expect("Failed to parse vote response"))
}

async fn reputation(client: &Client, server_url: &str, user: &str) -> i64 {
    let body: Value = client
        .get(format!("{}/users/{}/prefs", server_url, user))
        .send()
        .await
        .expect("Failed to send prefs request")
        .json()
        .await
        .expect("Failed to parse prefs");
    body["reputation"].as_i64().expect("reputation should be an integer")
}

#[tokio::test]
async fn test_health_check() {
    let (server_url, _handle) = spawn_app(&[]).await;
    let body: Value = Client::new()
        .get(format!("{}/health", server_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_upvote_then_withdraw() {
    let (server_url, _handle) = spawn_app(&[("user_b", 5)]).await;
    let client = Client::new();
    let question = create_question(&client, &server_url, "user_b").await;
    let question_id = question["id"].as_str().unwrap();

    let (status, body) = vote(&client, &server_url, "user_a", "upvoted", "question", question_id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Voted");
    assert_eq!(body["data"]["voteResult"], 1);
    assert_eq!(body["data"]["document"]["votedById"], "user_a");
    assert_eq!(body["data"]["document"]["voteStatus"], "upvoted");
    assert_eq!(body["data"]["document"]["type"], "question");
    assert_eq!(body["data"]["document"]["typeId"], question_id);
    assert_eq!(reputation(&client, &server_url, "user_b").await, 6);

    let (status, body) = vote(&client, &server_url, "user_a", "upvoted", "question", question_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Vote Withdrawn");
    assert_eq!(body["data"]["document"], Value::Null);
    assert_eq!(body["data"]["voteResult"], 0);
    assert_eq!(reputation(&client, &server_url, "user_b").await, 5);
}

#[tokio::test]
async fn test_flip_vote() {
    let (server_url, _handle) = spawn_app(&[("user_b", 5)]).await;
    let client = Client::new();
    let question = create_question(&client, &server_url, "user_b").await;
    let question_id = question["id"].as_str().unwrap();

    vote(&client, &server_url, "user_a", "upvoted", "question", question_id).await;
    assert_eq!(reputation(&client, &server_url, "user_b").await, 6);

    let (status, body) = vote(&client, &server_url, "user_a", "downvoted", "question", question_id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Vote Status Updated");
    assert_eq!(body["data"]["voteResult"], -1);
    assert_eq!(body["data"]["document"]["voteStatus"], "downvoted");
    assert_eq!(reputation(&client, &server_url, "user_b").await, 4);
}

#[tokio::test]
async fn test_vote_on_missing_target() {
    let (server_url, _handle) = spawn_app(&[("user_b", 5)]).await;
    let client = Client::new();

    let (status, body) = vote(&client, &server_url, "user_a", "upvoted", "answer", "answer_nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("answer_nope"));
    assert_eq!(reputation(&client, &server_url, "user_b").await, 5);
}

#[tokio::test]
async fn test_invalid_vote_bodies() {
    let (server_url, _handle) = spawn_app(&[]).await;
    let client = Client::new();

    let (status, body) = vote(&client, &server_url, "", "upvoted", "question", "q1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("votedById"));

    let (status, _) = vote(&client, &server_url, "user_a", "sideways", "question", "q1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/vote", server_url))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_answer_lifecycle() {
    let (server_url, _handle) = spawn_app(&[("helper", 10)]).await;
    let client = Client::new();
    let question = create_question(&client, &server_url, "asker").await;
    let question_id = question["id"].as_str().unwrap();

    let response = client
        .post(format!("{}/answer", server_url))
        .json(&json!({"answer": "It pins the address.", "authorId": "helper", "questionId": question_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let answer: Value = response.json().await.unwrap();
    let answer_id = answer["id"].as_str().unwrap().to_string();
    assert_eq!(answer["answer"], "It pins the address.");
    assert_eq!(reputation(&client, &server_url, "helper").await, 11);

    let (status, body) = vote(&client, &server_url, "voter", "downvoted", "answer", &answer_id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["voteResult"], -1);
    assert_eq!(reputation(&client, &server_url, "helper").await, 10);

    let detail: Value = client
        .get(format!("{}/questions/{}", server_url, question_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["slug"], "what-does-pin-actually-guarantee");
    assert_eq!(detail["voteResult"], 0);
    assert_eq!(detail["answers"][0]["id"], answer_id.as_str());
    assert_eq!(detail["answers"][0]["voteResult"], -1);

    let response = client
        .delete(format!("{}/answer", server_url))
        .json(&json!({"answerId": answer_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["id"], answer_id.as_str());
    assert_eq!(reputation(&client, &server_url, "helper").await, 9);

    let response = client
        .delete(format!("{}/answer", server_url))
        .json(&json!({"answerId": answer_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(reputation(&client, &server_url, "helper").await, 9);
}

#[tokio::test]
async fn test_answer_to_missing_question() {
    let (server_url, _handle) = spawn_app(&[]).await;
    let response = Client::new()
        .post(format!("{}/answer", server_url))
        .json(&json!({"answer": "hello", "authorId": "helper", "questionId": "question_nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_question_validation_and_listing() {
    let (server_url, _handle) = spawn_app(&[]).await;
    let client = Client::new();

    let question = create_question(&client, &server_url, "asker").await;
    assert_eq!(question["tags"], json!(["rust", "async"]));
    assert_eq!(question["slug"], "what-does-pin-actually-guarantee");

    let response = client
        .post(format!("{}/questions", server_url))
        .json(&json!({
            "title": "x".repeat(101),
            "content": "body",
            "authorId": "asker",
            "tags": ["rust"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/questions", server_url))
        .json(&json!({"title": "No tags", "content": "body", "authorId": "asker", "tags": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let listed: Vec<Value> = client
        .get(format!("{}/questions?tag=async&authorId=asker&limit=5", server_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], question["id"]);

    let listed: Vec<Value> = client
        .get(format!("{}/questions?tag=go", server_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.is_empty());

    let response = client
        .get(format!("{}/questions/question_nope", server_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_user_has_zero_reputation() {
    let (server_url, _handle) = spawn_app(&[]).await;
    assert_eq!(reputation(&Client::new(), &server_url, "nobody").await, 0);
}

#[tokio::test]
async fn test_openapi_document_lists_vote_route() {
    let (server_url, _handle) = spawn_app(&[]).await;
    let doc: Value = Client::new()
        .get(format!("{}/openapi.json", server_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(doc["paths"]["/vote"]["post"].is_object());
    assert!(doc["paths"]["/questions/{id}"]["get"].is_object());
}
