use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qa_types::{
    Answer, NewAnswer, NewQuestion, NewVote, PrefsPatch, Question, TargetType, UserPrefs,
    VoteFilter, VoteRecord, VoteStatus,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool, Postgres, QueryBuilder};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use super::{DocumentStore, PrefsStore, QuestionQuery, StoreError};

/// Create a new connection pool to PostgreSQL
pub async fn create_pg_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

#[derive(FromRow)]
struct VoteRow {
    id: String,
    voted_by_id: String,
    vote_status: String,
    target_type: String,
    target_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VoteRow> for VoteRecord {
    type Error = StoreError;

    fn try_from(row: VoteRow) -> Result<Self, Self::Error> {
        let vote_status = VoteStatus::from_str(&row.vote_status)
            .map_err(|_| StoreError::Internal(format!("bad vote_status {:?}", row.vote_status)))?;
        let target_type = TargetType::from_str(&row.target_type)
            .map_err(|_| StoreError::Internal(format!("bad target_type {:?}", row.target_type)))?;
        Ok(VoteRecord {
            id: row.id,
            voted_by_id: row.voted_by_id,
            vote_status,
            target_type,
            target_id: row.target_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct QuestionRow {
    id: String,
    title: String,
    content: String,
    author_id: String,
    tags: Vec<String>,
    attachment_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            id: row.id,
            title: row.title,
            content: row.content,
            author_id: row.author_id,
            tags: row.tags,
            attachment_id: row.attachment_id,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct AnswerRow {
    id: String,
    content: String,
    author_id: String,
    question_id: String,
    created_at: DateTime<Utc>,
}

impl From<AnswerRow> for Answer {
    fn from(row: AnswerRow) -> Self {
        Answer {
            id: row.id,
            content: row.content,
            author_id: row.author_id,
            question_id: row.question_id,
            created_at: row.created_at,
        }
    }
}

fn push_vote_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &VoteFilter) {
    builder.push(" WHERE TRUE");
    if let Some(voter) = &filter.voted_by_id {
        builder.push(" AND voted_by_id = ").push_bind(voter.clone());
    }
    if let Some(target_type) = filter.target_type {
        builder.push(" AND target_type = ").push_bind(target_type.to_string());
    }
    if let Some(target_id) = &filter.target_id {
        builder.push(" AND target_id = ").push_bind(target_id.clone());
    }
    if let Some(status) = filter.vote_status {
        builder.push(" AND vote_status = ").push_bind(status.to_string());
    }
}

/// PostgreSQL implementation of the DocumentStore trait
#[derive(Clone, Debug)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn find_votes(&self, filter: &VoteFilter) -> Result<Vec<VoteRecord>, StoreError> {
        let mut builder = QueryBuilder::new(
            "SELECT id, voted_by_id, vote_status, target_type, target_id, created_at, updated_at FROM votes",
        );
        push_vote_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at");

        let rows: Vec<VoteRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(VoteRecord::try_from).collect()
    }

    async fn count_votes(&self, filter: &VoteFilter) -> Result<u64, StoreError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM votes");
        push_vote_filter(&mut builder, filter);

        let (count,): (i64,) = builder.build_query_as().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn create_vote(&self, vote: NewVote) -> Result<VoteRecord, StoreError> {
        let result = sqlx::query_as::<_, VoteRow>(
            r#"
            INSERT INTO votes (id, voted_by_id, vote_status, target_type, target_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            RETURNING id, voted_by_id, vote_status, target_type, target_id, created_at, updated_at
            "#,
        )
        .bind(format!("vote_{}", Uuid::new_v4()))
        .bind(&vote.voted_by_id)
        .bind(vote.vote_status.to_string())
        .bind(vote.target_type.to_string())
        .bind(&vote.target_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => row.try_into(),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::Conflict(format!(
                    "{} already voted on {} {}",
                    vote.voted_by_id, vote.target_type, vote.target_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_vote(&self, id: &str, status: VoteStatus) -> Result<VoteRecord, StoreError> {
        let row = sqlx::query_as::<_, VoteRow>(
            r#"
            UPDATE votes SET vote_status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, voted_by_id, vote_status, target_type, target_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("vote", id))?;
        row.try_into()
    }

    async fn delete_vote(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM votes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("vote", id));
        }
        Ok(())
    }

    async fn get_question(&self, id: &str) -> Result<Question, StoreError> {
        sqlx::query_as::<_, QuestionRow>(
            "SELECT id, title, content, author_id, tags, attachment_id, created_at FROM questions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Question::from)
        .ok_or_else(|| StoreError::not_found("question", id))
    }

    async fn create_question(&self, question: NewQuestion) -> Result<Question, StoreError> {
        let row = sqlx::query_as::<_, QuestionRow>(
            r#"
            INSERT INTO questions (id, title, content, author_id, tags, attachment_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING id, title, content, author_id, tags, attachment_id, created_at
            "#,
        )
        .bind(format!("question_{}", Uuid::new_v4()))
        .bind(&question.title)
        .bind(&question.content)
        .bind(&question.author_id)
        .bind(&question.tags)
        .bind(&question.attachment_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list_questions(&self, query: &QuestionQuery) -> Result<Vec<Question>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT id, title, content, author_id, tags, attachment_id, created_at FROM questions WHERE TRUE",
        );
        if let Some(tag) = &query.tag {
            builder.push(" AND ").push_bind(tag.clone()).push(" = ANY(tags)");
        }
        if let Some(author_id) = &query.author_id {
            builder.push(" AND author_id = ").push_bind(author_id.clone());
        }
        builder.push(" ORDER BY created_at DESC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows: Vec<QuestionRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Question::from).collect())
    }

    async fn get_answer(&self, id: &str) -> Result<Answer, StoreError> {
        sqlx::query_as::<_, AnswerRow>(
            "SELECT id, content, author_id, question_id, created_at FROM answers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(Answer::from)
        .ok_or_else(|| StoreError::not_found("answer", id))
    }

    async fn create_answer(&self, answer: NewAnswer) -> Result<Answer, StoreError> {
        let row = sqlx::query_as::<_, AnswerRow>(
            r#"
            INSERT INTO answers (id, content, author_id, question_id, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, content, author_id, question_id, created_at
            "#,
        )
        .bind(format!("answer_{}", Uuid::new_v4()))
        .bind(&answer.content)
        .bind(&answer.author_id)
        .bind(&answer.question_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn delete_answer(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM answers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("answer", id));
        }
        Ok(())
    }

    async fn list_answers(&self, question_id: &str) -> Result<Vec<Answer>, StoreError> {
        let rows = sqlx::query_as::<_, AnswerRow>(
            r#"
            SELECT id, content, author_id, question_id, created_at
            FROM answers WHERE question_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Answer::from).collect())
    }
}

/// Preference store backed by the `user_prefs` table.
#[derive(Clone, Debug)]
pub struct PostgresPrefsStore {
    pool: PgPool,
}

impl PostgresPrefsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrefsStore for PostgresPrefsStore {
    async fn get_prefs(&self, user_id: &str) -> Result<UserPrefs, StoreError> {
        let reputation: Option<i64> =
            sqlx::query_scalar("SELECT reputation FROM user_prefs WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(UserPrefs {
            reputation: reputation.unwrap_or_default(),
        })
    }

    async fn update_prefs(&self, user_id: &str, patch: PrefsPatch) -> Result<UserPrefs, StoreError> {
        // An empty patch still materialises the row with defaults.
        let reputation: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO user_prefs (user_id, reputation)
            VALUES ($1, COALESCE($2, 0))
            ON CONFLICT (user_id)
            DO UPDATE SET reputation = COALESCE($2, user_prefs.reputation)
            RETURNING reputation
            "#,
        )
        .bind(user_id)
        .bind(patch.reputation)
        .fetch_one(&self.pool)
        .await?;
        Ok(UserPrefs { reputation })
    }

    async fn compare_and_set_reputation(
        &self,
        user_id: &str,
        expected: i64,
        new: i64,
    ) -> Result<bool, StoreError> {
        // A missing row reads as 0, so it may only be created when 0 is expected.
        let result = if expected == 0 {
            sqlx::query(
                r#"
                INSERT INTO user_prefs (user_id, reputation)
                VALUES ($1, $3)
                ON CONFLICT (user_id)
                DO UPDATE SET reputation = $3 WHERE user_prefs.reputation = $2
                "#,
            )
            .bind(user_id)
            .bind(expected)
            .bind(new)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query("UPDATE user_prefs SET reputation = $3 WHERE user_id = $1 AND reputation = $2")
                .bind(user_id)
                .bind(expected)
                .bind(new)
                .execute(&self.pool)
                .await?
        };
        Ok(result.rows_affected() == 1)
    }
}
