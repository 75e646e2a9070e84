use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{max_len, require, ValidationError};
use crate::slug::slugify;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_CONTENT_LEN: usize = 10_000;
pub const MAX_ID_LEN: usize = 50;
pub const MAX_TAG_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub tags: Vec<String>,
    pub attachment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn slug(&self) -> String {
        slugify(&self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub question_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    pub title: String,
    pub content: String,
    pub author_id: String,
    pub tags: Vec<String>,
    pub attachment_id: Option<String>,
}

impl NewQuestion {
    /// Checks required fields and length limits, and deduplicates tags
    /// while keeping their first-seen order.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        require("title", &self.title)?;
        max_len("title", &self.title, MAX_TITLE_LEN)?;
        require("content", &self.content)?;
        max_len("content", &self.content, MAX_CONTENT_LEN)?;
        require("authorId", &self.author_id)?;
        max_len("authorId", &self.author_id, MAX_ID_LEN)?;

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags.into_iter().map(|t| t.trim().to_string()) {
            if tag.is_empty() || tags.contains(&tag) {
                continue;
            }
            max_len("tags", &tag, MAX_TAG_LEN)?;
            tags.push(tag);
        }
        if tags.is_empty() {
            return Err(ValidationError::MissingTags);
        }
        self.tags = tags;

        if let Some(attachment_id) = &self.attachment_id {
            max_len("attachmentId", attachment_id, MAX_ID_LEN)?;
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnswer {
    pub content: String,
    pub author_id: String,
    pub question_id: String,
}

impl NewAnswer {
    pub fn validate(self) -> Result<Self, ValidationError> {
        require("answer", &self.content)?;
        max_len("answer", &self.content, MAX_CONTENT_LEN)?;
        require("authorId", &self.author_id)?;
        require("questionId", &self.question_id)?;
        Ok(self)
    }
}
