//! Vote reconciliation.
//!
//! A vote action from one voter on one target resolves into a single
//! transition (cast, flip or withdraw). The engine applies the matching
//! vote-record mutation, adjusts the target author's reputation and reports
//! the target's score afterwards.
use std::sync::Arc;

use qa_types::error::{require, ValidationError};
use qa_types::{vote_score, NewVote, TargetType, VoteFilter, VoteRecord, VoteStatus, VoteTransition};

use crate::metrics;
use crate::reputation::ReputationUpdater;
use crate::store::{DocumentStore, StoreError};

/// A voter's requested stance on a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRequest {
    pub voted_by_id: String,
    pub vote_status: VoteStatus,
    pub target_type: TargetType,
    pub target_id: String,
}

impl VoteRequest {
    pub fn validate(self) -> Result<Self, ValidationError> {
        require("votedById", &self.voted_by_id)?;
        require("typeId", &self.target_id)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    /// The voter's record after the action; `None` once withdrawn.
    pub document: Option<VoteRecord>,
    /// `upvotes - downvotes` across all voters on the target.
    pub vote_result: i64,
    pub transition: VoteTransition,
    pub author_id: String,
    /// Author's reputation after the last applied step.
    pub author_reputation: Option<i64>,
}

impl VoteOutcome {
    pub fn message(&self) -> &'static str {
        self.transition.message()
    }
}

/// Net score of a target, read from the document store.
pub async fn target_score(
    documents: &dyn DocumentStore,
    target_type: TargetType,
    target_id: &str,
) -> Result<i64, StoreError> {
    let target = VoteFilter::target(target_type, target_id);
    let upvotes = target.clone().with_status(VoteStatus::Upvoted);
    let downvotes = target.with_status(VoteStatus::Downvoted);
    let (up, down) = tokio::try_join!(
        documents.count_votes(&upvotes),
        documents.count_votes(&downvotes),
    )?;
    Ok(vote_score(up, down))
}

#[derive(Clone)]
pub struct VoteEngine {
    documents: Arc<dyn DocumentStore>,
    reputation: ReputationUpdater,
}

impl VoteEngine {
    pub fn new(documents: Arc<dyn DocumentStore>, reputation: ReputationUpdater) -> Self {
        Self {
            documents,
            reputation,
        }
    }

    async fn author_of(&self, target_type: TargetType, target_id: &str) -> Result<String, StoreError> {
        let author_id = match target_type {
            TargetType::Question => self.documents.get_question(target_id).await?.author_id,
            TargetType::Answer => self.documents.get_answer(target_id).await?.author_id,
        };
        Ok(author_id)
    }

    /// Reconciles one vote action.
    ///
    /// The target is looked up before anything is written, so a missing target
    /// leaves both stores untouched. Later failures abort the remaining steps
    /// without undoing earlier ones.
    pub async fn cast(&self, request: VoteRequest) -> Result<VoteOutcome, StoreError> {
        let VoteRequest {
            voted_by_id,
            vote_status,
            target_type,
            target_id,
        } = request;

        let author_id = self.author_of(target_type, &target_id).await?;

        let mut existing = self
            .documents
            .find_votes(&VoteFilter::voter_on_target(
                voted_by_id.clone(),
                target_type,
                target_id.clone(),
            ))
            .await?;
        if existing.len() > 1 {
            tracing::warn!(
                voted_by_id = %voted_by_id,
                target_type = %target_type,
                target_id = %target_id,
                records = existing.len(),
                "multiple vote records for one voter and target, using the oldest"
            );
        }
        let existing = if existing.is_empty() {
            None
        } else {
            Some(existing.swap_remove(0))
        };

        let (transition, document) = match existing {
            None => {
                let record = self
                    .documents
                    .create_vote(NewVote {
                        voted_by_id: voted_by_id.clone(),
                        vote_status,
                        target_type,
                        target_id: target_id.clone(),
                    })
                    .await?;
                (VoteTransition::Cast(vote_status), Some(record))
            }
            Some(record) => {
                let transition = VoteTransition::resolve(Some(record.vote_status), vote_status);
                match transition.resulting_status() {
                    Some(to) => {
                        let updated = self.documents.update_vote(&record.id, to).await?;
                        (transition, Some(updated))
                    }
                    None => {
                        self.documents.delete_vote(&record.id).await?;
                        (transition, None)
                    }
                }
            }
        };

        let author_reputation = self
            .reputation
            .apply_steps(&author_id, transition.reputation_steps())
            .await?;

        let vote_result = target_score(self.documents.as_ref(), target_type, &target_id).await?;

        metrics::record_vote_transition(transition.label(), target_type.into());
        tracing::info!(
            voted_by_id = %voted_by_id,
            target_type = %target_type,
            target_id = %target_id,
            author_id = %author_id,
            transition = transition.label(),
            reputation_delta = transition.net_reputation_delta(),
            vote_result,
            "vote reconciled"
        );

        Ok(VoteOutcome {
            document,
            vote_result,
            transition,
            author_id,
            author_reputation,
        })
    }
}
