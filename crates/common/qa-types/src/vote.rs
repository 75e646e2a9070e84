use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

/// Direction of a vote.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VoteStatus {
    Upvoted,
    Downvoted,
}

impl VoteStatus {
    /// Reputation effect of a vote in this direction on the target's author.
    pub fn weight(self) -> i64 {
        match self {
            VoteStatus::Upvoted => 1,
            VoteStatus::Downvoted => -1,
        }
    }
}

/// Kind of entity a vote is attached to.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TargetType {
    Question,
    Answer,
}

/// One voter's current stance on one question or answer.
///
/// At most one record exists per `(voted_by_id, target_type, target_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub id: String,
    pub voted_by_id: String,
    pub vote_status: VoteStatus,
    pub target_type: TargetType,
    pub target_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create a vote record; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVote {
    pub voted_by_id: String,
    pub vote_status: VoteStatus,
    pub target_type: TargetType,
    pub target_id: String,
}

/// Equality filter over vote records. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteFilter {
    pub voted_by_id: Option<String>,
    pub target_type: Option<TargetType>,
    pub target_id: Option<String>,
    pub vote_status: Option<VoteStatus>,
}

impl VoteFilter {
    /// All votes on a target.
    pub fn target(target_type: TargetType, target_id: impl Into<String>) -> Self {
        Self {
            target_type: Some(target_type),
            target_id: Some(target_id.into()),
            ..Self::default()
        }
    }

    /// The (at most one) vote a voter holds on a target.
    pub fn voter_on_target(
        voted_by_id: impl Into<String>,
        target_type: TargetType,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            voted_by_id: Some(voted_by_id.into()),
            ..Self::target(target_type, target_id)
        }
    }

    pub fn with_status(mut self, status: VoteStatus) -> Self {
        self.vote_status = Some(status);
        self
    }

    pub fn matches(&self, vote: &VoteRecord) -> bool {
        self.voted_by_id.as_ref().map_or(true, |v| *v == vote.voted_by_id)
            && self.target_type.map_or(true, |t| t == vote.target_type)
            && self.target_id.as_ref().map_or(true, |t| *t == vote.target_id)
            && self.vote_status.map_or(true, |s| s == vote.vote_status)
    }
}

/// What a vote action does to a voter's existing record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VoteTransition {
    /// No prior record; a new one is created.
    Cast(VoteStatus),
    /// The prior record switches direction.
    Flip { from: VoteStatus, to: VoteStatus },
    /// The same action was repeated; the prior record is removed.
    Withdraw(VoteStatus),
}

impl VoteTransition {
    /// Decides the transition from the voter's existing status and the requested one.
    pub fn resolve(existing: Option<VoteStatus>, requested: VoteStatus) -> Self {
        match existing {
            None => VoteTransition::Cast(requested),
            Some(current) if current == requested => VoteTransition::Withdraw(current),
            Some(current) => VoteTransition::Flip {
                from: current,
                to: requested,
            },
        }
    }

    /// Reputation adjustments for the target's author, applied in order.
    ///
    /// A flip undoes the old vote and applies the new one as two separate steps.
    pub fn reputation_steps(&self) -> &'static [i64] {
        match self {
            VoteTransition::Cast(VoteStatus::Upvoted) => &[1],
            VoteTransition::Cast(VoteStatus::Downvoted) => &[-1],
            VoteTransition::Withdraw(VoteStatus::Upvoted) => &[-1],
            VoteTransition::Withdraw(VoteStatus::Downvoted) => &[1],
            VoteTransition::Flip {
                to: VoteStatus::Downvoted,
                ..
            } => &[-1, -1],
            VoteTransition::Flip {
                to: VoteStatus::Upvoted,
                ..
            } => &[1, 1],
        }
    }

    pub fn net_reputation_delta(&self) -> i64 {
        self.reputation_steps().iter().sum()
    }

    /// Status the voter holds after the transition, if any.
    pub fn resulting_status(&self) -> Option<VoteStatus> {
        match self {
            VoteTransition::Cast(status) => Some(*status),
            VoteTransition::Flip { to, .. } => Some(*to),
            VoteTransition::Withdraw(_) => None,
        }
    }

    /// Human-readable outcome reported to the caller.
    pub fn message(&self) -> &'static str {
        match self {
            VoteTransition::Cast(_) => "Voted",
            VoteTransition::Flip { .. } => "Vote Status Updated",
            VoteTransition::Withdraw(_) => "Vote Withdrawn",
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            VoteTransition::Cast(_) => "cast",
            VoteTransition::Flip { .. } => "flip",
            VoteTransition::Withdraw(_) => "withdraw",
        }
    }
}

/// Net score of a target.
pub fn vote_score(upvotes: u64, downvotes: u64) -> i64 {
    upvotes as i64 - downvotes as i64
}
