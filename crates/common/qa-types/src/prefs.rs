use serde::{Deserialize, Serialize};

/// Per-user preferences record. Only reputation is tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPrefs {
    #[serde(default)]
    pub reputation: i64,
}

/// Partial update of a user's preferences; unset fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reputation: Option<i64>,
}

impl PrefsPatch {
    pub fn reputation(value: i64) -> Self {
        Self {
            reputation: Some(value),
        }
    }

    pub fn apply(&self, prefs: &mut UserPrefs) {
        if let Some(reputation) = self.reputation {
            prefs.reputation = reputation;
        }
    }
}
