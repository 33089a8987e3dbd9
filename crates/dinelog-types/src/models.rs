use serde::{Deserialize, Serialize};

/// One ledger row. `website` is the key; a later submission for the same
/// website replaces every other field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub website: String,
    pub name: String,
    pub address: String,
    pub rate: f64,
    pub comment: String,
    /// `None` once the submitting account has been deleted.
    pub owner_user_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub website: String,
    pub average: f64,
    pub count: u32,
}
