//! Database row types: these map directly to SQLite rows.
//! Distinct from dinelog-types API models to keep the DB layer independent.

use dinelog_types::models::Restaurant;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct RestaurantRow {
    pub website: String,
    pub name: String,
    pub address: String,
    pub rate: f64,
    pub comment: String,
    pub user_id: Option<i64>,
    pub updated_at: String,
}

impl From<RestaurantRow> for Restaurant {
    fn from(row: RestaurantRow) -> Self {
        Restaurant {
            website: row.website,
            name: row.name,
            address: row.address,
            rate: row.rate,
            comment: row.comment,
            owner_user_id: row.user_id,
        }
    }
}

/// Fields of a restaurant submission.
#[derive(Debug, Clone, Copy)]
pub struct NewRestaurant<'a> {
    pub website: &'a str,
    pub name: &'a str,
    pub address: &'a str,
    pub rate: f64,
    pub comment: &'a str,
    pub owner_user_id: i64,
}

/// Whether an upsert created the row or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub user_id: i64,
    pub username: String,
    pub expires_at: String,
}
