use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::models::{NewRestaurant, RestaurantRow, UpsertOutcome};
use crate::txn::WriteTxn;
use crate::Database;

const RESTAURANT_COLUMNS: &str = "website, name, address, rate, comment, user_id, updated_at";

impl Database {
    // -- Reads --

    pub fn get_restaurant(&self, website: &str) -> StoreResult<Option<RestaurantRow>> {
        self.with_conn(|conn| query_restaurant(conn, website))
    }

    pub fn list_restaurants(&self) -> StoreResult<Vec<RestaurantRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {RESTAURANT_COLUMNS} FROM restaurants ORDER BY website"
            ))?;
            let rows = stmt
                .query_map([], map_restaurant)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_restaurants_owned_by(&self, user_id: i64) -> StoreResult<Vec<RestaurantRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE user_id = ?1 ORDER BY website"
            ))?;
            let rows = stmt
                .query_map([user_id], map_restaurant)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Writes --

    /// Insert the restaurant, or overwrite the existing row with the same
    /// website. Returns the row as committed.
    pub fn upsert_restaurant(
        &self,
        new: NewRestaurant<'_>,
    ) -> StoreResult<(UpsertOutcome, RestaurantRow)> {
        self.write("upsert_restaurant", |txn| {
            let outcome = txn.upsert_restaurant(new)?;
            let row = txn.get_restaurant(new.website)?.ok_or(StoreError::NotFound)?;
            Ok((outcome, row))
        })
    }

    /// Overwrite rate and comment of an existing restaurant.
    pub fn update_rating(
        &self,
        website: &str,
        rate: f64,
        comment: &str,
        user_id: i64,
    ) -> StoreResult<RestaurantRow> {
        self.write("update_rating", |txn| {
            txn.update_rating(website, rate, comment, user_id)?;
            txn.get_restaurant(website)?.ok_or(StoreError::NotFound)
        })
    }
}

impl WriteTxn<'_> {
    pub fn get_restaurant(&self, website: &str) -> StoreResult<Option<RestaurantRow>> {
        query_restaurant(self.conn(), website)
    }

    pub fn upsert_restaurant(&self, new: NewRestaurant<'_>) -> StoreResult<UpsertOutcome> {
        // The IMMEDIATE transaction already holds the write lock, so nothing
        // can insert this key between the check and the write.
        let exists = self
            .conn()
            .query_row(
                "SELECT 1 FROM restaurants WHERE website = ?1",
                [new.website],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        if exists {
            self.conn().execute(
                "UPDATE restaurants
                 SET name = ?2, address = ?3, rate = ?4, comment = ?5, user_id = ?6,
                     updated_at = datetime('now')
                 WHERE website = ?1",
                rusqlite::params![
                    new.website,
                    new.name,
                    new.address,
                    new.rate,
                    new.comment,
                    new.owner_user_id
                ],
            )?;
            info!(
                "Restaurant {} re-rated to {} by user {}",
                new.website, new.rate, new.owner_user_id
            );
            Ok(UpsertOutcome::Updated)
        } else {
            self.conn().execute(
                "INSERT INTO restaurants (website, name, address, rate, comment, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    new.website,
                    new.name,
                    new.address,
                    new.rate,
                    new.comment,
                    new.owner_user_id
                ],
            )?;
            info!("Restaurant {} created by user {}", new.website, new.owner_user_id);
            Ok(UpsertOutcome::Inserted)
        }
    }

    pub fn update_rating(
        &self,
        website: &str,
        rate: f64,
        comment: &str,
        user_id: i64,
    ) -> StoreResult<()> {
        let updated = self.conn().execute(
            "UPDATE restaurants
             SET rate = ?2, comment = ?3, user_id = ?4, updated_at = datetime('now')
             WHERE website = ?1",
            rusqlite::params![website, rate, comment, user_id],
        )?;

        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        info!("Restaurant {} re-rated to {} by user {}", website, rate, user_id);
        Ok(())
    }
}

fn query_restaurant(conn: &Connection, website: &str) -> StoreResult<Option<RestaurantRow>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE website = ?1"
    ))?;
    let row = stmt.query_row([website], map_restaurant).optional()?;
    Ok(row)
}

fn map_restaurant(row: &rusqlite::Row<'_>) -> rusqlite::Result<RestaurantRow> {
    Ok(RestaurantRow {
        website: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        rate: row.get(3)?,
        comment: row.get(4)?,
        user_id: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
