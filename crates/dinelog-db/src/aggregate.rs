use rusqlite::OptionalExtension;

use dinelog_types::models::RatingSummary;

use crate::error::StoreResult;
use crate::Database;

impl Database {
    /// Average of all ledger ratings for `website`, grouped by key.
    ///
    /// `website` is the ledger's primary key, so a group holds at most one
    /// row: the result is either `None` or exactly the stored rate.
    pub fn average_rating(&self, website: &str) -> StoreResult<Option<f64>> {
        self.with_conn(|conn| {
            let avg = conn
                .query_row(
                    "SELECT AVG(rate) FROM restaurants WHERE website = ?1 GROUP BY website",
                    [website],
                    |row| row.get::<_, f64>(0),
                )
                .optional()?;
            Ok(avg)
        })
    }

    /// The same group-by-then-average over the whole ledger.
    pub fn rating_summaries(&self) -> StoreResult<Vec<RatingSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT website, AVG(rate), COUNT(*)
                 FROM restaurants
                 GROUP BY website
                 ORDER BY website",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(RatingSummary {
                        website: row.get(0)?,
                        average: row.get(1)?,
                        count: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::models::NewRestaurant;
    use crate::test_support::open_temp;

    #[test]
    fn test_average_is_absent_without_row() {
        let (_dir, db) = open_temp();
        assert_eq!(db.average_rating("site.com").unwrap(), None);
        assert!(db.rating_summaries().unwrap().is_empty());
    }

    #[test]
    fn test_average_equals_latest_rate() {
        let (_dir, db) = open_temp();
        let uid = db.write("test", |txn| txn.insert_user("alice", "h")).unwrap();

        for rate in [4.0, 2.5] {
            db.upsert_restaurant(NewRestaurant {
                website: "site.com",
                name: "Chez Test",
                address: "1 Main St",
                rate,
                comment: "",
                owner_user_id: uid,
            })
            .unwrap();
        }

        // Not (4.0 + 2.5) / 2: the second submission replaced the first.
        assert_eq!(db.average_rating("site.com").unwrap(), Some(2.5));

        let summaries = db.rating_summaries().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].count, 1);
        assert_eq!(summaries[0].average, 2.5);
    }
}
