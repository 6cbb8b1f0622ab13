use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::error::StoreError;
use crate::models::{GpaSnapshot, SavedSnapshot};

pub async fn connect(database_url: &str) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn init_db(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Inserts an account row; returns false when the username already exists.
pub async fn insert_account(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r#"
        INSERT INTO accounts (username, password_hash, created_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_password_hash(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<String>, StoreError> {
    let row = sqlx::query("SELECT password_hash FROM accounts WHERE username = ?1")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| row.get("password_hash")))
}

pub async fn save_snapshot(
    pool: &SqlitePool,
    user_id: &str,
    snapshot: &GpaSnapshot,
) -> Result<i64, StoreError> {
    let result = sqlx::query(
        r#"
        INSERT INTO snapshots
        (user_id, period_count, weighted_gpa, unweighted_gpa, saved_at, report_ref)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(user_id)
    .bind(snapshot.period_count as i64)
    .bind(snapshot.weighted_gpa)
    .bind(snapshot.unweighted_gpa)
    .bind(snapshot.saved_at.to_rfc3339())
    .bind(&snapshot.report_ref)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Returns the user's snapshots, newest first; rows with an unreadable
/// `saved_at` are skipped.
pub async fn load_snapshots(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<SavedSnapshot>, StoreError> {
    let rows = sqlx::query(
        "SELECT id, user_id, period_count, weighted_gpa, unweighted_gpa, saved_at, report_ref \
         FROM snapshots WHERE user_id = ?1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut snapshots = Vec::new();
    for row in rows {
        let id: i64 = row.get("id");
        let saved_at: String = row.get("saved_at");
        let saved_at = match DateTime::parse_from_rfc3339(&saved_at) {
            Ok(value) => value.with_timezone(&Utc),
            Err(err) => {
                warn!(snapshot_id = id, saved_at = %saved_at, error = %err, "skipping snapshot with invalid timestamp");
                continue;
            }
        };
        let period_count: i64 = row.get("period_count");

        snapshots.push(SavedSnapshot {
            id,
            user_id: row.get("user_id"),
            snapshot: GpaSnapshot {
                period_count: period_count.max(0) as u32,
                weighted_gpa: row.get("weighted_gpa"),
                unweighted_gpa: row.get("unweighted_gpa"),
                saved_at,
                report_ref: row.get("report_ref"),
            },
        });
    }

    snapshots.sort_by(|a, b| {
        b.snapshot
            .saved_at
            .cmp(&a.snapshot.saved_at)
            .then(b.id.cmp(&a.id))
    });
    Ok(snapshots)
}

pub async fn delete_snapshot(pool: &SqlitePool, user_id: &str, id: i64) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM snapshots WHERE user_id = ?1 AND id = ?2")
        .bind(user_id)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            user_id: user_id.to_string(),
            id,
        });
    }
    Ok(())
}

pub async fn delete_all_snapshots(pool: &SqlitePool, user_id: &str) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM snapshots WHERE user_id = ?1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_db(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot(saved_at: DateTime<Utc>, weighted: Option<f64>) -> GpaSnapshot {
        GpaSnapshot {
            period_count: 2,
            weighted_gpa: weighted,
            unweighted_gpa: weighted.map(|value| value - 0.5),
            saved_at,
            report_ref: "reports/avery.md".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_account_is_rejected() {
        let pool = test_pool().await;
        assert!(insert_account(&pool, "avery", "hash-1").await.unwrap());
        assert!(!insert_account(&pool, "avery", "hash-2").await.unwrap());
        assert_eq!(
            fetch_password_hash(&pool, "avery").await.unwrap().as_deref(),
            Some("hash-1")
        );
        assert_eq!(fetch_password_hash(&pool, "jules").await.unwrap(), None);
    }

    #[tokio::test]
    async fn snapshots_load_newest_first() {
        let pool = test_pool().await;
        insert_account(&pool, "avery", "hash").await.unwrap();
        let now = Utc::now();
        let older = save_snapshot(&pool, "avery", &snapshot(now - Duration::days(3), Some(3.2)))
            .await
            .unwrap();
        let newer = save_snapshot(&pool, "avery", &snapshot(now, None))
            .await
            .unwrap();

        let loaded = load_snapshots(&pool, "avery").await.unwrap();
        let ids: Vec<i64> = loaded.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer, older]);
        assert_eq!(loaded[0].snapshot.weighted_gpa, None);
        assert_eq!(loaded[1].snapshot.weighted_gpa, Some(3.2));
        assert_eq!(loaded[1].snapshot.period_count, 2);
    }

    #[tokio::test]
    async fn malformed_timestamps_are_skipped() {
        let pool = test_pool().await;
        insert_account(&pool, "avery", "hash").await.unwrap();
        save_snapshot(&pool, "avery", &snapshot(Utc::now(), Some(3.0)))
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO snapshots (user_id, period_count, saved_at, report_ref) \
             VALUES ('avery', 1, 'not-a-date', 'x')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let loaded = load_snapshots(&pool, "avery").await.unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[tokio::test]
    async fn deletes_are_scoped_to_user() {
        let pool = test_pool().await;
        insert_account(&pool, "avery", "hash").await.unwrap();
        insert_account(&pool, "jules", "hash").await.unwrap();
        let avery = save_snapshot(&pool, "avery", &snapshot(Utc::now(), Some(3.0)))
            .await
            .unwrap();
        save_snapshot(&pool, "avery", &snapshot(Utc::now(), Some(3.1)))
            .await
            .unwrap();
        save_snapshot(&pool, "jules", &snapshot(Utc::now(), Some(2.0)))
            .await
            .unwrap();

        assert!(matches!(
            delete_snapshot(&pool, "jules", avery).await,
            Err(StoreError::NotFound { .. })
        ));
        delete_snapshot(&pool, "avery", avery).await.unwrap();
        assert_eq!(load_snapshots(&pool, "avery").await.unwrap().len(), 1);

        assert_eq!(delete_all_snapshots(&pool, "avery").await.unwrap(), 1);
        assert!(load_snapshots(&pool, "avery").await.unwrap().is_empty());
        assert_eq!(load_snapshots(&pool, "jules").await.unwrap().len(), 1);
    }
}
