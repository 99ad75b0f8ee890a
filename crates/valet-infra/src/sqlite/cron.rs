//! SQLite cron job repository implementation.

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use sqlx::Row;
use uuid::Uuid;

use valet_core::repository::CronJobRepository;
use valet_types::cron::CronJob;
use valet_types::error::RepositoryError;

use super::pool::{map_sqlx, parse_datetime, parse_uuid, DatabasePool};

/// SQLite-backed implementation of `CronJobRepository`.
pub struct SqliteCronJobRepository {
    pool: DatabasePool,
}

impl SqliteCronJobRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn job_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<CronJob, RepositoryError> {
    let id: String = row.try_get("id").map_err(map_sqlx)?;
    let name: String = row.try_get("name").map_err(map_sqlx)?;
    let schedule: String = row.try_get("schedule").map_err(map_sqlx)?;
    let message: String = row.try_get("message").map_err(map_sqlx)?;
    let profile: String = row.try_get("profile").map_err(map_sqlx)?;
    let enabled: i64 = row.try_get("enabled").map_err(map_sqlx)?;
    let last_run: Option<String> = row.try_get("last_run").map_err(map_sqlx)?;

    Ok(CronJob {
        id: parse_uuid(&id)?,
        name,
        schedule,
        message,
        profile,
        enabled: enabled != 0,
        last_run: last_run.as_deref().map(parse_datetime).transpose()?,
    })
}

impl CronJobRepository for SqliteCronJobRepository {
    fn insert(&self, job: &CronJob) -> BoxFuture<'_, Result<(), RepositoryError>> {
        let job = job.clone();
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO cron_jobs (id, name, schedule, message, profile, enabled, last_run)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(job.id.to_string())
            .bind(&job.name)
            .bind(&job.schedule)
            .bind(&job.message)
            .bind(&job.profile)
            .bind(job.enabled as i64)
            .bind(job.last_run.map(|t| t.to_rfc3339()))
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx)?;
            Ok(())
        })
    }

    fn delete(&self, name: &str) -> BoxFuture<'_, Result<bool, RepositoryError>> {
        let name = name.to_string();
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM cron_jobs WHERE name = ?")
                .bind(name)
                .execute(&self.pool.writer)
                .await
                .map_err(map_sqlx)?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn get(&self, name: &str) -> BoxFuture<'_, Result<Option<CronJob>, RepositoryError>> {
        let name = name.to_string();
        Box::pin(async move {
            let row = sqlx::query("SELECT * FROM cron_jobs WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool.reader)
                .await
                .map_err(map_sqlx)?;
            row.map(|r| job_from_row(&r)).transpose()
        })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<CronJob>, RepositoryError>> {
        Box::pin(async move {
            let rows = sqlx::query("SELECT * FROM cron_jobs ORDER BY name")
                .fetch_all(&self.pool.reader)
                .await
                .map_err(map_sqlx)?;
            rows.iter().map(job_from_row).collect()
        })
    }

    fn list_enabled(&self) -> BoxFuture<'_, Result<Vec<CronJob>, RepositoryError>> {
        Box::pin(async move {
            let rows = sqlx::query("SELECT * FROM cron_jobs WHERE enabled = 1 ORDER BY name")
                .fetch_all(&self.pool.reader)
                .await
                .map_err(map_sqlx)?;
            rows.iter().map(job_from_row).collect()
        })
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> BoxFuture<'_, Result<(), RepositoryError>> {
        let name = name.to_string();
        Box::pin(async move {
            let result = sqlx::query("UPDATE cron_jobs SET enabled = ? WHERE name = ?")
                .bind(enabled as i64)
                .bind(name)
                .execute(&self.pool.writer)
                .await
                .map_err(map_sqlx)?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
    }

    fn stamp_last_run(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<(), RepositoryError>> {
        Box::pin(async move {
            sqlx::query("UPDATE cron_jobs SET last_run = ? WHERE id = ?")
                .bind(at.to_rfc3339())
                .bind(id.to_string())
                .execute(&self.pool.writer)
                .await
                .map_err(map_sqlx)?;
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::testing::temp_pool;

    fn job(name: &str) -> CronJob {
        CronJob {
            id: Uuid::now_v7(),
            name: name.to_string(),
            schedule: "0 9 * * *".to_string(),
            message: "good morning".to_string(),
            profile: "free".to_string(),
            enabled: true,
            last_run: None,
        }
    }

    #[tokio::test]
    async fn insert_list_round_trip() {
        let (_dir, pool) = temp_pool().await;
        let repo = SqliteCronJobRepository::new(pool);

        repo.insert(&job("daily")).await.unwrap();

        let jobs = repo.list().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "daily");
        assert_eq!(jobs[0].schedule, "0 9 * * *");
        assert!(jobs[0].enabled);
        assert!(jobs[0].last_run.is_none());
    }

    #[tokio::test]
    async fn duplicate_name_conflicts() {
        let (_dir, pool) = temp_pool().await;
        let repo = SqliteCronJobRepository::new(pool);

        repo.insert(&job("daily")).await.unwrap();
        let err = repo.insert(&job("daily")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn set_enabled_filters_list_enabled() {
        let (_dir, pool) = temp_pool().await;
        let repo = SqliteCronJobRepository::new(pool);

        repo.insert(&job("a")).await.unwrap();
        repo.insert(&job("b")).await.unwrap();
        repo.set_enabled("a", false).await.unwrap();

        let enabled = repo.list_enabled().await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "b");

        assert!(matches!(
            repo.set_enabled("ghost", true).await.unwrap_err(),
            RepositoryError::NotFound
        ));
    }

    #[tokio::test]
    async fn delete_and_stamp() {
        let (_dir, pool) = temp_pool().await;
        let repo = SqliteCronJobRepository::new(pool);

        let j = job("daily");
        repo.insert(&j).await.unwrap();
        repo.stamp_last_run(j.id, Utc::now()).await.unwrap();
        assert!(repo.get("daily").await.unwrap().unwrap().last_run.is_some());

        assert!(repo.delete("daily").await.unwrap());
        assert!(!repo.delete("daily").await.unwrap());
        assert!(repo.get("daily").await.unwrap().is_none());
    }
}
