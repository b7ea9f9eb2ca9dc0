use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Number of day-slots in the curriculum. Day 30 is the terminal slot.
pub const CURRICULUM_DAYS: i32 = 30;

/// Week a day belongs to (`ceil(day / 7)`).
pub fn week_of(day_number: i32) -> i32 {
    (day_number + 6) / 7
}

/// Every seventh day is a project/review day.
pub fn is_project_day(day_number: i32) -> bool {
    day_number % 7 == 0
}

/// A persisted curriculum day-slot
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Mission {
    pub id: Uuid,
    pub day_number: i32,
    pub title: String,
    pub description: Option<String>,
    pub week_number: i32,
    pub is_project: bool,
    pub xp_reward: i32,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateMission {
    pub day_number: i32,
    pub title: String,
    pub description: Option<String>,
    pub week_number: i32,
    pub is_project: bool,
    pub xp_reward: i32,
    pub is_published: bool,
}

impl Mission {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Mission>(
            r#"SELECT id, day_number, title, description, week_number, is_project, xp_reward, is_published, created_at, updated_at
               FROM missions
               ORDER BY day_number ASC"#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Mission>(
            r#"SELECT id, day_number, title, description, week_number, is_project, xp_reward, is_published, created_at, updated_at
               FROM missions
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_day(
        pool: &SqlitePool,
        day_number: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Mission>(
            r#"SELECT id, day_number, title, description, week_number, is_project, xp_reward, is_published, created_at, updated_at
               FROM missions
               WHERE day_number = $1"#,
        )
        .bind(day_number)
        .fetch_optional(pool)
        .await
    }

    /// Insert the given slots, skipping any day that already has a row.
    /// Returns the number of rows actually inserted.
    pub async fn insert_missing(
        pool: &SqlitePool,
        missions: &[CreateMission],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut inserted = 0;

        for mission in missions {
            let result = sqlx::query(
                r#"INSERT INTO missions (id, day_number, title, description, week_number, is_project, xp_reward, is_published)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                   ON CONFLICT(day_number) DO NOTHING"#,
            )
            .bind(Uuid::new_v4())
            .bind(mission.day_number)
            .bind(&mission.title)
            .bind(&mission.description)
            .bind(mission.week_number)
            .bind(mission.is_project)
            .bind(mission.xp_reward)
            .bind(mission.is_published)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }
}
