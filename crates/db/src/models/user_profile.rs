use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

/// XP at which a learner stops being a beginner
pub const STRONG_XP_THRESHOLD: i64 = 1000;
pub const MASTER_XP_THRESHOLD: i64 = 3000;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "skill_level")]
pub enum SkillLevel {
    #[default]
    Beginner,
    Strong,
    Master,
}

impl SkillLevel {
    pub fn for_xp(total_xp: i64) -> SkillLevel {
        if total_xp < STRONG_XP_THRESHOLD {
            SkillLevel::Beginner
        } else if total_xp < MASTER_XP_THRESHOLD {
            SkillLevel::Strong
        } else {
            SkillLevel::Master
        }
    }
}

/// Minutes per day the learner committed to. Drives the time estimates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DailyMode {
    Ten,
    #[default]
    Twenty,
    Thirty,
}

impl DailyMode {
    pub fn try_from_minutes(minutes: i32) -> Option<DailyMode> {
        match minutes {
            10 => Some(DailyMode::Ten),
            20 => Some(DailyMode::Twenty),
            30 => Some(DailyMode::Thirty),
            _ => None,
        }
    }

    /// Unknown values fall back to the default mode.
    pub fn from_minutes(minutes: i32) -> DailyMode {
        Self::try_from_minutes(minutes).unwrap_or_default()
    }

    pub fn minutes(self) -> i32 {
        match self {
            DailyMode::Ten => 10,
            DailyMode::Twenty => 20,
            DailyMode::Thirty => 30,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub daily_mode: i32,
    pub current_streak: i32,
    pub longest_streak: i32,
    #[ts(type = "number")]
    pub total_xp: i64,
    pub last_mission_date: Option<NaiveDate>,
    pub skill_level: SkillLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn mode(&self) -> DailyMode {
        DailyMode::from_minutes(self.daily_mode)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"SELECT id, email, full_name, daily_mode, current_streak, longest_streak, total_xp, last_mission_date, skill_level, created_at, updated_at
               FROM users
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Create a zeroed profile unless one exists, then return the stored row.
    pub async fn ensure(
        pool: &SqlitePool,
        id: &str,
        email: &str,
        full_name: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO users (id, email, full_name)
               VALUES ($1, $2, $3)
               ON CONFLICT(id) DO NOTHING"#,
        )
        .bind(id)
        .bind(email)
        .bind(full_name)
        .execute(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Add XP and recompute the skill level in the same statement.
    pub async fn add_xp(
        pool: &SqlitePool,
        id: &str,
        amount: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"UPDATE users
               SET total_xp = total_xp + $2,
                   skill_level = CASE
                       WHEN total_xp + $2 < $3 THEN 'Beginner'
                       WHEN total_xp + $2 < $4 THEN 'Strong'
                       ELSE 'Master'
                   END,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, email, full_name, daily_mode, current_streak, longest_streak, total_xp, last_mission_date, skill_level, created_at, updated_at"#,
        )
        .bind(id)
        .bind(amount)
        .bind(STRONG_XP_THRESHOLD)
        .bind(MASTER_XP_THRESHOLD)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_daily_mode(
        pool: &SqlitePool,
        id: &str,
        mode: DailyMode,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"UPDATE users
               SET daily_mode = $2,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, email, full_name, daily_mode, current_streak, longest_streak, total_xp, last_mission_date, skill_level, created_at, updated_at"#,
        )
        .bind(id)
        .bind(mode.minutes())
        .fetch_optional(pool)
        .await
    }

    pub async fn increment_streak(
        pool: &SqlitePool,
        id: &str,
        today: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"UPDATE users
               SET current_streak = current_streak + 1,
                   longest_streak = MAX(longest_streak, current_streak + 1),
                   last_mission_date = $2,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, email, full_name, daily_mode, current_streak, longest_streak, total_xp, last_mission_date, skill_level, created_at, updated_at"#,
        )
        .bind(id)
        .bind(today)
        .fetch_optional(pool)
        .await
    }
}
