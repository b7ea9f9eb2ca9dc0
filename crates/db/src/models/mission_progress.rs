use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::mission_ref::MissionRef;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "mission_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum MissionStatus {
    Locked,
    #[default]
    Available,
    InProgress,
    Completed,
}

impl MissionStatus {
    /// Ordering used when two records compete for the same day.
    pub fn rank(self) -> u8 {
        match self {
            MissionStatus::Locked => 0,
            MissionStatus::Available => 1,
            MissionStatus::InProgress => 2,
            MissionStatus::Completed => 3,
        }
    }
}

/// One of the five sub-steps of a mission, in walk order
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MissionStep {
    Lesson,
    Vocab,
    Coding,
    Quiz,
    Writing,
}

impl MissionStep {
    pub const ALL: [MissionStep; 5] = [
        MissionStep::Lesson,
        MissionStep::Vocab,
        MissionStep::Coding,
        MissionStep::Quiz,
        MissionStep::Writing,
    ];

    pub fn next(self) -> Option<MissionStep> {
        match self {
            MissionStep::Lesson => Some(MissionStep::Vocab),
            MissionStep::Vocab => Some(MissionStep::Coding),
            MissionStep::Coding => Some(MissionStep::Quiz),
            MissionStep::Quiz => Some(MissionStep::Writing),
            MissionStep::Writing => None,
        }
    }

    /// Column holding this step's completion flag
    fn column(self) -> &'static str {
        match self {
            MissionStep::Lesson => "lesson_completed",
            MissionStep::Vocab => "vocab_completed",
            MissionStep::Coding => "coding_task_completed",
            MissionStep::Quiz => "quiz_completed",
            MissionStep::Writing => "writing_task_completed",
        }
    }
}

/// The five sub-task flags of a progress record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ProgressFlags {
    pub lesson_completed: bool,
    pub vocab_completed: bool,
    pub coding_task_completed: bool,
    pub quiz_completed: bool,
    pub writing_task_completed: bool,
}

impl ProgressFlags {
    pub fn all_complete() -> Self {
        Self {
            lesson_completed: true,
            vocab_completed: true,
            coding_task_completed: true,
            quiz_completed: true,
            writing_task_completed: true,
        }
    }

    pub fn get(&self, step: MissionStep) -> bool {
        match step {
            MissionStep::Lesson => self.lesson_completed,
            MissionStep::Vocab => self.vocab_completed,
            MissionStep::Coding => self.coding_task_completed,
            MissionStep::Quiz => self.quiz_completed,
            MissionStep::Writing => self.writing_task_completed,
        }
    }

    /// Flags only ever go from false to true.
    pub fn set(&mut self, step: MissionStep) {
        match step {
            MissionStep::Lesson => self.lesson_completed = true,
            MissionStep::Vocab => self.vocab_completed = true,
            MissionStep::Coding => self.coding_task_completed = true,
            MissionStep::Quiz => self.quiz_completed = true,
            MissionStep::Writing => self.writing_task_completed = true,
        }
    }

    pub fn first_incomplete(&self) -> Option<MissionStep> {
        MissionStep::ALL.into_iter().find(|step| !self.get(*step))
    }

    pub fn is_complete(&self) -> bool {
        self.first_incomplete().is_none()
    }

    pub fn completed_count(&self) -> usize {
        MissionStep::ALL.iter().filter(|step| self.get(**step)).count()
    }
}

/// Per-user completion record for one mission, keyed by `(user_id, mission_id)`
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct MissionProgress {
    pub id: Uuid,
    pub user_id: String,
    pub mission_id: String, // Mission UUID or virtual `day-N`; see MissionRef
    pub status: MissionStatus,
    pub lesson_completed: bool,
    pub vocab_completed: bool,
    pub coding_task_completed: bool,
    pub quiz_completed: bool,
    pub writing_task_completed: bool,
    pub quiz_score: i32,
    pub xp_earned: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MissionProgress {
    pub fn mission_ref(&self) -> Option<MissionRef> {
        MissionRef::parse(&self.mission_id)
    }

    pub fn flags(&self) -> ProgressFlags {
        ProgressFlags {
            lesson_completed: self.lesson_completed,
            vocab_completed: self.vocab_completed,
            coding_task_completed: self.coding_task_completed,
            quiz_completed: self.quiz_completed,
            writing_task_completed: self.writing_task_completed,
        }
    }

    pub async fn find_by_user(
        pool: &SqlitePool,
        user_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, MissionProgress>(
            r#"SELECT id, user_id, mission_id, status, lesson_completed, vocab_completed, coding_task_completed, quiz_completed, writing_task_completed, quiz_score, xp_earned, completed_at, created_at, updated_at
               FROM user_mission_progress
               WHERE user_id = $1
               ORDER BY created_at ASC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find(
        pool: &SqlitePool,
        user_id: &str,
        mission: &MissionRef,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MissionProgress>(
            r#"SELECT id, user_id, mission_id, status, lesson_completed, vocab_completed, coding_task_completed, quiz_completed, writing_task_completed, quiz_score, xp_earned, completed_at, created_at, updated_at
               FROM user_mission_progress
               WHERE user_id = $1 AND mission_id = $2"#,
        )
        .bind(user_id)
        .bind(mission.to_string())
        .fetch_optional(pool)
        .await
    }

    /// Set one step flag and move the record to in-progress. A completed record
    /// keeps its status.
    pub async fn mark_step(
        pool: &SqlitePool,
        user_id: &str,
        mission: &MissionRef,
        step: MissionStep,
    ) -> Result<(), sqlx::Error> {
        let column = step.column();
        let sql = format!(
            r#"INSERT INTO user_mission_progress (id, user_id, mission_id, status, {column})
               VALUES ($1, $2, $3, 'in-progress', 1)
               ON CONFLICT(user_id, mission_id) DO UPDATE SET
                   {column} = 1,
                   status = CASE WHEN user_mission_progress.status = 'completed' THEN 'completed' ELSE 'in-progress' END,
                   updated_at = datetime('now', 'subsec')"#
        );
        sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(mission.to_string())
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark the mission completed with every flag set. The first completion
    /// timestamp is kept on replays.
    pub async fn mark_completed(
        pool: &SqlitePool,
        user_id: &str,
        mission: &MissionRef,
        xp_earned: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO user_mission_progress (id, user_id, mission_id, status, lesson_completed, vocab_completed, coding_task_completed, quiz_completed, writing_task_completed, xp_earned, completed_at)
               VALUES ($1, $2, $3, 'completed', 1, 1, 1, 1, 1, $4, datetime('now', 'subsec'))
               ON CONFLICT(user_id, mission_id) DO UPDATE SET
                   status = 'completed',
                   lesson_completed = 1,
                   vocab_completed = 1,
                   coding_task_completed = 1,
                   quiz_completed = 1,
                   writing_task_completed = 1,
                   xp_earned = excluded.xp_earned,
                   completed_at = COALESCE(user_mission_progress.completed_at, excluded.completed_at),
                   updated_at = datetime('now', 'subsec')"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(mission.to_string())
        .bind(xp_earned)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Make a mission available. Only creates the record or lifts a `locked`
    /// one; never touches a record that has progressed further.
    pub async fn unlock(
        pool: &SqlitePool,
        user_id: &str,
        mission: &MissionRef,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO user_mission_progress (id, user_id, mission_id, status)
               VALUES ($1, $2, $3, 'available')
               ON CONFLICT(user_id, mission_id) DO UPDATE SET
                   status = 'available',
                   updated_at = datetime('now', 'subsec')
               WHERE user_mission_progress.status = 'locked'"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(mission.to_string())
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update_quiz_score(
        pool: &SqlitePool,
        user_id: &str,
        mission: &MissionRef,
        quiz_score: i32,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE user_mission_progress
               SET quiz_score = $3, updated_at = datetime('now', 'subsec')
               WHERE user_id = $1 AND mission_id = $2"#,
        )
        .bind(user_id)
        .bind(mission.to_string())
        .bind(quiz_score)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
