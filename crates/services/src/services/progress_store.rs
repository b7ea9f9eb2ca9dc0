//! Storage seam for the catalog, the progress ledger, learner profiles and mission content.

use async_trait::async_trait;
use chrono::NaiveDate;
use db::{
    DBService,
    models::{
        mission::{CreateMission, Mission},
        mission_content::{CreateWritingSubmission, StoredContent, WritingSubmission},
        mission_progress::{MissionProgress, MissionStep},
        mission_ref::MissionRef,
        user_profile::{DailyMode, UserProfile},
    },
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Relational operations the domain services need. Every write is an
/// idempotent upsert or an increment keyed by user.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn list_missions(&self) -> Result<Vec<Mission>, StoreError>;

    /// Insert slots for days that have none. Never overwrites an existing day.
    async fn insert_missing_missions(&self, missions: &[CreateMission]) -> Result<u64, StoreError>;

    async fn find_mission(&self, id: Uuid) -> Result<Option<Mission>, StoreError>;

    async fn find_mission_by_day(&self, day_number: i32) -> Result<Option<Mission>, StoreError>;

    async fn list_progress(&self, user_id: &str) -> Result<Vec<MissionProgress>, StoreError>;

    async fn mark_step(
        &self,
        user_id: &str,
        mission: &MissionRef,
        step: MissionStep,
    ) -> Result<(), StoreError>;

    async fn mark_completed(
        &self,
        user_id: &str,
        mission: &MissionRef,
        xp_earned: i32,
    ) -> Result<(), StoreError>;

    async fn unlock_mission(&self, user_id: &str, mission: &MissionRef) -> Result<(), StoreError>;

    async fn set_quiz_score(
        &self,
        user_id: &str,
        mission: &MissionRef,
        quiz_score: i32,
    ) -> Result<(), StoreError>;

    async fn find_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    async fn ensure_profile(
        &self,
        user_id: &str,
        email: &str,
        full_name: Option<&str>,
    ) -> Result<UserProfile, StoreError>;

    async fn add_xp(&self, user_id: &str, amount: i64) -> Result<Option<UserProfile>, StoreError>;

    async fn increment_streak(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Option<UserProfile>, StoreError>;

    async fn set_daily_mode(
        &self,
        user_id: &str,
        mode: DailyMode,
    ) -> Result<Option<UserProfile>, StoreError>;

    async fn load_content(&self, mission_id: Uuid) -> Result<StoredContent, StoreError>;

    async fn record_writing_submission(
        &self,
        user_id: &str,
        submission: &CreateWritingSubmission,
    ) -> Result<WritingSubmission, StoreError>;
}

/// `ProgressStore` over the SQLite database
#[derive(Clone)]
pub struct SqliteProgressStore {
    db: DBService,
}

impl SqliteProgressStore {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn list_missions(&self) -> Result<Vec<Mission>, StoreError> {
        Ok(Mission::find_all(&self.db.pool).await?)
    }

    async fn insert_missing_missions(&self, missions: &[CreateMission]) -> Result<u64, StoreError> {
        Ok(Mission::insert_missing(&self.db.pool, missions).await?)
    }

    async fn find_mission(&self, id: Uuid) -> Result<Option<Mission>, StoreError> {
        Ok(Mission::find_by_id(&self.db.pool, id).await?)
    }

    async fn find_mission_by_day(&self, day_number: i32) -> Result<Option<Mission>, StoreError> {
        Ok(Mission::find_by_day(&self.db.pool, day_number).await?)
    }

    async fn list_progress(&self, user_id: &str) -> Result<Vec<MissionProgress>, StoreError> {
        Ok(MissionProgress::find_by_user(&self.db.pool, user_id).await?)
    }

    async fn mark_step(
        &self,
        user_id: &str,
        mission: &MissionRef,
        step: MissionStep,
    ) -> Result<(), StoreError> {
        Ok(MissionProgress::mark_step(&self.db.pool, user_id, mission, step).await?)
    }

    async fn mark_completed(
        &self,
        user_id: &str,
        mission: &MissionRef,
        xp_earned: i32,
    ) -> Result<(), StoreError> {
        Ok(MissionProgress::mark_completed(&self.db.pool, user_id, mission, xp_earned).await?)
    }

    async fn unlock_mission(&self, user_id: &str, mission: &MissionRef) -> Result<(), StoreError> {
        Ok(MissionProgress::unlock(&self.db.pool, user_id, mission).await?)
    }

    async fn set_quiz_score(
        &self,
        user_id: &str,
        mission: &MissionRef,
        quiz_score: i32,
    ) -> Result<(), StoreError> {
        MissionProgress::update_quiz_score(&self.db.pool, user_id, mission, quiz_score).await?;
        Ok(())
    }

    async fn find_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(UserProfile::find_by_id(&self.db.pool, user_id).await?)
    }

    async fn ensure_profile(
        &self,
        user_id: &str,
        email: &str,
        full_name: Option<&str>,
    ) -> Result<UserProfile, StoreError> {
        Ok(UserProfile::ensure(&self.db.pool, user_id, email, full_name).await?)
    }

    async fn add_xp(&self, user_id: &str, amount: i64) -> Result<Option<UserProfile>, StoreError> {
        Ok(UserProfile::add_xp(&self.db.pool, user_id, amount).await?)
    }

    async fn increment_streak(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Option<UserProfile>, StoreError> {
        Ok(UserProfile::increment_streak(&self.db.pool, user_id, today).await?)
    }

    async fn set_daily_mode(
        &self,
        user_id: &str,
        mode: DailyMode,
    ) -> Result<Option<UserProfile>, StoreError> {
        Ok(UserProfile::update_daily_mode(&self.db.pool, user_id, mode).await?)
    }

    async fn load_content(&self, mission_id: Uuid) -> Result<StoredContent, StoreError> {
        Ok(StoredContent::load(&self.db.pool, mission_id).await?)
    }

    async fn record_writing_submission(
        &self,
        user_id: &str,
        submission: &CreateWritingSubmission,
    ) -> Result<WritingSubmission, StoreError> {
        Ok(WritingSubmission::create(&self.db.pool, user_id, submission).await?)
    }
}
