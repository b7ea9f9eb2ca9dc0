//! In-memory `ProgressStore` for service tests, with failure injection.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use db::models::{
    mission::{CreateMission, Mission},
    mission_content::{CreateWritingSubmission, StoredContent, WritingSubmission},
    mission_progress::{MissionProgress, MissionStatus, MissionStep},
    mission_ref::MissionRef,
    user_profile::{DailyMode, SkillLevel, UserProfile},
};
use uuid::Uuid;

use super::progress_store::{ProgressStore, StoreError};

#[derive(Default)]
struct State {
    missions: Vec<Mission>,
    progress: HashMap<(String, String), MissionProgress>,
    profiles: HashMap<String, UserProfile>,
    content: HashMap<Uuid, StoredContent>,
    submissions: Vec<WritingSubmission>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    pub writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn seed_mission(&self, mission: CreateMission) -> Mission {
        let now = Utc::now();
        let mission = Mission {
            id: Uuid::new_v4(),
            day_number: mission.day_number,
            title: mission.title,
            description: mission.description,
            week_number: mission.week_number,
            is_project: mission.is_project,
            xp_reward: mission.xp_reward,
            is_published: mission.is_published,
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.lock().unwrap();
        state.missions.push(mission.clone());
        state.missions.sort_by_key(|m| m.day_number);
        mission
    }

    pub fn seed_progress(&self, user_id: &str, mission_id: &str, status: MissionStatus) {
        let mut record = blank_record(user_id, mission_id);
        record.status = status;
        if status == MissionStatus::Completed {
            record.lesson_completed = true;
            record.vocab_completed = true;
            record.coding_task_completed = true;
            record.quiz_completed = true;
            record.writing_task_completed = true;
            record.completed_at = Some(Utc::now());
        }
        self.state
            .lock()
            .unwrap()
            .progress
            .insert((user_id.to_string(), mission_id.to_string()), record);
    }

    /// An in-progress record stored under a raw `mission_id` with `steps` done
    pub fn seed_steps(&self, user_id: &str, mission_id: &str, steps: &[MissionStep]) {
        let mut record = blank_record(user_id, mission_id);
        record.status = MissionStatus::InProgress;
        for step in steps {
            match step {
                MissionStep::Lesson => record.lesson_completed = true,
                MissionStep::Vocab => record.vocab_completed = true,
                MissionStep::Coding => record.coding_task_completed = true,
                MissionStep::Quiz => record.quiz_completed = true,
                MissionStep::Writing => record.writing_task_completed = true,
            }
        }
        self.state
            .lock()
            .unwrap()
            .progress
            .insert((user_id.to_string(), mission_id.to_string()), record);
    }

    pub fn seed_content(&self, mission_id: Uuid, content: StoredContent) {
        self.state.lock().unwrap().content.insert(mission_id, content);
    }

    pub fn progress(&self, user_id: &str, mission: &MissionRef) -> Option<MissionProgress> {
        self.state
            .lock()
            .unwrap()
            .progress
            .get(&(user_id.to_string(), mission.to_string()))
            .cloned()
    }

    pub fn profile(&self, user_id: &str) -> Option<UserProfile> {
        self.state.lock().unwrap().profiles.get(user_id).cloned()
    }

    pub fn submissions(&self) -> Vec<WritingSubmission> {
        self.state.lock().unwrap().submissions.clone()
    }

    fn read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }

    fn write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn blank_record(user_id: &str, mission_id: &str) -> MissionProgress {
    let now = Utc::now();
    MissionProgress {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        mission_id: mission_id.to_string(),
        status: MissionStatus::Available,
        lesson_completed: false,
        vocab_completed: false,
        coding_task_completed: false,
        quiz_completed: false,
        writing_task_completed: false,
        quiz_score: 0,
        xp_earned: 0,
        completed_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn list_missions(&self) -> Result<Vec<Mission>, StoreError> {
        self.read()?;
        Ok(self.state.lock().unwrap().missions.clone())
    }

    async fn insert_missing_missions(&self, missions: &[CreateMission]) -> Result<u64, StoreError> {
        self.write()?;
        let mut inserted = 0;
        for mission in missions {
            let exists = self
                .state
                .lock()
                .unwrap()
                .missions
                .iter()
                .any(|m| m.day_number == mission.day_number);
            if !exists {
                self.seed_mission(mission.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn find_mission(&self, id: Uuid) -> Result<Option<Mission>, StoreError> {
        self.read()?;
        let state = self.state.lock().unwrap();
        Ok(state.missions.iter().find(|m| m.id == id).cloned())
    }

    async fn find_mission_by_day(&self, day_number: i32) -> Result<Option<Mission>, StoreError> {
        self.read()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .missions
            .iter()
            .find(|m| m.day_number == day_number)
            .cloned())
    }

    async fn list_progress(&self, user_id: &str) -> Result<Vec<MissionProgress>, StoreError> {
        self.read()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .progress
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_step(
        &self,
        user_id: &str,
        mission: &MissionRef,
        step: MissionStep,
    ) -> Result<(), StoreError> {
        self.write()?;
        let mut state = self.state.lock().unwrap();
        let record = state
            .progress
            .entry((user_id.to_string(), mission.to_string()))
            .or_insert_with(|| blank_record(user_id, &mission.to_string()));
        let mut flags = record.flags();
        flags.set(step);
        record.lesson_completed = flags.lesson_completed;
        record.vocab_completed = flags.vocab_completed;
        record.coding_task_completed = flags.coding_task_completed;
        record.quiz_completed = flags.quiz_completed;
        record.writing_task_completed = flags.writing_task_completed;
        if record.status != MissionStatus::Completed {
            record.status = MissionStatus::InProgress;
        }
        Ok(())
    }

    async fn mark_completed(
        &self,
        user_id: &str,
        mission: &MissionRef,
        xp_earned: i32,
    ) -> Result<(), StoreError> {
        self.write()?;
        let mut state = self.state.lock().unwrap();
        let record = state
            .progress
            .entry((user_id.to_string(), mission.to_string()))
            .or_insert_with(|| blank_record(user_id, &mission.to_string()));
        record.status = MissionStatus::Completed;
        record.lesson_completed = true;
        record.vocab_completed = true;
        record.coding_task_completed = true;
        record.quiz_completed = true;
        record.writing_task_completed = true;
        record.xp_earned = xp_earned;
        record.completed_at.get_or_insert_with(Utc::now);
        Ok(())
    }

    async fn unlock_mission(&self, user_id: &str, mission: &MissionRef) -> Result<(), StoreError> {
        self.write()?;
        let mut state = self.state.lock().unwrap();
        let record = state
            .progress
            .entry((user_id.to_string(), mission.to_string()))
            .or_insert_with(|| blank_record(user_id, &mission.to_string()));
        if record.status == MissionStatus::Locked {
            record.status = MissionStatus::Available;
        }
        Ok(())
    }

    async fn set_quiz_score(
        &self,
        user_id: &str,
        mission: &MissionRef,
        quiz_score: i32,
    ) -> Result<(), StoreError> {
        self.write()?;
        let mut state = self.state.lock().unwrap();
        if let Some(record) = state
            .progress
            .get_mut(&(user_id.to_string(), mission.to_string()))
        {
            record.quiz_score = quiz_score;
        }
        Ok(())
    }

    async fn find_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        self.read()?;
        Ok(self.profile(user_id))
    }

    async fn ensure_profile(
        &self,
        user_id: &str,
        email: &str,
        full_name: Option<&str>,
    ) -> Result<UserProfile, StoreError> {
        self.write()?;
        let now = Utc::now();
        let mut state = self.state.lock().unwrap();
        let profile = state
            .profiles
            .entry(user_id.to_string())
            .or_insert_with(|| UserProfile {
                id: user_id.to_string(),
                email: email.to_string(),
                full_name: full_name.map(str::to_string),
                daily_mode: 20,
                current_streak: 0,
                longest_streak: 0,
                total_xp: 0,
                last_mission_date: None,
                skill_level: SkillLevel::Beginner,
                created_at: now,
                updated_at: now,
            });
        Ok(profile.clone())
    }

    async fn add_xp(&self, user_id: &str, amount: i64) -> Result<Option<UserProfile>, StoreError> {
        self.write()?;
        let mut state = self.state.lock().unwrap();
        Ok(state.profiles.get_mut(user_id).map(|profile| {
            profile.total_xp += amount;
            profile.skill_level = SkillLevel::for_xp(profile.total_xp);
            profile.clone()
        }))
    }

    async fn set_daily_mode(
        &self,
        user_id: &str,
        mode: DailyMode,
    ) -> Result<Option<UserProfile>, StoreError> {
        self.write()?;
        let mut state = self.state.lock().unwrap();
        Ok(state.profiles.get_mut(user_id).map(|profile| {
            profile.daily_mode = mode.minutes();
            profile.updated_at = Utc::now();
            profile.clone()
        }))
    }

    async fn increment_streak(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Option<UserProfile>, StoreError> {
        self.write()?;
        let mut state = self.state.lock().unwrap();
        Ok(state.profiles.get_mut(user_id).map(|profile| {
            profile.current_streak += 1;
            profile.longest_streak = profile.longest_streak.max(profile.current_streak);
            profile.last_mission_date = Some(today);
            profile.clone()
        }))
    }

    async fn load_content(&self, mission_id: Uuid) -> Result<StoredContent, StoreError> {
        self.read()?;
        let state = self.state.lock().unwrap();
        Ok(state.content.get(&mission_id).cloned().unwrap_or_default())
    }

    async fn record_writing_submission(
        &self,
        user_id: &str,
        submission: &CreateWritingSubmission,
    ) -> Result<WritingSubmission, StoreError> {
        self.write()?;
        let record = WritingSubmission {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            writing_task_id: submission.writing_task_id,
            submission_text: submission.submission_text.clone(),
            word_count: submission.word_count,
            submitted_at: Utc::now(),
        };
        self.state.lock().unwrap().submissions.push(record.clone());
        Ok(record)
    }
}
