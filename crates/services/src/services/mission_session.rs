//! Forward-only walk through the five steps of one mission for one learner.
//!
//! Step writes are best effort: a failed write is logged and flips the
//! session's `unconfirmed` flag, but the learner keeps moving. Only the
//! reads needed to open a session are fatal.

use std::sync::Arc;

use chrono::Utc;
use db::models::{
    mission::CURRICULUM_DAYS,
    mission_content::CreateWritingSubmission,
    mission_progress::{MissionProgress, MissionStatus, MissionStep, ProgressFlags},
    mission_ref::MissionRef,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use ts_rs::TS;

use super::{
    catalog::DaySlot,
    mission_content::{MissionContent, QuizResult, WritingCheck},
    progress_store::{ProgressStore, StoreError},
    reconciler::{preferred, records_for_day},
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("mission {0} not found")]
    UnknownMission(MissionRef),
    #[error("step {requested} cannot be completed now")]
    OutOfOrder {
        current: Option<MissionStep>,
        requested: MissionStep,
    },
    #[error("steps can only be reviewed once the mission is completed")]
    ReviewLocked,
}

/// Where a session stands: on one of the five steps, or done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Lesson,
    Vocab,
    Coding,
    Quiz,
    Writing,
    Completed,
}

impl SessionPhase {
    pub fn step(self) -> Option<MissionStep> {
        match self {
            SessionPhase::Lesson => Some(MissionStep::Lesson),
            SessionPhase::Vocab => Some(MissionStep::Vocab),
            SessionPhase::Coding => Some(MissionStep::Coding),
            SessionPhase::Quiz => Some(MissionStep::Quiz),
            SessionPhase::Writing => Some(MissionStep::Writing),
            SessionPhase::Completed => None,
        }
    }
}

impl From<MissionStep> for SessionPhase {
    fn from(step: MissionStep) -> Self {
        match step {
            MissionStep::Lesson => SessionPhase::Lesson,
            MissionStep::Vocab => SessionPhase::Vocab,
            MissionStep::Coding => SessionPhase::Coding,
            MissionStep::Quiz => SessionPhase::Quiz,
            MissionStep::Writing => SessionPhase::Writing,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct CompletionSummary {
    pub day_number: i32,
    pub xp_earned: i32,
    /// False when the mission had already been completed and nothing was awarded
    pub rewarded: bool,
    #[ts(type = "string | null")]
    pub next_mission: Option<MissionRef>,
    pub next_day: Option<i32>,
    pub unconfirmed: bool,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Advanced { next: MissionStep, unconfirmed: bool },
    Completed(CompletionSummary),
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct SessionView {
    pub slot: DaySlot,
    #[ts(type = "string")]
    pub progress_ref: MissionRef,
    pub phase: SessionPhase,
    pub flags: ProgressFlags,
    pub reviewing: Option<MissionStep>,
    pub completed_before_session: bool,
    pub unconfirmed: bool,
    pub summary: Option<CompletionSummary>,
}

pub struct MissionSession {
    store: Arc<dyn ProgressStore>,
    user_id: String,
    slot: DaySlot,
    /// Ref the ledger record lives under; a legacy virtual record keeps its ref
    progress_ref: MissionRef,
    flags: ProgressFlags,
    carry_flags: bool,
    phase: SessionPhase,
    reviewing: Option<MissionStep>,
    completed_before_session: bool,
    unconfirmed: bool,
    summary: Option<CompletionSummary>,
}

impl MissionSession {
    /// Resolve `mission` to its day slot and resume from the stored record.
    pub async fn open(
        store: Arc<dyn ProgressStore>,
        user_id: &str,
        mission: MissionRef,
    ) -> Result<Self, SessionError> {
        let slot = match mission {
            MissionRef::Persisted(id) => store
                .find_mission(id)
                .await?
                .map(|m| DaySlot::from_mission(&m))
                .ok_or(SessionError::UnknownMission(mission))?,
            MissionRef::Virtual(day) => store
                .find_mission_by_day(day)
                .await?
                .map(|m| DaySlot::from_mission(&m))
                .unwrap_or_else(|| DaySlot::placeholder(day)),
        };

        let DayRecord { record, completed } = load_day_record(store.as_ref(), user_id, &slot).await?;

        let progress_ref = record
            .as_ref()
            .and_then(MissionProgress::mission_ref)
            .unwrap_or(slot.mission_ref);
        // A record under an alias such as `emergency-N` is continued under its
        // canonical ref, so the steps it already holds are written there too.
        let carry_flags = record
            .as_ref()
            .is_some_and(|r| r.mission_id != progress_ref.to_string());

        let (flags, phase) = if completed {
            (ProgressFlags::all_complete(), SessionPhase::Completed)
        } else {
            let flags = record.as_ref().map(|r| r.flags()).unwrap_or_default();
            // Every flag set without a completed status means the completion
            // writes never landed; the final step runs them again.
            let resume = flags.first_incomplete().unwrap_or(MissionStep::Writing);
            (flags, SessionPhase::from(resume))
        };

        debug!(
            user_id = %user_id,
            day = slot.day_number,
            progress_ref = %progress_ref,
            phase = ?phase,
            "Opened mission session"
        );

        Ok(Self {
            store,
            user_id: user_id.to_string(),
            slot,
            progress_ref,
            flags,
            carry_flags,
            phase,
            reviewing: None,
            completed_before_session: completed,
            unconfirmed: false,
            summary: None,
        })
    }

    pub fn slot(&self) -> &DaySlot {
        &self.slot
    }

    pub fn progress_ref(&self) -> MissionRef {
        self.progress_ref
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn current_step(&self) -> Option<MissionStep> {
        self.phase.step()
    }

    pub fn flags(&self) -> ProgressFlags {
        self.flags
    }

    pub fn is_unconfirmed(&self) -> bool {
        self.unconfirmed
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            slot: self.slot.clone(),
            progress_ref: self.progress_ref,
            phase: self.phase,
            flags: self.flags,
            reviewing: self.reviewing,
            completed_before_session: self.completed_before_session,
            unconfirmed: self.unconfirmed,
            summary: self.summary.clone(),
        }
    }

    /// Complete the current step. Any other step is rejected without effect.
    pub async fn complete_step(&mut self, step: MissionStep) -> Result<StepOutcome, SessionError> {
        if self.current_step() != Some(step) {
            return Err(SessionError::OutOfOrder {
                current: self.current_step(),
                requested: step,
            });
        }

        self.flags.set(step);
        match step.next() {
            Some(next) => {
                self.save_step(step).await;
                self.phase = SessionPhase::from(next);
                Ok(StepOutcome::Advanced {
                    next,
                    unconfirmed: self.unconfirmed,
                })
            }
            None => Ok(StepOutcome::Completed(self.complete_mission().await)),
        }
    }

    async fn save_step(&mut self, step: MissionStep) {
        let steps: Vec<MissionStep> = if self.carry_flags {
            MissionStep::ALL
                .into_iter()
                .filter(|s| self.flags.get(*s))
                .collect()
        } else {
            vec![step]
        };

        for s in steps {
            if let Err(e) = self.store.mark_step(&self.user_id, &self.progress_ref, s).await {
                warn!(
                    user_id = %self.user_id,
                    mission = %self.progress_ref,
                    step = %s,
                    "Failed to save step progress: {}", e
                );
                self.unconfirmed = true;
                return;
            }
        }
        self.carry_flags = false;
    }

    /// Record the mission as completed, award XP and streak once, and unlock
    /// the next day.
    async fn complete_mission(&mut self) -> CompletionSummary {
        let day = self.slot.day_number;
        let xp_reward = self.slot.xp_reward;

        // Another tab may have finished the mission since this session opened.
        let already_completed = self.completed_before_session
            || match load_day_record(self.store.as_ref(), &self.user_id, &self.slot).await {
                Ok(day_record) => day_record.completed,
                Err(e) => {
                    warn!(user_id = %self.user_id, day, "Failed to re-read progress before completion: {}", e);
                    false
                }
            };

        if let Err(e) = self
            .store
            .mark_completed(&self.user_id, &self.progress_ref, xp_reward)
            .await
        {
            warn!(user_id = %self.user_id, day, "Failed to save mission completion: {}", e);
            self.unconfirmed = true;
        }

        if !already_completed {
            self.award(xp_reward).await;
        } else {
            debug!(user_id = %self.user_id, day, "Mission already completed, skipping rewards");
        }

        let (next_mission, next_day) = if day < CURRICULUM_DAYS {
            let next_day = day + 1;
            (Some(self.unlock_next(next_day).await), Some(next_day))
        } else {
            (None, None)
        };

        let summary = CompletionSummary {
            day_number: day,
            xp_earned: if already_completed { 0 } else { xp_reward },
            rewarded: !already_completed,
            next_mission,
            next_day,
            unconfirmed: self.unconfirmed,
        };

        info!(
            user_id = %self.user_id,
            day,
            xp = summary.xp_earned,
            unconfirmed = self.unconfirmed,
            "Mission completed"
        );

        self.phase = SessionPhase::Completed;
        self.summary = Some(summary.clone());
        summary
    }

    async fn award(&mut self, xp_reward: i32) {
        match self.store.add_xp(&self.user_id, i64::from(xp_reward)).await {
            Ok(Some(profile)) => {
                debug!(user_id = %self.user_id, total_xp = profile.total_xp, "Awarded XP")
            }
            Ok(None) => {
                warn!(user_id = %self.user_id, "No learner profile to award XP to");
                self.unconfirmed = true;
            }
            Err(e) => {
                warn!(user_id = %self.user_id, "Failed to award XP: {}", e);
                self.unconfirmed = true;
            }
        }

        let today = Utc::now().date_naive();
        match self.store.increment_streak(&self.user_id, today).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!(user_id = %self.user_id, "No learner profile to update streak for");
                self.unconfirmed = true;
            }
            Err(e) => {
                warn!(user_id = %self.user_id, "Failed to update streak: {}", e);
                self.unconfirmed = true;
            }
        }
    }

    /// Make `next_day` available and return the ref the learner should follow.
    async fn unlock_next(&mut self, next_day: i32) -> MissionRef {
        match self.store.find_mission_by_day(next_day).await {
            Ok(Some(mission)) => {
                let next = MissionRef::Persisted(mission.id);
                if let Err(e) = self.store.unlock_mission(&self.user_id, &next).await {
                    warn!(user_id = %self.user_id, day = next_day, "Failed to unlock next mission: {}", e);
                    self.unconfirmed = true;
                }
                next
            }
            Ok(None) => MissionRef::Virtual(next_day),
            Err(e) => {
                warn!(user_id = %self.user_id, day = next_day, "Failed to look up next mission: {}", e);
                self.unconfirmed = true;
                MissionRef::Virtual(next_day)
            }
        }
    }

    /// Re-open a step for viewing after completion. Never changes flags.
    pub fn review(&mut self, step: MissionStep) -> Result<MissionStep, SessionError> {
        if self.phase != SessionPhase::Completed {
            return Err(SessionError::ReviewLocked);
        }
        self.reviewing = Some(step);
        Ok(step)
    }

    /// Accept a step-specific submission while on `step`, or while reviewing
    /// a completed mission (checked, nothing advances).
    fn submission_allowed(&self, step: MissionStep) -> Result<bool, SessionError> {
        match self.phase {
            SessionPhase::Completed => Ok(false),
            phase if phase.step() == Some(step) => Ok(true),
            _ => Err(SessionError::OutOfOrder {
                current: self.current_step(),
                requested: step,
            }),
        }
    }

    /// Score the quiz; on the quiz step this also completes it and stores the
    /// percentage.
    pub async fn submit_quiz(
        &mut self,
        content: &MissionContent,
        answers: &[String],
    ) -> Result<QuizOutcome, SessionError> {
        let advance = self.submission_allowed(MissionStep::Quiz)?;
        let result = content.score_quiz(answers);
        if !advance {
            return Ok(QuizOutcome { result, step: None });
        }

        let step = self.complete_step(MissionStep::Quiz).await?;
        if let Err(e) = self
            .store
            .set_quiz_score(&self.user_id, &self.progress_ref, result.percent)
            .await
        {
            warn!(user_id = %self.user_id, mission = %self.progress_ref, "Failed to save quiz score: {}", e);
            self.unconfirmed = true;
        }

        Ok(QuizOutcome {
            result,
            step: Some(step),
        })
    }

    /// Check the writing length. A valid text on the writing step is recorded
    /// (authored tasks only) and completes the mission.
    pub async fn submit_writing(
        &mut self,
        content: &MissionContent,
        text: &str,
    ) -> Result<WritingOutcome, SessionError> {
        let advance = self.submission_allowed(MissionStep::Writing)?;
        let check = content.check_writing(text);
        if !advance || !check.valid {
            return Ok(WritingOutcome {
                check,
                recorded: false,
                step: None,
            });
        }

        let mut recorded = false;
        if let Some(writing_task_id) = content.writing_task.id {
            let submission = CreateWritingSubmission {
                writing_task_id,
                submission_text: text.to_string(),
                word_count: check.word_count,
            };
            match self
                .store
                .record_writing_submission(&self.user_id, &submission)
                .await
            {
                Ok(_) => recorded = true,
                Err(e) => {
                    warn!(user_id = %self.user_id, "Failed to record writing submission: {}", e);
                    self.unconfirmed = true;
                }
            }
        }

        let step = self.complete_step(MissionStep::Writing).await?;
        Ok(WritingOutcome {
            check,
            recorded,
            step: Some(step),
        })
    }
}

/// Ledger state for a day across every ref form its records were stored under
struct DayRecord {
    /// The record a session continues from
    record: Option<MissionProgress>,
    completed: bool,
}

async fn load_day_record(
    store: &dyn ProgressStore,
    user_id: &str,
    slot: &DaySlot,
) -> Result<DayRecord, StoreError> {
    let records = store.list_progress(user_id).await?;
    let matching = records_for_day(&records, slot.day_number, slot.mission_ref.persisted_id());
    let completed = matching
        .iter()
        .any(|r| r.status == MissionStatus::Completed);
    let record = matching.into_iter().reduce(|a, b| preferred(a, b)).cloned();
    Ok(DayRecord { record, completed })
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct QuizOutcome {
    pub result: QuizResult,
    pub step: Option<StepOutcome>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct WritingOutcome {
    pub check: WritingCheck,
    pub recorded: bool,
    pub step: Option<StepOutcome>,
}
