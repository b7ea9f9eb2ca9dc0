//! Merges the curriculum catalog with a learner's progress ledger into the
//! 30-day roadmap.
//!
//! Progress records address their mission either by catalog id or by a
//! virtual `day-N` reference. Both resolve to a day number here; a record
//! that resolves to nothing is ignored.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use db::models::{
    mission::{CURRICULUM_DAYS, Mission},
    mission_progress::{MissionProgress, MissionStatus, ProgressFlags},
    mission_ref::MissionRef,
};
use serde::Serialize;
use tracing::debug;
use ts_rs::TS;
use uuid::Uuid;

use super::{
    catalog::{CatalogProvisioner, DaySlot},
    progress_store::{ProgressStore, StoreError},
};

#[derive(Debug, Clone, Serialize, TS)]
pub struct RoadmapEntry {
    #[serde(flatten)]
    #[ts(flatten)]
    pub slot: DaySlot,
    pub status: MissionStatus,
    #[serde(flatten)]
    #[ts(flatten)]
    pub flags: ProgressFlags,
    pub quiz_score: i32,
    pub xp_earned: i32,
    pub is_today: bool,
}

impl RoadmapEntry {
    pub fn day_number(&self) -> i32 {
        self.slot.day_number
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Roadmap {
    pub entries: Vec<RoadmapEntry>,
    pub completed_days: BTreeSet<i32>,
    pub high_water_mark: i32,
    /// `high_water_mark + 1`; 31 once every day is complete
    pub target_day: i32,
}

impl Roadmap {
    /// Day of today's mission, clamped to the final day
    pub fn today_day(&self) -> i32 {
        self.target_day.min(CURRICULUM_DAYS)
    }

    pub fn today(&self) -> &RoadmapEntry {
        let index = (self.today_day() - 1).max(0) as usize;
        &self.entries[index]
    }

    pub fn completed_count(&self) -> usize {
        self.completed_days.len()
    }

    pub fn is_finished(&self) -> bool {
        self.completed_days.len() == CURRICULUM_DAYS as usize
    }
}

/// Day a stored `mission_id` refers to, if any
pub fn resolve_day(mission_id: &str, days_by_id: &HashMap<Uuid, i32>) -> Option<i32> {
    match MissionRef::parse(mission_id)? {
        MissionRef::Persisted(id) => days_by_id.get(&id).copied(),
        MissionRef::Virtual(day) => Some(day),
    }
}

/// Record kept for a day when several resolve to it: a record addressed by
/// catalog id beats a virtual one, then the further-progressed status wins,
/// then the one with more steps done.
pub(crate) fn preferred<'a>(
    current: &'a MissionProgress,
    candidate: &'a MissionProgress,
) -> &'a MissionProgress {
    let key = |record: &MissionProgress| {
        let persisted = matches!(record.mission_ref(), Some(MissionRef::Persisted(_)));
        (persisted, record.status.rank(), record.flags().completed_count())
    };
    if key(candidate) > key(current) {
        candidate
    } else {
        current
    }
}

/// Records that resolve to `day_number`, whichever ref form they were stored
/// under. `mission_id` is the day's catalog id, if it has one.
pub(crate) fn records_for_day(
    records: &[MissionProgress],
    day_number: i32,
    mission_id: Option<Uuid>,
) -> Vec<&MissionProgress> {
    let days_by_id: HashMap<Uuid, i32> = mission_id.map(|id| (id, day_number)).into_iter().collect();
    records
        .iter()
        .filter(|record| resolve_day(&record.mission_id, &days_by_id) == Some(day_number))
        .collect()
}

/// Pure merge of catalog rows and progress records into the roadmap.
pub fn reconcile(missions: &[Mission], records: &[MissionProgress]) -> Roadmap {
    let slots: BTreeMap<i32, &Mission> = missions
        .iter()
        .filter(|m| (1..=CURRICULUM_DAYS).contains(&m.day_number))
        .map(|m| (m.day_number, m))
        .collect();
    let days_by_id: HashMap<Uuid, i32> = slots.values().map(|m| (m.id, m.day_number)).collect();

    let mut by_day: HashMap<i32, &MissionProgress> = HashMap::new();
    let mut completed_days = BTreeSet::new();

    for record in records {
        let Some(day) = resolve_day(&record.mission_id, &days_by_id) else {
            debug!(mission_id = %record.mission_id, "Ignoring progress record with unresolvable mission");
            continue;
        };
        if record.status == MissionStatus::Completed {
            completed_days.insert(day);
        }
        by_day
            .entry(day)
            .and_modify(|current| *current = preferred(*current, record))
            .or_insert(record);
    }

    let high_water_mark = completed_days.last().copied().unwrap_or(0);
    let target_day = high_water_mark + 1;
    let today_day = target_day.min(CURRICULUM_DAYS);

    let entries = (1..=CURRICULUM_DAYS)
        .map(|day| {
            let slot = slots
                .get(&day)
                .map(|m| DaySlot::from_mission(m))
                .unwrap_or_else(|| DaySlot::placeholder(day));
            let record = by_day.get(&day);

            let status = if completed_days.contains(&day) {
                MissionStatus::Completed
            } else {
                match record.map(|r| r.status) {
                    Some(stored) if stored != MissionStatus::Locked => stored,
                    _ if day <= target_day || day == 1 => MissionStatus::Available,
                    _ => MissionStatus::Locked,
                }
            };
            let flags = if status == MissionStatus::Completed {
                ProgressFlags::all_complete()
            } else {
                record.map(|r| r.flags()).unwrap_or_default()
            };

            RoadmapEntry {
                slot,
                status,
                flags,
                quiz_score: record.map(|r| r.quiz_score).unwrap_or(0),
                xp_earned: record.map(|r| r.xp_earned).unwrap_or(0),
                is_today: day == today_day,
            }
        })
        .collect();

    Roadmap {
        entries,
        completed_days,
        high_water_mark,
        target_day,
    }
}

/// Loads catalog and ledger for a learner and reconciles them
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn ProgressStore>,
    provisioner: CatalogProvisioner,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self {
            provisioner: CatalogProvisioner::new(store.clone()),
            store,
        }
    }

    pub async fn load(&self, user_id: &str) -> Result<Roadmap, StoreError> {
        let provisioned = self.provisioner.ensure().await?;
        let records = self.store.list_progress(user_id).await?;
        let roadmap = reconcile(&provisioned.missions, &records);
        debug!(
            user_id = %user_id,
            records = records.len(),
            high_water_mark = roadmap.high_water_mark,
            "Reconciled roadmap"
        );
        Ok(roadmap)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use db::models::mission_progress::MissionStep;

    use super::*;
    use crate::services::{
        catalog::default_mission, memory_store::MemoryStore, mission_session::MissionSession,
    };

    fn catalog(days: impl IntoIterator<Item = i32>) -> Vec<Mission> {
        let now = Utc::now();
        days.into_iter()
            .map(|day| {
                let m = default_mission(day);
                Mission {
                    id: Uuid::new_v4(),
                    day_number: m.day_number,
                    title: m.title,
                    description: m.description,
                    week_number: m.week_number,
                    is_project: m.is_project,
                    xp_reward: m.xp_reward,
                    is_published: true,
                    created_at: now,
                    updated_at: now,
                }
            })
            .collect()
    }

    fn record(mission_id: impl ToString, status: MissionStatus) -> MissionProgress {
        let now = Utc::now();
        let completed = status == MissionStatus::Completed;
        MissionProgress {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            mission_id: mission_id.to_string(),
            status,
            lesson_completed: completed,
            vocab_completed: completed,
            coding_task_completed: completed,
            quiz_completed: completed,
            writing_task_completed: completed,
            quiz_score: 0,
            xp_earned: 0,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn statuses(roadmap: &Roadmap) -> Vec<MissionStatus> {
        roadmap.entries.iter().map(|e| e.status).collect()
    }

    #[test]
    fn new_learner_sees_day_one_available() {
        let roadmap = reconcile(&catalog(1..=30), &[]);
        assert_eq!(roadmap.entries.len(), 30);
        assert_eq!(roadmap.high_water_mark, 0);
        assert_eq!(roadmap.entries[0].status, MissionStatus::Available);
        assert!(roadmap.entries[1..].iter().all(|e| e.status == MissionStatus::Locked));
        assert_eq!(roadmap.today().day_number(), 1);
    }

    #[test]
    fn completion_via_virtual_ref_counts_for_high_water_mark() {
        let missions = catalog(1..=30);
        let records = vec![
            record(missions[0].id, MissionStatus::Completed),
            record("day-2", MissionStatus::Completed),
            record("emergency-3", MissionStatus::Completed),
        ];

        let roadmap = reconcile(&missions, &records);
        assert_eq!(roadmap.high_water_mark, 3);
        assert_eq!(roadmap.today().day_number(), 4);
        assert!(roadmap.today().is_today);
        assert_eq!(&statuses(&roadmap)[..5], &[
            MissionStatus::Completed,
            MissionStatus::Completed,
            MissionStatus::Completed,
            MissionStatus::Available,
            MissionStatus::Locked,
        ]);
    }

    #[test]
    fn skipped_days_below_high_water_mark_stay_available() {
        let missions = catalog(1..=30);
        let roadmap = reconcile(&missions, &[record(missions[4].id, MissionStatus::Completed)]);
        assert_eq!(roadmap.high_water_mark, 5);
        assert_eq!(roadmap.entries[1].status, MissionStatus::Available);
        assert_eq!(roadmap.entries[5].status, MissionStatus::Available);
        assert_eq!(roadmap.entries[6].status, MissionStatus::Locked);
    }

    #[test]
    fn stored_status_overrides_derived_but_locked_does_not() {
        let missions = catalog(1..=30);
        let records = vec![
            record(missions[9].id, MissionStatus::InProgress),
            record(missions[0].id, MissionStatus::Locked),
        ];

        let roadmap = reconcile(&missions, &records);
        assert_eq!(roadmap.entries[9].status, MissionStatus::InProgress);
        assert_eq!(roadmap.entries[0].status, MissionStatus::Available);
    }

    #[test]
    fn persisted_record_wins_over_virtual_for_flags() {
        let missions = catalog(1..=30);
        let mut persisted = record(missions[0].id, MissionStatus::InProgress);
        persisted.lesson_completed = true;
        let mut legacy = record("day-1", MissionStatus::InProgress);
        legacy.lesson_completed = true;
        legacy.vocab_completed = true;

        let roadmap = reconcile(&missions, &[legacy, persisted]);
        let flags = roadmap.entries[0].flags;
        assert!(flags.lesson_completed);
        assert!(!flags.vocab_completed);
    }

    #[test]
    fn completed_day_reports_all_flags() {
        let missions = catalog(1..=30);
        let mut stale = record("day-1", MissionStatus::Completed);
        stale.quiz_completed = false;
        let roadmap = reconcile(&missions, &[stale]);
        assert!(roadmap.entries[0].flags.is_complete());
    }

    #[test]
    fn unresolvable_records_are_ignored() {
        let missions = catalog(1..=30);
        let records = vec![
            record("temp-9", MissionStatus::Completed),
            record(Uuid::new_v4(), MissionStatus::Completed),
            record("day-31", MissionStatus::Completed),
        ];
        let roadmap = reconcile(&missions, &records);
        assert_eq!(roadmap.high_water_mark, 0);
        assert!(roadmap.completed_days.is_empty());
    }

    #[test]
    fn missing_catalog_rows_become_virtual_placeholders() {
        let roadmap = reconcile(&catalog([1, 2, 3]), &[record("day-10", MissionStatus::Completed)]);
        assert_eq!(roadmap.entries.len(), 30);
        assert_eq!(roadmap.entries[9].slot.mission_ref, MissionRef::Virtual(10));
        assert_eq!(roadmap.entries[9].status, MissionStatus::Completed);
        assert_eq!(roadmap.today().day_number(), 11);
    }

    #[test]
    fn finished_curriculum_clamps_today_to_last_day() {
        let records: Vec<_> = (1..=30)
            .map(|day| record(format!("day-{day}"), MissionStatus::Completed))
            .collect();
        let roadmap = reconcile(&catalog(1..=30), &records);
        assert!(roadmap.is_finished());
        assert_eq!(roadmap.target_day, 31);
        assert_eq!(roadmap.today().day_number(), 30);
    }

    #[test]
    fn reconcile_is_deterministic() {
        let missions = catalog(1..=30);
        let records = vec![
            record(missions[0].id, MissionStatus::Completed),
            record("day-2", MissionStatus::InProgress),
        ];
        let a = reconcile(&missions, &records);
        let b = reconcile(&missions, &records);
        assert_eq!(statuses(&a), statuses(&b));
        assert_eq!(a.target_day, b.target_day);
    }

    #[tokio::test]
    async fn load_provisions_catalog_first() {
        let store = Arc::new(MemoryStore::new());
        store.seed_progress("u1", "day-1", MissionStatus::Completed);

        let roadmap = Reconciler::new(store.clone()).load("u1").await.unwrap();
        assert!(roadmap.entries.iter().all(|e| !e.slot.is_placeholder()));
        assert_eq!(roadmap.today().day_number(), 2);
        assert_eq!(store.list_missions().await.unwrap().len(), 30);
    }

    #[tokio::test]
    async fn load_fails_when_ledger_is_unreadable() {
        let store = Arc::new(MemoryStore::new());
        store.fail_reads(true);
        assert!(Reconciler::new(store).load("u1").await.is_err());
    }

    async fn walk_day(store: &Arc<MemoryStore>, day: i32) {
        let mut session = MissionSession::open(store.clone(), "u1", MissionRef::Virtual(day))
            .await
            .unwrap();
        while let Some(step) = session.current_step() {
            session.complete_step(step).await.unwrap();
        }
    }

    #[tokio::test]
    async fn first_three_days_done_makes_day_four_today() {
        let store = Arc::new(MemoryStore::new());
        store.ensure_profile("u1", "u1@example.com", None).await.unwrap();
        let reconciler = Reconciler::new(store.clone());
        reconciler.load("u1").await.unwrap();

        for day in 1..=3 {
            walk_day(&store, day).await;
        }

        let roadmap = reconciler.load("u1").await.unwrap();
        assert_eq!(roadmap.target_day, 4);
        assert_eq!(roadmap.completed_count(), 3);
        assert_eq!(roadmap.today().day_number(), 4);
        let statuses = statuses(&roadmap);
        assert!(statuses[..3].iter().all(|s| *s == MissionStatus::Completed));
        assert_eq!(statuses[3], MissionStatus::Available);
        assert!(statuses[4..].iter().all(|s| *s == MissionStatus::Locked));
        assert_eq!(store.profile("u1").unwrap().total_xp, 300);
    }

    #[test]
    fn high_water_mark_never_decreases() {
        let missions = catalog(1..=30);
        let mut records = Vec::new();
        let mut previous = 0;
        for day in [3, 1, 7, 2, 10, 5, 4] {
            records.push(record(format!("day-{day}"), MissionStatus::Completed));
            let roadmap = reconcile(&missions, &records);
            assert!(roadmap.high_water_mark >= previous);
            assert_eq!(roadmap.high_water_mark, previous.max(day));
            previous = roadmap.high_water_mark;
        }
        assert_eq!(previous, 10);
    }

    #[test]
    fn duplicate_completions_leave_next_day_available() {
        let missions = catalog(1..=30);
        let records = vec![
            record(missions[0].id, MissionStatus::Completed),
            record("day-1", MissionStatus::Completed),
            record(missions[1].id, MissionStatus::Available),
        ];
        let roadmap = reconcile(&missions, &records);
        assert_eq!(roadmap.high_water_mark, 1);
        assert_eq!(roadmap.completed_count(), 1);
        assert_eq!(roadmap.entries[1].status, MissionStatus::Available);
        assert_eq!(roadmap.entries[2].status, MissionStatus::Locked);
    }

    #[tokio::test]
    async fn completing_a_day_twice_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        store.ensure_profile("u1", "u1@example.com", None).await.unwrap();
        let reconciler = Reconciler::new(store.clone());
        reconciler.load("u1").await.unwrap();

        let mut tab_a = MissionSession::open(store.clone(), "u1", MissionRef::Virtual(1)).await.unwrap();
        let mut tab_b = MissionSession::open(store.clone(), "u1", MissionRef::Virtual(1)).await.unwrap();
        for session in [&mut tab_a, &mut tab_b] {
            while let Some(step) = session.current_step() {
                session.complete_step(step).await.unwrap();
            }
        }

        let roadmap = reconciler.load("u1").await.unwrap();
        assert_eq!(roadmap.high_water_mark, 1);
        assert_eq!(roadmap.entries[1].status, MissionStatus::Available);
        assert_eq!(roadmap.entries[2].status, MissionStatus::Locked);
        assert_eq!(store.profile("u1").unwrap().total_xp, 100);
    }
}
