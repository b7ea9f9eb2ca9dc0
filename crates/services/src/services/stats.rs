//! Dashboard and progress-page figures derived from a reconciled roadmap.

use db::models::{
    mission::CURRICULUM_DAYS,
    mission_progress::MissionStatus,
    user_profile::{SkillLevel, UserProfile},
};
use serde::Serialize;
use ts_rs::TS;

use super::reconciler::{Roadmap, RoadmapEntry};

const DAYS_PER_WEEK: i32 = 7;

#[derive(Debug, Clone, Serialize, TS)]
pub struct DashboardStats {
    pub current_streak: i32,
    pub longest_streak: i32,
    #[ts(type = "number")]
    pub total_xp: i64,
    pub skill_level: SkillLevel,
    pub daily_mode: i32,
    /// Share of the current seven-day block already completed, 0..=100
    pub weekly_progress: f64,
    pub completed_missions: i32,
    pub total_missions: i32,
    pub today: RoadmapEntry,
}

/// Completed days inside the seven-day block that holds the target day
pub fn weekly_progress(roadmap: &Roadmap) -> f64 {
    let block_start = ((roadmap.target_day - 1) / DAYS_PER_WEEK) * DAYS_PER_WEEK;
    let done = roadmap
        .completed_days
        .iter()
        .filter(|day| **day > block_start)
        .count();
    (done as f64 / f64::from(DAYS_PER_WEEK) * 100.0).min(100.0)
}

pub fn dashboard(profile: &UserProfile, roadmap: &Roadmap) -> DashboardStats {
    DashboardStats {
        current_streak: profile.current_streak,
        longest_streak: profile.longest_streak,
        total_xp: profile.total_xp,
        skill_level: profile.skill_level,
        daily_mode: profile.mode().minutes(),
        weekly_progress: weekly_progress(roadmap),
        completed_missions: roadmap.completed_count() as i32,
        total_missions: CURRICULUM_DAYS,
        today: roadmap.today().clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
pub struct WeekBreakdown {
    pub week: i32,
    pub label: String,
    pub completed: i32,
    pub total: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct ProgressStats {
    pub completed: i32,
    pub in_progress: i32,
    pub available: i32,
    pub locked: i32,
    pub completion_rate: i32,
    pub weeks: Vec<WeekBreakdown>,
    #[ts(type = "number")]
    pub total_xp: i64,
    pub current_streak: i32,
}

fn count(entries: &[RoadmapEntry], status: MissionStatus) -> i32 {
    entries.iter().filter(|e| e.status == status).count() as i32
}

pub fn progress(profile: &UserProfile, roadmap: &Roadmap) -> ProgressStats {
    let completed = count(&roadmap.entries, MissionStatus::Completed);
    let weeks_in_curriculum = (CURRICULUM_DAYS + DAYS_PER_WEEK - 1) / DAYS_PER_WEEK;

    let weeks = (1..=weeks_in_curriculum)
        .map(|week| {
            let in_week: Vec<&RoadmapEntry> = roadmap
                .entries
                .iter()
                .filter(|e| e.slot.week_number == week)
                .collect();
            WeekBreakdown {
                week,
                label: format!("Week {week}"),
                completed: in_week
                    .iter()
                    .filter(|e| e.status == MissionStatus::Completed)
                    .count() as i32,
                total: in_week.len() as i32,
            }
        })
        .collect();

    ProgressStats {
        completed,
        in_progress: count(&roadmap.entries, MissionStatus::InProgress),
        available: count(&roadmap.entries, MissionStatus::Available),
        locked: count(&roadmap.entries, MissionStatus::Locked),
        completion_rate: (f64::from(completed) / f64::from(CURRICULUM_DAYS) * 100.0).round() as i32,
        weeks,
        total_xp: profile.total_xp,
        current_streak: profile.current_streak,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::models::mission_progress::MissionProgress;
    use uuid::Uuid;

    use super::*;
    use crate::services::reconciler::reconcile;

    fn profile() -> UserProfile {
        let now = Utc::now();
        UserProfile {
            id: "u1".to_string(),
            email: String::new(),
            full_name: None,
            daily_mode: 10,
            current_streak: 4,
            longest_streak: 6,
            total_xp: 1200,
            last_mission_date: None,
            skill_level: SkillLevel::Strong,
            created_at: now,
            updated_at: now,
        }
    }

    fn completed(days: impl IntoIterator<Item = i32>) -> Vec<MissionProgress> {
        let now = Utc::now();
        days.into_iter()
            .map(|day| MissionProgress {
                id: Uuid::new_v4(),
                user_id: "u1".to_string(),
                mission_id: format!("day-{day}"),
                status: MissionStatus::Completed,
                lesson_completed: true,
                vocab_completed: true,
                coding_task_completed: true,
                quiz_completed: true,
                writing_task_completed: true,
                quiz_score: 0,
                xp_earned: 100,
                completed_at: Some(now),
                created_at: now,
                updated_at: now,
            })
            .collect()
    }

    #[test]
    fn weekly_progress_counts_current_block() {
        // Days 1..=9 done: target day 10 sits in the second block (8..=14).
        let roadmap = reconcile(&[], &completed(1..=9));
        assert!((weekly_progress(&roadmap) - 2.0 / 7.0 * 100.0).abs() < 1e-9);

        // Finishing a block moves the target into the next, empty one.
        let roadmap = reconcile(&[], &completed(1..=7));
        assert_eq!(weekly_progress(&roadmap), 0.0);

        assert_eq!(weekly_progress(&reconcile(&[], &[])), 0.0);
    }

    #[test]
    fn dashboard_reports_profile_and_today() {
        let roadmap = reconcile(&[], &completed([1, 2]));
        let stats = dashboard(&profile(), &roadmap);
        assert_eq!(stats.today.day_number(), 3);
        assert_eq!(stats.completed_missions, 2);
        assert_eq!(stats.total_missions, 30);
        assert_eq!(stats.daily_mode, 10);
        assert_eq!(stats.skill_level, SkillLevel::Strong);
    }

    #[test]
    fn progress_breaks_down_by_week() {
        let roadmap = reconcile(&[], &completed(1..=8));
        let stats = progress(&profile(), &roadmap);
        assert_eq!(stats.completed, 8);
        assert_eq!(stats.available, 1);
        assert_eq!(stats.locked, 21);
        assert_eq!(stats.completion_rate, 27);
        assert_eq!(stats.weeks.len(), 5);
        assert_eq!(stats.weeks[0].completed, 7);
        assert_eq!(stats.weeks[0].total, 7);
        assert_eq!(stats.weeks[1].completed, 1);
        assert_eq!(stats.weeks[4].total, 2);
        assert_eq!(stats.weeks[4].label, "Week 5");
    }
}
