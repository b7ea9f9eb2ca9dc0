//! Keeps the 30-day curriculum catalog complete.

use std::{collections::BTreeSet, sync::Arc};

use db::models::{
    mission::{CURRICULUM_DAYS, CreateMission, Mission, is_project_day, week_of},
    mission_ref::MissionRef,
};
use serde::Serialize;
use tracing::{debug, info, warn};
use ts_rs::TS;

use super::progress_store::{ProgressStore, StoreError};

pub const DEFAULT_XP_REWARD: i32 = 100;
pub const DEFAULT_DESCRIPTION: &str = "Mastering Python through professional communication.";

/// A curriculum day as the rest of the system sees it: a persisted catalog
/// row, or a placeholder addressed by its day number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
pub struct DaySlot {
    #[ts(type = "string")]
    pub mission_ref: MissionRef,
    pub day_number: i32,
    pub title: String,
    pub description: Option<String>,
    pub week_number: i32,
    pub is_project: bool,
    pub xp_reward: i32,
}

impl DaySlot {
    pub fn from_mission(mission: &Mission) -> Self {
        Self {
            mission_ref: MissionRef::Persisted(mission.id),
            day_number: mission.day_number,
            title: mission.title.clone(),
            description: mission.description.clone(),
            week_number: mission.week_number,
            is_project: mission.is_project,
            xp_reward: mission.xp_reward,
        }
    }

    /// Stand-in for a day with no catalog row
    pub fn placeholder(day_number: i32) -> Self {
        let mission = default_mission(day_number);
        Self {
            mission_ref: MissionRef::Virtual(day_number),
            day_number,
            title: mission.title,
            description: mission.description,
            week_number: mission.week_number,
            is_project: mission.is_project,
            xp_reward: mission.xp_reward,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.mission_ref.is_virtual()
    }
}

/// Synthesized catalog row for `day_number`
pub fn default_mission(day_number: i32) -> CreateMission {
    let title = if is_project_day(day_number) {
        format!("Week {} Review", week_of(day_number))
    } else {
        format!("Mission {}: Python Pro", day_number)
    };

    CreateMission {
        day_number,
        title,
        description: Some(DEFAULT_DESCRIPTION.to_string()),
        week_number: week_of(day_number),
        is_project: is_project_day(day_number),
        xp_reward: DEFAULT_XP_REWARD,
        is_published: true,
    }
}

/// Curriculum days with no row in `missions`
pub fn missing_days(missions: &[Mission]) -> Vec<i32> {
    let present: BTreeSet<i32> = missions.iter().map(|m| m.day_number).collect();
    (1..=CURRICULUM_DAYS)
        .filter(|day| !present.contains(day))
        .collect()
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct ProvisionReport {
    #[ts(type = "number")]
    pub inserted: u64,
    pub missing_before: Vec<i32>,
    pub missing_after: Vec<i32>,
}

/// Result of a provisioning pass: the catalog as it now stands
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub missions: Vec<Mission>,
    pub report: ProvisionReport,
}

#[derive(Clone)]
pub struct CatalogProvisioner {
    store: Arc<dyn ProgressStore>,
}

impl CatalogProvisioner {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    /// Load the catalog and back-fill any missing days. Only the initial
    /// read can fail; insert errors are logged and the existing rows returned.
    pub async fn ensure(&self) -> Result<Provisioned, StoreError> {
        let missions = self.store.list_missions().await?;
        let missing_before = missing_days(&missions);

        if missing_before.is_empty() {
            debug!("Catalog complete, nothing to provision");
            return Ok(Provisioned {
                missions,
                report: ProvisionReport {
                    inserted: 0,
                    missing_before,
                    missing_after: Vec::new(),
                },
            });
        }

        let slots: Vec<CreateMission> = missing_before.iter().copied().map(default_mission).collect();
        let inserted = match self.store.insert_missing_missions(&slots).await {
            Ok(inserted) => inserted,
            Err(e) => {
                warn!(missing = missing_before.len(), "Failed to provision catalog: {}", e);
                let missing_after = missing_before.clone();
                return Ok(Provisioned {
                    missions,
                    report: ProvisionReport {
                        inserted: 0,
                        missing_before,
                        missing_after,
                    },
                });
            }
        };

        let missions = match self.store.list_missions().await {
            Ok(reloaded) => reloaded,
            Err(e) => {
                warn!("Failed to reload catalog after provisioning: {}", e);
                missions
            }
        };
        let missing_after = missing_days(&missions);
        info!(
            inserted,
            still_missing = missing_after.len(),
            "Provisioned curriculum catalog"
        );

        Ok(Provisioned {
            missions,
            report: ProvisionReport {
                inserted,
                missing_before,
                missing_after,
            },
        })
    }
}
