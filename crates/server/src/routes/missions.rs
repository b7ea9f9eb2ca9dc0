//! Mission player: open a day, walk its five steps, check answers.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{mission_progress::MissionStep, mission_ref::MissionRef};
use serde::{Deserialize, Serialize};
use services::services::{
    catalog::DaySlot,
    mission_content::{self, CodingAnswer, CodingCheck, MissionContent},
    mission_session::{QuizOutcome, SessionView, StepOutcome, WritingOutcome},
    session_registry::SharedSession,
};
use tracing::info;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, identity::CurrentUser};

#[derive(Debug, Serialize, TS)]
pub struct MissionDetail {
    pub session: SessionView,
    pub content: MissionContent,
}

#[derive(Debug, Serialize, TS)]
pub struct StepResponse {
    pub outcome: StepOutcome,
    pub session: SessionView,
}

#[derive(Debug, Deserialize, TS)]
pub struct QuizAnswers {
    pub answers: Vec<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct WritingDraft {
    pub text: String,
}

fn parse_mission_ref(raw: &str) -> Result<MissionRef, ApiError> {
    MissionRef::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("invalid mission ref '{raw}'")))
}

fn parse_step(raw: &str) -> Result<MissionStep, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid step '{raw}'")))
}

/// The learner's session for `mission`, opening one if none is live.
async fn session_for(
    state: &AppState,
    user: &CurrentUser,
    mission: MissionRef,
) -> Result<SharedSession, ApiError> {
    // Awards need a profile row to land on.
    state
        .store
        .ensure_profile(&user.id, &user.email, user.full_name.as_deref())
        .await?;
    Ok(state
        .sessions
        .get_or_open(state.store.clone(), &user.id, mission)
        .await?)
}

async fn content_for(state: &AppState, user: &CurrentUser, slot: &DaySlot) -> Result<MissionContent, ApiError> {
    let mode = state
        .store
        .find_profile(&user.id)
        .await?
        .map(|profile| profile.mode())
        .unwrap_or_default();
    Ok(mission_content::load(state.store.as_ref(), slot, mode).await)
}

/// Open a mission afresh: resumes from the stored record and returns the
/// content sized for the learner's daily mode.
pub async fn open_mission(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(mission_ref): Path<String>,
) -> Result<ResponseJson<ApiResponse<MissionDetail>>, ApiError> {
    let mission = parse_mission_ref(&mission_ref)?;
    let profile = state
        .store
        .ensure_profile(&user.id, &user.email, user.full_name.as_deref())
        .await?;
    let session = state
        .sessions
        .open(state.store.clone(), &user.id, mission)
        .await?;
    let view = session.lock().await.view();
    let content = mission_content::load(state.store.as_ref(), &view.slot, profile.mode()).await;

    Ok(ResponseJson(ApiResponse::success(MissionDetail {
        session: view,
        content,
    })))
}

pub async fn complete_step(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((mission_ref, step)): Path<(String, String)>,
) -> Result<ResponseJson<ApiResponse<StepResponse>>, ApiError> {
    let mission = parse_mission_ref(&mission_ref)?;
    let step = parse_step(&step)?;
    let session = session_for(&state, &user, mission).await?;

    let mut session = session.lock().await;
    let outcome = session.complete_step(step).await?;
    if let StepOutcome::Completed(summary) = &outcome {
        info!(
            user_id = %user.id,
            day = summary.day_number,
            xp = summary.xp_earned,
            rewarded = summary.rewarded,
            "Mission completed"
        );
    }

    Ok(ResponseJson(ApiResponse::success(StepResponse {
        outcome,
        session: session.view(),
    })))
}

pub async fn review_step(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((mission_ref, step)): Path<(String, String)>,
) -> Result<ResponseJson<ApiResponse<SessionView>>, ApiError> {
    let mission = parse_mission_ref(&mission_ref)?;
    let step = parse_step(&step)?;
    let session = session_for(&state, &user, mission).await?;

    let mut session = session.lock().await;
    session.review(step)?;
    Ok(ResponseJson(ApiResponse::success(session.view())))
}

pub async fn check_coding(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((mission_ref, index)): Path<(String, String)>,
    Json(answer): Json<CodingAnswer>,
) -> Result<ResponseJson<ApiResponse<CodingCheck>>, ApiError> {
    let mission = parse_mission_ref(&mission_ref)?;
    let index: usize = index
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid coding task index '{index}'")))?;
    let session = session_for(&state, &user, mission).await?;
    let slot = session.lock().await.slot().clone();

    let content = content_for(&state, &user, &slot).await?;
    Ok(ResponseJson(ApiResponse::success(content.check_coding(index, &answer)?)))
}

pub async fn submit_quiz(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(mission_ref): Path<String>,
    Json(submission): Json<QuizAnswers>,
) -> Result<ResponseJson<ApiResponse<QuizOutcome>>, ApiError> {
    let mission = parse_mission_ref(&mission_ref)?;
    let session = session_for(&state, &user, mission).await?;

    let mut session = session.lock().await;
    let content = content_for(&state, &user, session.slot()).await?;
    let outcome = session.submit_quiz(&content, &submission.answers).await?;
    Ok(ResponseJson(ApiResponse::success(outcome)))
}

pub async fn submit_writing(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(mission_ref): Path<String>,
    Json(submission): Json<WritingDraft>,
) -> Result<ResponseJson<ApiResponse<WritingOutcome>>, ApiError> {
    let mission = parse_mission_ref(&mission_ref)?;
    let session = session_for(&state, &user, mission).await?;

    let mut session = session.lock().await;
    let content = content_for(&state, &user, session.slot()).await?;
    let outcome = session.submit_writing(&content, &submission.text).await?;
    Ok(ResponseJson(ApiResponse::success(outcome)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/missions/{mission_ref}",
        Router::new()
            .route("/", get(open_mission))
            .route("/steps/{step}/complete", post(complete_step))
            .route("/review/{step}", post(review_step))
            .route("/coding/{index}/check", post(check_coding))
            .route("/quiz", post(submit_quiz))
            .route("/writing", post(submit_writing)),
    )
}
