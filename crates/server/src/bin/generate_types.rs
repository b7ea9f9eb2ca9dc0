//! Writes the TypeScript declarations for every API type to `shared/types.ts`.
//! Pass `--check` to fail when the checked-in file is out of date.

use std::{env, fs, path::PathBuf, process::ExitCode};

use anyhow::Context;
use ts_rs::TS;

const HEADER: &str = "// This file is generated by `cargo run --bin generate_types`. Do not edit.\n";

fn declarations() -> Vec<String> {
    vec![
        utils::response::ApiResponse::<(), ()>::decl(),
        db::models::mission::Mission::decl(),
        db::models::mission::CreateMission::decl(),
        db::models::mission_progress::MissionStatus::decl(),
        db::models::mission_progress::MissionStep::decl(),
        db::models::mission_progress::ProgressFlags::decl(),
        db::models::mission_progress::MissionProgress::decl(),
        db::models::user_profile::SkillLevel::decl(),
        db::models::user_profile::UserProfile::decl(),
        db::models::mission_content::CodingTaskType::decl(),
        db::models::mission_content::Difficulty::decl(),
        db::models::mission_content::QuestionType::decl(),
        db::models::mission_content::WritingTaskType::decl(),
        db::models::mission_content::Lesson::decl(),
        db::models::mission_content::VocabWord::decl(),
        db::models::mission_content::CodingTask::decl(),
        db::models::mission_content::QuizQuestion::decl(),
        db::models::mission_content::WritingTask::decl(),
        db::models::mission_content::WritingSubmission::decl(),
        db::models::mission_content::CreateWritingSubmission::decl(),
        services::services::catalog::DaySlot::decl(),
        services::services::catalog::ProvisionReport::decl(),
        services::services::reconciler::RoadmapEntry::decl(),
        services::services::mission_content::StepEstimates::decl(),
        services::services::mission_content::LessonView::decl(),
        services::services::mission_content::VocabView::decl(),
        services::services::mission_content::CodingTaskView::decl(),
        services::services::mission_content::QuizQuestionView::decl(),
        services::services::mission_content::WritingTaskView::decl(),
        services::services::mission_content::ContentSources::decl(),
        services::services::mission_content::MissionContent::decl(),
        services::services::mission_content::CodingAnswer::decl(),
        services::services::mission_content::CodingCheck::decl(),
        services::services::mission_content::QuizAnswerResult::decl(),
        services::services::mission_content::QuizResult::decl(),
        services::services::mission_content::WritingCheck::decl(),
        services::services::mission_session::SessionPhase::decl(),
        services::services::mission_session::CompletionSummary::decl(),
        services::services::mission_session::StepOutcome::decl(),
        services::services::mission_session::SessionView::decl(),
        services::services::mission_session::QuizOutcome::decl(),
        services::services::mission_session::WritingOutcome::decl(),
        services::services::sandbox::RunRequest::decl(),
        services::services::sandbox::RunOutput::decl(),
        services::services::stats::DashboardStats::decl(),
        services::services::stats::WeekBreakdown::decl(),
        services::services::stats::ProgressStats::decl(),
        pyfluent_server::routes::dashboard::DashboardResponse::decl(),
        pyfluent_server::routes::missions::MissionDetail::decl(),
        pyfluent_server::routes::missions::StepResponse::decl(),
        pyfluent_server::routes::missions::QuizAnswers::decl(),
        pyfluent_server::routes::missions::WritingDraft::decl(),
        pyfluent_server::routes::settings::SettingsView::decl(),
        pyfluent_server::routes::settings::UpdateSettings::decl(),
    ]
}

fn render() -> String {
    let body = declarations()
        .into_iter()
        .map(|decl| {
            let decl = decl.trim();
            if decl.starts_with("export ") {
                decl.to_string()
            } else {
                format!("export {decl}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{HEADER}\n{body}\n")
}

fn output_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../shared/types.ts")
}

fn main() -> anyhow::Result<ExitCode> {
    let check = env::args().any(|arg| arg == "--check");
    let path = output_path();
    let generated = render();

    if check {
        let current = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        if current == generated {
            println!("{} is up to date", path.display());
            return Ok(ExitCode::SUCCESS);
        }
        eprintln!("{} is stale; run `cargo run --bin generate_types`", path.display());
        return Ok(ExitCode::FAILURE);
    }

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    fs::write(&path, generated).with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(ExitCode::SUCCESS)
}
