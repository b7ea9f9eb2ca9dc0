pub mod mission;
pub mod mission_content;
pub mod mission_progress;
pub mod mission_ref;
pub mod user_profile;
