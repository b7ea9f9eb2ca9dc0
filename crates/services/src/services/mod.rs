pub mod catalog;
pub mod mission_content;
pub mod mission_session;
pub mod progress_store;
pub mod reconciler;
pub mod sandbox;
pub mod session_registry;
pub mod stats;

#[cfg(test)]
pub(crate) mod memory_store;
