//! State module for tracking run progress
//!
//! # Components
//!
//! - `RunStage`: the coordinator's stage machine (discovering, classifying,
//!   processing, summarizing, reporting, done/failed)

mod run_stage;

pub use run_stage::RunStage;
