//! CLI subcommand implementations for the reel-harvest binary.

pub mod creators_cmd;
pub mod doctor;
pub mod output;
pub mod progress_ui;
pub mod random_cmd;
pub mod run_cmd;
pub mod setup;
pub mod works_cmd;
