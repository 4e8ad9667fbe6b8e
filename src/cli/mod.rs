pub mod analyze;
pub mod setup;
pub mod ui;
