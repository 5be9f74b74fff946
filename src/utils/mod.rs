pub mod parallel;
pub mod progress;
pub mod temp_workspace;
