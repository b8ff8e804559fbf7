pub mod context;
pub mod cutscene;
pub mod judgment;
pub mod level;
pub mod mix;
pub mod parsing;
pub mod profile;
pub mod run;
pub mod scores;
pub mod stage_stats;
