pub mod chart;
pub mod cutscene;
