//! 考试会话：计时作答 → 判分汇总

pub mod runner;
pub mod summary;

pub use runner::{ExamRecord, RunnerState, StationRunner};
pub use summary::{ResultSummarizer, StationGrade, STATION_SKILL_CATEGORY};
