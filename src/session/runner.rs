//! 考站计时状态机
//!
//! 状态只有两种：在第 i 站作答，或已结束。只能前进，不能回退。
//! 时钟由外部驱动：每秒调用一次 [`StationRunner::tick`]。

use std::collections::HashMap;

use crate::models::StationItem;

pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.5;

/// 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// 正在第 i 站（从 0 开始）
    AwaitingStation(usize),
    Finished,
}

/// 考完交给结果汇总的数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamRecord {
    pub stations: Vec<StationItem>,
    /// 站点 ID → 学员答案
    pub answers: HashMap<String, String>,
}

/// 考站计时器
#[derive(Debug, Clone)]
pub struct StationRunner {
    stations: Vec<StationItem>,
    seconds_per_station: u32,
    state: RunnerState,
    remaining: u32,
    paused: bool,
    zoom: f32,
    answers: HashMap<String, String>,
}

impl StationRunner {
    /// 空站点列表直接进入 `Finished`
    pub fn new(stations: Vec<StationItem>, seconds_per_station: u32) -> Self {
        let state = if stations.is_empty() {
            RunnerState::Finished
        } else {
            RunnerState::AwaitingStation(0)
        };

        Self {
            stations,
            seconds_per_station,
            state,
            remaining: seconds_per_station,
            paused: false,
            zoom: MIN_ZOOM,
            answers: HashMap::new(),
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == RunnerState::Finished
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// 当前站下标
    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            RunnerState::AwaitingStation(i) => Some(i),
            RunnerState::Finished => None,
        }
    }

    pub fn current_station(&self) -> Option<&StationItem> {
        self.current_index().and_then(|i| self.stations.get(i))
    }

    /// 当前站已填的答案
    pub fn current_answer(&self) -> Option<&str> {
        let station = self.current_station()?;
        self.answers.get(&station.id).map(String::as_str)
    }

    pub fn answers(&self) -> &HashMap<String, String> {
        &self.answers
    }

    /// 已用时间占比，用于进度条
    pub fn timer_progress(&self) -> f32 {
        if self.is_finished() || self.seconds_per_station == 0 {
            return 1.0;
        }
        1.0 - self.remaining as f32 / self.seconds_per_station as f32
    }

    /// 过去一秒；倒计时归零时自动进入下一站
    pub fn tick(&mut self) {
        if self.is_finished() || self.paused {
            return;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.next();
        }
    }

    /// 进入下一站，最后一站之后结束
    pub fn next(&mut self) {
        let RunnerState::AwaitingStation(i) = self.state else {
            return;
        };

        if i + 1 < self.stations.len() {
            self.state = RunnerState::AwaitingStation(i + 1);
            self.remaining = self.seconds_per_station;
            self.zoom = MIN_ZOOM;
        } else {
            self.state = RunnerState::Finished;
        }
    }

    /// 暂停只影响计时，不影响作答
    pub fn toggle_pause(&mut self) {
        if !self.is_finished() {
            self.paused = !self.paused;
        }
    }

    /// 修改当前站的答案
    pub fn set_answer(&mut self, text: impl Into<String>) {
        if let Some(id) = self.current_station().map(|s| s.id.clone()) {
            self.answers.insert(id, text.into());
        }
    }

    pub fn zoom_in(&mut self) {
        if !self.is_finished() {
            self.zoom = (self.zoom + ZOOM_STEP).min(MAX_ZOOM);
        }
    }

    pub fn zoom_out(&mut self) {
        if !self.is_finished() {
            self.zoom = (self.zoom - ZOOM_STEP).max(MIN_ZOOM);
        }
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = MIN_ZOOM;
    }

    /// 结束考试，交出站点和答案
    pub fn finish(self) -> ExamRecord {
        ExamRecord {
            stations: self.stations,
            answers: self.answers,
        }
    }
}
