use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 学习分析结果
///
/// 缺失的数组按空处理，界面上显示为"没有发现"。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MentorResponse {
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub roadmap: Vec<RoadmapStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapStep {
    pub step: String,
    #[serde(default)]
    pub details: String,
}

/// 分析服务不可用时的固定提示
pub const MENTOR_FALLBACK_MESSAGE: &str =
    "Úi cha! Rái cá đang bận bắt cá nên không phân tích được rồi. Thử lại sau nhé! 🦦";

/// 未配置 API Key 时的提示
pub const MENTOR_MISSING_KEY_MESSAGE: &str = "Chưa có API Key";

impl MentorResponse {
    /// 只有一段说明、其余为空的报告
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            analysis: message.into(),
            ..Default::default()
        }
    }

    pub fn fallback() -> Self {
        Self::message_only(MENTOR_FALLBACK_MESSAGE)
    }
}

/// 单个能力分类的对错统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SkillBucket {
    pub correct: usize,
    pub total: usize,
}

impl SkillBucket {
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            (100.0 * self.correct as f64 / self.total as f64).round() as u32
        }
    }
}

/// 分类 → 统计（按名称排序，保证提示词稳定）
pub type SkillStats = BTreeMap<String, SkillBucket>;
