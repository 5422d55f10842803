//! 候选页处理流程 - 流程层
//!
//! 核心职责：定义"一页候选"的完整处理流程
//!
//! 流程顺序：
//! 1. 渲染页面 → data URI
//! 2. 识图模型判定 + 出题
//! 3. 组装考站，或丢弃

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::StationItem;
use crate::services::{PageRenderer, StationClassifier};
use crate::utils::logging::truncate_text;
use crate::workflow::station_ctx::CandidateCtx;

/// 候选页处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    /// 生成了一个考站
    Station(StationItem),
    /// 页面不合格、渲染失败或普通调用失败
    Discarded,
    /// 遇到配额 / 限流信号
    QuotaHit,
}

/// 候选页处理流程
///
/// - 编排 渲染 → 识图 → 组装
/// - 单页失败只影响这一页，不向上传播
/// - 不持有文档，由调用方按批次传入
pub struct StationFlow {
    classifier: Arc<dyn StationClassifier>,
    render_scale: f32,
}

impl StationFlow {
    /// 创建新的候选页处理流程
    pub fn new(classifier: Arc<dyn StationClassifier>, render_scale: f32) -> Self {
        Self {
            classifier,
            render_scale,
        }
    }

    pub async fn run(&self, document: &dyn PageRenderer, ctx: &CandidateCtx) -> CandidateOutcome {
        debug!("{} 🖼️ 渲染页面 (缩放 {})", ctx, self.render_scale);

        let page = match document.render_page(ctx.page_number, self.render_scale).await {
            Ok(page) => page,
            Err(e) => {
                warn!("{} ⚠️ 渲染失败，跳过: {}", ctx, e);
                return CandidateOutcome::Discarded;
            }
        };

        let classification = match self
            .classifier
            .classify_page(&page.data_uri, &ctx.topic)
            .await
        {
            Ok(classification) => classification,
            Err(e) if e.is_quota_signal() => {
                warn!("{} ⚠️ 触发配额限制: {}", ctx, e);
                return CandidateOutcome::QuotaHit;
            }
            Err(e) => {
                warn!("{} ⚠️ 识图失败，跳过: {}", ctx, e);
                return CandidateOutcome::Discarded;
            }
        };

        let Some(questions) = classification.into_usable_questions() else {
            debug!("{} 不是符合主题的解剖图", ctx);
            return CandidateOutcome::Discarded;
        };

        let timestamp = chrono::Utc::now().timestamp_millis();
        match StationItem::from_generated(timestamp, ctx.page_number, page.data_uri, questions) {
            Some(station) => {
                if let Some(question) = station.primary_question() {
                    info!(
                        "{} ✓ 出题: {}",
                        ctx,
                        truncate_text(&question.question_text, 40)
                    );
                }
                CandidateOutcome::Station(station)
            }
            None => CandidateOutcome::Discarded,
        }
    }
}
