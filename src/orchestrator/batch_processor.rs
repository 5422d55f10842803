//! 批量出站处理器 - 编排层
//!
//! ## 职责
//!
//! 从一个章节里挑出 N 个考站：洗牌候选页，分批并发渲染 + 识图，
//! 凑够数量、候选用完或遇到配额信号时停止。
//!
//! ## 核心功能
//!
//! 1. **参数检查**：文档、章节、目标站数
//! 2. **候选生成**：闪卡编号洗牌 → 页码 → 按文档页数过滤
//! 3. **分批并发**：每批 `batch_size` 页用 `join_all` 同时处理，批与批严格串行
//! 4. **配额熔断**：只在批次边界检查配额标记，进行中的批次总会跑完
//! 5. **进度上报**：每批结束后发一条进度事件（可选）
//!
//! ## 设计特点
//!
//! - **不持有文档**：文档由调用方打开，按引用传入
//! - **向下委托**：单页的处理交给 `workflow::StationFlow`

use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::GenerationError;
use crate::models::{SectionMap, StationItem};
use crate::services::page_mapper::{candidate_pages, filter_in_bounds};
use crate::services::{PageRenderer, StationClassifier};
use crate::utils::logging::{log_batch_complete, log_batch_start, log_startup, print_final_stats};
use crate::workflow::{CandidateCtx, CandidateOutcome, StationFlow};

/// 生成成功前进度最多显示到 95%
const MAX_IN_PROGRESS_PERCENT: u8 = 95;

/// 一次生成请求
///
/// 文档和章节用 `Option` 表示"用户可能还没选"，缺失时返回对应的错误。
#[derive(Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub document: Option<&'a dyn PageRenderer>,
    pub section: Option<&'a SectionMap>,
    /// 具体主题，为空时使用章节名
    pub topic: &'a str,
    pub target_count: usize,
}

/// 进度事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationProgress {
    pub percent: u8,
    pub message: String,
}

/// 生成结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// 最多 N 个考站
    pub stations: Vec<StationItem>,
    /// 过程中是否遇到配额 / 限流信号
    pub quota_hit: bool,
    /// 实际处理过的候选页数
    pub candidates_tried: usize,
    /// 配额导致数量不足时的提示
    pub warning: Option<String>,
}

/// 批量出站处理器
pub struct StationBatchGenerator {
    flow: StationFlow,
    batch_size: usize,
    seed: Option<u64>,
    progress: Option<UnboundedSender<GenerationProgress>>,
}

impl StationBatchGenerator {
    pub fn new(classifier: Arc<dyn StationClassifier>, config: &Config) -> Self {
        Self {
            flow: StationFlow::new(classifier, config.render_scale),
            batch_size: config.batch_size.max(1),
            seed: None,
            progress: None,
        }
    }

    /// 固定洗牌种子，候选顺序可复现
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// 订阅进度事件
    pub fn with_progress(mut self, sender: UnboundedSender<GenerationProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// 生成考站
    pub async fn generate(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<GenerationOutcome, GenerationError> {
        let document = request.document.ok_or(GenerationError::MissingDocument)?;
        let section = request.section.ok_or(GenerationError::MissingSection)?;
        let target = request.target_count;
        if target == 0 {
            return Err(GenerationError::InvalidTargetCount);
        }

        let topic = if request.topic.trim().is_empty() {
            section.name.clone()
        } else {
            request.topic.trim().to_string()
        };

        self.report(0, "Đang chuẩn bị danh sách trang...");

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let total_pages = document.total_pages();
        let candidates = filter_in_bounds(&candidate_pages(section, &mut rng), total_pages);

        if candidates.is_empty() {
            return Err(GenerationError::PageComputation {
                section_id: section.id.clone(),
                total_pages,
            });
        }

        log_startup(&section.name, target, self.batch_size);
        debug!(
            "章节 {} 共 {} 个候选页 (文档 {} 页)",
            section.id,
            candidates.len(),
            total_pages
        );

        let total_batches = candidates.len().div_ceil(self.batch_size);
        let mut stations: Vec<StationItem> = Vec::with_capacity(target);
        let mut quota_hit = false;
        let mut candidates_tried = 0;

        for (idx, batch) in candidates.chunks(self.batch_size).enumerate() {
            if stations.len() >= target || quota_hit {
                break;
            }

            let batch_num = idx + 1;
            log_batch_start(batch_num, total_batches, batch, stations.len(), target);

            let contexts: Vec<CandidateCtx> = batch
                .iter()
                .map(|&page| CandidateCtx::new(page, batch_num, topic.as_str()))
                .collect();

            let outcomes = join_all(contexts.iter().map(|ctx| self.flow.run(document, ctx))).await;
            candidates_tried += batch.len();

            let mut valid_in_batch = 0;
            for outcome in outcomes {
                match outcome {
                    CandidateOutcome::Station(station) => {
                        valid_in_batch += 1;
                        stations.push(station);
                    }
                    CandidateOutcome::QuotaHit => quota_hit = true,
                    CandidateOutcome::Discarded => {}
                }
            }

            log_batch_complete(batch_num, valid_in_batch, batch.len());

            let collected = stations.len().min(target);
            self.report(
                in_progress_percent(collected, target),
                &format!("Đã tìm thấy {}/{} trạm...", collected, target),
            );
        }

        stations.truncate(target);
        print_final_stats(stations.len(), target, candidates_tried, quota_hit);

        if stations.is_empty() {
            return Err(if quota_hit {
                GenerationError::QuotaExhausted
            } else {
                GenerationError::NoMatchingContent { topic }
            });
        }

        let warning = (quota_hit && stations.len() < target).then(|| {
            format!(
                "Đã hết hạn mức AI, chỉ tạo được {}/{} trạm.",
                stations.len(),
                target
            )
        });

        info!("✓ 生成完成: {} 站", stations.len());
        self.report(100, "Hoàn tất!");

        Ok(GenerationOutcome {
            stations,
            quota_hit,
            candidates_tried,
            warning,
        })
    }

    fn report(&self, percent: u8, message: &str) {
        if let Some(sender) = &self.progress {
            // 没有人订阅时直接忽略
            let _ = sender.send(GenerationProgress {
                percent,
                message: message.to_string(),
            });
        }
    }
}

/// `min(round(100 * collected / target), 95)`
pub fn in_progress_percent(collected: usize, target: usize) -> u8 {
    if target == 0 {
        return 0;
    }
    let percent = (100.0 * collected as f64 / target as f64).round() as u64;
    percent.min(u64::from(MAX_IN_PROGRESS_PERCENT)) as u8
}
