//! 命令行应用
//!
//! 打开参考文档 → 出站 → 终端里计时作答 → 判分 → 学习建议

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppResult, GenerationError};
use crate::infrastructure::{decode_data_uri, open_document};
use crate::models::{load_catalog_or_builtin, MentorResponse, SectionCatalog, SectionMap, StationItem};
use crate::orchestrator::{GenerationProgress, GenerationRequest, StationBatchGenerator};
use crate::services::LlmService;
use crate::session::{ExamRecord, ResultSummarizer, StationRunner};

/// 应用主结构
pub struct App {
    config: Config,
    catalog: SectionCatalog,
    llm: Arc<LlmService>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let catalog = load_catalog_or_builtin(config.sections_file.as_deref()).await?;
        let llm = Arc::new(LlmService::new(&config));

        if config.llm_api_key.trim().is_empty() {
            warn!("⚠️ 未设置 LLM_API_KEY，识图出题将无法进行");
        }

        Ok(Self {
            config,
            catalog,
            llm,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let section = resolve_section(
            &self.catalog,
            self.config.section_id.as_deref(),
            &self.config.topic,
        )?;
        let topic = if self.config.topic.trim().is_empty() {
            section.map(|s| s.name.clone()).unwrap_or_default()
        } else {
            self.config.topic.trim().to_string()
        };

        let document = match &self.config.source_path {
            Some(path) => Some(
                open_document(path, self.config.jpeg_quality)
                    .await
                    .with_context(|| format!("无法打开参考文档: {}", path))?,
            ),
            None => None,
        };

        // 进度打印
        let (tx, mut rx) = mpsc::unbounded_channel::<GenerationProgress>();
        let printer = tokio::spawn(async move {
            while let Some(progress) = rx.recv().await {
                info!("⏳ [{:>3}%] {}", progress.percent, progress.message);
            }
        });

        let generator = StationBatchGenerator::new(self.llm.clone(), &self.config).with_progress(tx);
        let result = generator
            .generate(GenerationRequest {
                document: document.as_deref(),
                section,
                topic: &topic,
                target_count: self.config.station_count,
            })
            .await;
        drop(generator);
        let _ = printer.await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("❌ {}", e);
                if e == GenerationError::MissingSection {
                    self.print_catalog();
                }
                return Err(e.into());
            }
        };

        if let Some(warning) = &outcome.warning {
            warn!("⚠️ {}", warning);
        }

        let exported = match &self.config.export_dir {
            Some(dir) => export_station_images(Path::new(dir), &outcome.stations).await?,
            None => Vec::new(),
        };

        let record = self.run_exam(outcome.stations, &exported).await?;

        let summary = ResultSummarizer::new(record, topic, self.llm.clone());
        print_summary(&summary);
        print_mentor_report(summary.mentor_report().await);

        Ok(())
    }

    fn print_catalog(&self) {
        info!("可用章节 (通过 SECTION_ID 选择):");
        for section in self.catalog.iter() {
            info!(
                "  {:<10} {} (卡片 {}-{})",
                section.id,
                section.name,
                section.start_card(),
                section.end_card()
            );
        }
    }

    /// 终端考试
    ///
    /// 每秒一次 tick；输入一行文字即修改当前答案，空行进入下一站，
    /// `:p` 暂停/继续，`:+` / `:-` / `:0` 调整缩放。
    async fn run_exam(&self, stations: Vec<StationItem>, images: &[PathBuf]) -> Result<ExamRecord> {
        let mut runner = StationRunner::new(stations, self.config.seconds_per_station);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 第一次 tick 立即完成
        ticker.tick().await;

        let mut stdin_open = true;
        let mut shown = None;

        while !runner.is_finished() {
            if runner.current_index() != shown {
                shown = runner.current_index();
                print_station(&runner, images);
            }

            tokio::select! {
                _ = ticker.tick() => {
                    runner.tick();
                    let remaining = runner.remaining_seconds();
                    if !runner.is_paused() && remaining > 0 && remaining % 10 == 0 {
                        println!("⏱️  còn {} giây", remaining);
                    }
                }
                line = lines.next_line(), if stdin_open => {
                    match line.context("读取输入失败")? {
                        Some(line) => handle_input(&mut runner, line.trim()),
                        // 输入流关闭后只靠计时器推进
                        None => stdin_open = false,
                    }
                }
            }
        }

        println!("🏁 Hết giờ! Đang chấm điểm...");
        Ok(runner.finish())
    }
}

/// 章节只能通过 `SECTION_ID` 明确指定
///
/// 未指定时返回 `None`（生成时报 `MissingSection`），关键词匹配只作为提示打印。
fn resolve_section<'a>(
    catalog: &'a SectionCatalog,
    section_id: Option<&str>,
    topic: &str,
) -> AppResult<Option<&'a SectionMap>> {
    if let Some(id) = section_id {
        return Ok(Some(catalog.require(id)?));
    }

    if let Some(hint) = catalog.suggest(topic) {
        info!("💡 主题可能属于章节: {} (SECTION_ID={})", hint.name, hint.id);
    }
    Ok(None)
}

fn handle_input(runner: &mut StationRunner, line: &str) {
    match line {
        "" => runner.next(),
        ":p" => {
            runner.toggle_pause();
            if runner.is_paused() {
                println!("⏸️  Tạm dừng (vẫn có thể nhập đáp án)");
            } else {
                println!("▶️  Tiếp tục");
            }
        }
        ":+" => {
            runner.zoom_in();
            println!("🔍 Zoom {:.1}x", runner.zoom());
        }
        ":-" => {
            runner.zoom_out();
            println!("🔍 Zoom {:.1}x", runner.zoom());
        }
        ":0" => {
            runner.reset_zoom();
            println!("🔍 Zoom {:.1}x", runner.zoom());
        }
        answer => {
            runner.set_answer(answer);
            println!("✎ Đã lưu: {}", answer);
        }
    }
}

fn print_station(runner: &StationRunner, images: &[PathBuf]) {
    let (Some(index), Some(station)) = (runner.current_index(), runner.current_station()) else {
        return;
    };

    println!("\n{}", "=".repeat(60));
    println!(
        "🩻 Trạm {}/{} (trang {}) - {} giây",
        index + 1,
        runner.station_count(),
        station.source_page,
        runner.remaining_seconds()
    );
    if let Some(path) = images.get(index) {
        println!("🖼️  {}", path.display());
    }
    if let Some(question) = station.primary_question() {
        println!("❓ {}", question.question_text);
    }
    println!("{}", "=".repeat(60));
}

/// 把站点图片写到导出目录，返回文件路径（与站点顺序一致）
async fn export_station_images(dir: &Path, stations: &[StationItem]) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("无法创建导出目录: {}", dir.display()))?;

    let mut paths = Vec::with_capacity(stations.len());
    for (idx, station) in stations.iter().enumerate() {
        let bytes = decode_data_uri(&station.image_uri)
            .with_context(|| format!("站点 {} 的图片数据无效", station.id))?;
        let path = dir.join(format!("station-{}-p{}.jpg", idx + 1, station.source_page));
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("无法写入图片: {}", path.display()))?;
        paths.push(path);
    }

    info!("✓ 已导出 {} 张站点图片到 {}", paths.len(), dir.display());
    Ok(paths)
}

fn print_summary(summary: &ResultSummarizer) {
    println!("\n{}", "=".repeat(60));
    if summary.is_empty() {
        println!("📊 Không có trạm nào.");
        return;
    }

    println!(
        "📊 Kết quả: {}/{} ({}%)",
        summary.correct_count(),
        summary.total(),
        summary.score_percentage()
    );
    println!("{}", "=".repeat(60));

    for (idx, grade) in summary.grades().iter().enumerate() {
        let mark = if grade.is_correct { "✅" } else { "❌" };
        let answer = if grade.user_answer.trim().is_empty() {
            "(bỏ trống)"
        } else {
            grade.user_answer.as_str()
        };
        println!("{} Trạm {}: {}", mark, idx + 1, grade.question_text);
        println!("   Bạn trả lời: {}", answer);
        println!("   Đáp án: {}", grade.correct_answer);
        if let Some(explanation) = &grade.explanation {
            println!("   💡 {}", explanation);
        }
    }
}

fn print_mentor_report(report: &MentorResponse) {
    println!("\n🦦 Rái cá nhỏ nhận xét:");
    println!("{}", report.analysis);

    println!("\n💪 Điểm mạnh:");
    print_list(&report.strengths);
    println!("\n⚠️ Cần cải thiện:");
    print_list(&report.weaknesses);

    if !report.roadmap.is_empty() {
        println!("\n🗺️ Lộ trình:");
        for step in &report.roadmap {
            println!("  • {}: {}", step.step, step.details);
        }
    }
}

fn print_list(items: &[String]) {
    if items.is_empty() {
        println!("  Không phát hiện");
    }
    for item in items {
        println!("  • {}", item);
    }
}
