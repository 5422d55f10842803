/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info。
/// 重复调用是安全的（测试里会多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `section_name`: 章节名称
/// - `target`: 目标站数
/// - `batch_size`: 每批并发数
pub fn log_startup(section_name: &str, target: usize, batch_size: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 并行扫描出站模式");
    info!("📖 章节: {}", section_name);
    info!("🎯 目标站数: {} | 每批并发数: {}", target, batch_size);
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `pages`: 本批候选页
/// - `collected`: 已生成站数
/// - `target`: 目标站数
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    pages: &[u32],
    collected: usize,
    target: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!(
        "📄 本批候选页: {:?} (已有 {}/{} 站)",
        pages, collected, target
    );
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `valid`: 本批有效站数
/// - `total`: 本批候选数
pub fn log_batch_complete(batch_num: usize, valid: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 有效 {}/{}", batch_num, valid, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `collected`: 生成站数
/// - `target`: 目标站数
/// - `tried`: 已尝试候选页数
/// - `quota_hit`: 是否遇到配额限制
pub fn print_final_stats(collected: usize, target: usize, tried: usize, quota_hit: bool) {
    info!("\n{}", "=".repeat(60));
    info!("📊 出站完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 生成: {}/{}", collected, target);
    info!("🔍 尝试候选页: {}", tried);
    if quota_hit {
        info!("⚠️ 过程中遇到配额限制");
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("xương đùi", 5), "xương...");
        assert_eq!(truncate_text("ngắn", 10), "ngắn");
    }
}
