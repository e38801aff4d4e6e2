use anyhow::Result;
/// 日志工具模块
///
/// 提供 tracing 初始化和会话级横幅输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::Section;
use crate::services::DistractionLog;

/// 初始化 tracing 订阅器
///
/// 环境变量 `RUST_LOG` 可覆盖默认级别；重复初始化无害。
pub fn init() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    Ok(())
}

/// 记录会话启动信息
pub fn log_session_start(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 考试会话启动");
    info!("📋 考试: {} | 实例: {}", config.test_id, config.user_test_id);
    info!(
        "👤 用户: {} ({}) | 录制: {}",
        config.user_id,
        config.role,
        if config.capture_enabled { "启用" } else { "关闭" }
    );
    info!("{}", "=".repeat(60));
}

/// 记录科目开始信息
///
/// # 参数
/// - `index`: 科目序号（从1开始）
/// - `total`: 科目总数
/// - `section`: 科目数据
pub fn log_section_start(index: usize, total: usize, section: &Section) {
    let description = if section.description.is_empty() {
        section.subject_id.clone()
    } else {
        truncate_text(&section.description, 40)
    };
    info!("\n{}", "─".repeat(60));
    info!(
        "📦 进入第 {}/{} 个科目: {} ({} 分钟)",
        index, total, description, section.duration_minutes
    );
    info!(
        "⏱️ 倒计时 {}",
        crate::services::format_mm_ss(section.duration_seconds())
    );
    info!("{}", "─".repeat(60));
}

/// 记录收卷完成信息
pub fn log_session_complete(config: &Config, has_results: bool, distraction: &DistractionLog) {
    info!("\n{}", "=".repeat(60));
    info!("📊 考试会话结束");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("考试: {} | 用户: {}", config.test_id, config.user_id);
    info!(
        "切屏: {} 次 / {:.1} 秒",
        distraction.count, distraction.total_away_seconds
    );
    info!("成绩: {}", if has_results { "✅ 已获取" } else { "❌ 未获取" });
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
    fn test_truncate_text_respects_char_boundaries() {
        assert_eq!(truncate_text("短文本", 10), "短文本");
        assert_eq!(truncate_text("一二三四五", 3), "一二三...");
    }
}
