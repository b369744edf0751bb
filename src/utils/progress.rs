//! # 进度显示
//!
//! 三种 `indicatif` 样式：批量解析的计数条、Materials Project 请求的
//! spinner，以及 `workflow all` 的分步条（右侧显示当前工作流）。
//!
//! ## 依赖关系
//! - 被 `batch/`, `commands/` 使用
//! - 使用 `indicatif` crate

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const COUNTER_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {elapsed_precise} {msg}";
const STEP_TEMPLATE: &str = "[{pos}/{len}] {bar:30.green/white} {msg}";

const SPINNER_TICKS: [&str; 9] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷", "✓"];

fn style(template: &str) -> ProgressStyle {
    // 模板都是常量
    ProgressStyle::with_template(template).unwrap()
}

/// 计数进度条（批量解析）
pub fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    ProgressBar::new(len)
        .with_style(style(COUNTER_TEMPLATE).progress_chars("#>-"))
        .with_message(message.to_string())
}

/// spinner，耗时不定的网络请求
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner()
        .with_style(style(SPINNER_TEMPLATE).tick_strings(&SPINNER_TICKS))
        .with_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// 分步进度条，调用方用 `set_message` 写入当前步骤名
pub fn create_step_bar(len: u64) -> ProgressBar {
    ProgressBar::new(len).with_style(style(STEP_TEMPLATE).progress_chars("█▓░"))
}
