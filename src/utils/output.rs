//! # 终端输出
//!
//! 命令的人类可读输出。状态行带彩色前缀；警告、跳过和错误写到 stderr，
//! 这样 `--json` 模式下 stdout 只有 JSON。
//!
//! ## 依赖关系
//! - 被所有 `commands/` 模块使用
//! - 使用 `colored` crate

use colored::{ColoredString, Colorize};

const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Error,
    Warning,
    Info,
    Skip,
    Done,
}

impl Status {
    fn tag(self) -> ColoredString {
        match self {
            Status::Ok => "[OK]".green().bold(),
            Status::Error => "[ERR]".red().bold(),
            Status::Warning => "[WARN]".yellow().bold(),
            Status::Info => "[*]".blue().bold(),
            Status::Skip => "[SKIP]".dimmed(),
            Status::Done => "[DONE]".green().bold(),
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Status::Error | Status::Warning | Status::Skip)
    }
}

fn status_line(status: Status, msg: &str) -> String {
    format!("{} {}", status.tag(), msg)
}

fn emit(status: Status, msg: &str) {
    let line = status_line(status, msg);
    if status.to_stderr() {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}

pub fn print_success(msg: &str) {
    emit(Status::Ok, msg);
}

pub fn print_error(msg: &str) {
    emit(Status::Error, msg);
}

pub fn print_warning(msg: &str) {
    emit(Status::Warning, msg);
}

pub fn print_info(msg: &str) {
    emit(Status::Info, msg);
}

/// 跳过的目录（如计算尚未运行）
pub fn print_skip(msg: &str) {
    emit(Status::Skip, msg);
}

pub fn print_done(msg: &str) {
    emit(Status::Done, msg);
}

/// 生成的文件：逻辑名 + 路径
pub fn print_file(name: &str, path: &str) {
    println!("  {} {:<22} {}", "+".green(), name, path.dimmed());
}

/// 对齐的 `key: value` 行
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<28} {}", format!("{}:", key).bold(), value);
}

pub fn print_header(title: &str) {
    println!("\n{}", rule());
    println!("  {}", title.bold());
    println!("{}\n", rule());
}

pub fn print_separator() {
    println!("{}", rule());
}

fn rule() -> ColoredString {
    "─".repeat(RULE_WIDTH).dimmed()
}
