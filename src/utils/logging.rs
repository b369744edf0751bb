//! # 日志初始化
//!
//! `-v` 的次数决定日志级别；未给 `-v` 时遵循 `RUST_LOG`，默认只显示警告。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `env_logger`

use log::LevelFilter;

/// `-v` 次数对应的日志级别
pub fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// 初始化全局 logger，重复调用无副作用
pub fn init(verbose: u8) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    builder.format_timestamp(None).format_target(false);
    if verbose > 0 {
        builder.filter_level(level_for(verbose));
    }
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0), LevelFilter::Warn);
        assert_eq!(level_for(2), LevelFilter::Debug);
        assert_eq!(level_for(9), LevelFilter::Trace);
    }
}
