//! # dftkit 命令行入口
//!
//! 解析参数、初始化日志后分发到 `commands::run`。
//! 工作目录下的 `.env`（如 `MP_API_KEY`）会在启动时载入。

use clap::Parser;
use dftkit::cli::Cli;
use dftkit::{commands, utils};

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    utils::logging::init(cli.verbose);

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
