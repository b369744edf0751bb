//! # serve 命令实现
//!
//! 在 tokio 多线程运行时上启动 HTTP API，直到 Ctrl-C。
//!
//! ## 依赖关系
//! - 使用 `cli/serve.rs` 定义的参数
//! - 使用 `server/`

use crate::cli::serve::ServeArgs;
use crate::error::{DftkitError, Result};
use crate::server;
use crate::utils::output;

/// 执行 serve 命令
pub fn execute(args: ServeArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| DftkitError::Other(format!("cannot start async runtime: {}", e)))?;

    output::print_info(&format!(
        "Serving the dftkit API on http://{}:{}/api (Ctrl-C to stop)",
        args.host, args.port
    ));
    runtime
        .block_on(server::serve(&args.host, args.port))
        .map_err(|e| DftkitError::Other(format!("{:#}", e)))
}
