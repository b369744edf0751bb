//! # HTTP API 模块
//!
//! 用 axum 把构建器、工作流和 Materials Project 查询暴露为 `/api` 下的
//! JSON 接口。每个请求都是无状态的：工作流在新建的临时目录中生成文件，
//! 响应返回后目录即被删除。所有阻塞工作放在 `spawn_blocking` 中执行。
//!
//! ## 依赖关系
//! - 被 `commands/serve.rs` 使用
//! - 使用 `builders/`, `workflows/`, `mp/`
//! - 子模块: error, handlers, requests

pub mod error;
pub mod handlers;
pub mod requests;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

pub use error::ApiError;
pub use requests::StructureDict;

/// 组装全部路由
pub fn router() -> Router {
    let api = Router::new()
        .route("/structures/perovskite", post(handlers::build_perovskite))
        .route("/structures/rocksalt", post(handlers::build_rocksalt))
        .route("/structures/graphite", post(handlers::build_graphite))
        .route("/structures/:kind", get(handlers::get_structure))
        .route("/si_structure", get(handlers::si_structure))
        .route("/workflows/relax", post(handlers::workflow_relax))
        .route("/workflows/surface", post(handlers::workflow_surface))
        .route("/workflows/vacancy", post(handlers::workflow_vacancy))
        .route("/workflows/dftu", post(handlers::workflow_dftu))
        .route("/workflows/d3", post(handlers::workflow_d3))
        .route("/workflows/phonon", post(handlers::workflow_phonon))
        .route("/materials/id/:mp_id", get(handlers::get_material_by_id))
        .route("/materials/:formula", get(handlers::search_materials));

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
}

/// 监听 `host:port` 直到进程退出
pub async fn serve(host: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;
    log::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router())
        .await
        .context("server stopped unexpectedly")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_builds() {
        // 路由冲突会在构建时 panic
        let _ = router();
    }
}
