//! # 统一错误处理模块
//!
//! 定义 dftkit 的所有错误类型，使用 `thiserror` 派生。
//!
//! 错误分为四类：
//! - 配置错误（缺少 API key），立即失败，不重试
//! - 请求校验错误（未知预设、元素不存在、无法生成表面）
//! - 物理量缺失不是错误，由各解析函数返回 `None` 表示
//! - 文件缺失（OUTCAR 不存在），在汇总中以专门的 error 字段区分
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// dftkit 统一错误类型
#[derive(Error, Debug)]
pub enum DftkitError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("{name} not found in {dir}")]
    FileNotFound { name: String, dir: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────
    // 请求校验错误
    // ─────────────────────────────────────────────────────────────
    #[error("Unknown calc_type '{name}'. Choose from: {valid}")]
    UnknownPreset { name: String, valid: String },

    #[error("Invalid species or geometry: {0}")]
    InvalidSpeciesOrGeometry(String),

    #[error(
        "No slabs generated for Miller index ({h}, {k}, {l}). \
         Try a different orientation or larger slab size."
    )]
    NoSlabGenerated { h: i32, k: i32, l: i32 },

    #[error("Element '{element}' not found in supercell. Available: {available}")]
    SpeciesNotFound { element: String, available: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // Materials Project 客户端
    // ─────────────────────────────────────────────────────────────
    #[error(
        "No Materials Project API key found.\n\
         Set the MP_API_KEY environment variable:\n  export MP_API_KEY='your_key_here'\n\
         Get a key at https://materialsproject.org/api"
    )]
    MissingApiKey,

    #[error("Materials Project request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No results found for {0}. Check spelling or try the reduced formula.")]
    NoResults(String),

    // ─────────────────────────────────────────────────────────────
    // 序列化错误
    // ─────────────────────────────────────────────────────────────
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

impl DftkitError {
    /// 构造带路径的写文件错误
    pub fn write(path: &std::path::Path, source: std::io::Error) -> Self {
        DftkitError::FileWriteError {
            path: path.display().to_string(),
            source,
        }
    }

    /// 构造带路径的读文件错误
    pub fn read(path: &std::path::Path, source: std::io::Error) -> Self {
        DftkitError::FileReadError {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, DftkitError>;
