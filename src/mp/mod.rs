//! # Materials Project 客户端模块
//!
//! 通过 Materials Project REST API 查询结构和参考数据，用于验证自己的
//! VASP 计算结果。需要 API key（`MP_API_KEY` 环境变量或显式传入），
//! 缺失时在任何网络请求之前报错。
//!
//! ## 依赖关系
//! - 被 `commands/mp.rs`, `server/` 使用
//! - 使用 `reqwest` (blocking) 发送请求
//! - 子模块: client, models

pub mod client;
pub mod models;

pub use client::{MpClient, SearchQuery, MP_API_URL};
pub use models::{MaterialSummary, PhononInfo, ReferenceEnergy};
