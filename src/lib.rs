//! CourseHub - 课程管理平台后端服务
//!
//! 选课审批、成绩发布与修订、反馈与通知，以及按表订阅的实时变更通道。
//!
//! # 架构
//! - `cache`: 缓存层（Moka/Redis）
//! - `config`: 配置管理
//! - `entity`: SeaORM 数据库实体
//! - `errors`: 统一错误处理
//! - `middlewares`: 认证、授权与限流中间件
//! - `models`: 数据模型定义
//! - `realtime`: 变更广播与 WebSocket 会话
//! - `routes`: API 路由层
//! - `runtime`: 运行时生命周期管理
//! - `services`: 业务逻辑层
//! - `storage`: 数据存储层（SeaORM）
//! - `utils`: 工具函数

pub mod cache;
pub mod config;
pub mod entity;
pub mod errors;
pub mod middlewares;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod utils;
