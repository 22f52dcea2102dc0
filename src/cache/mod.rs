//! 对象缓存层
//!
//! 通过插件表选择后端（moka 内存缓存或 redis），用于缓存已认证会话。

pub mod object_cache;
pub mod register;
pub mod traits;

pub use traits::{CacheResult, ObjectCache};
