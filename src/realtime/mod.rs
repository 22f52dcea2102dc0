//! 实时变更通道
//!
//! 每张表一个进程内广播通道。存储层在写入（事务提交）成功后发布变更事件，
//! WebSocket 会话按表和过滤条件订阅并转发给客户端。事件只携带主键和归属字段，
//! 客户端收到后自行重新拉取数据。

pub mod hub;
pub mod session;
pub mod subscription;

pub use hub::{ChangeEvent, ChangeFilter, ChangeHub, ChangeKind, ChangeTable};
pub use session::RealtimeSession;
pub use subscription::authorize_subscription;
