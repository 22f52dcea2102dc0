use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::AppConfig;

static SHARED_HUB: Lazy<Arc<ChangeHub>> = Lazy::new(|| {
    Arc::new(ChangeHub::new(
        AppConfig::get().realtime.channel_capacity,
    ))
});

/// 可订阅的表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
    Profiles,
    Courses,
    Enrollments,
    EnrollmentRequests,
    Assignments,
    Grades,
    Feedback,
    Notifications,
    Announcements,
}

impl ChangeTable {
    /// 允许作为过滤条件的归属字段
    pub fn filter_columns(&self) -> &'static [&'static str] {
        match self {
            ChangeTable::Profiles => &["id"],
            ChangeTable::Courses => &["id", "lecturer_id"],
            ChangeTable::Enrollments => &["student_id", "course_id"],
            ChangeTable::EnrollmentRequests => &["student_id", "course_id"],
            ChangeTable::Assignments => &["course_id"],
            ChangeTable::Grades => &["student_id", "course_id", "assignment_id"],
            ChangeTable::Feedback => &["student_id", "lecturer_id", "grade_id"],
            ChangeTable::Notifications => &["user_id"],
            ChangeTable::Announcements => &["course_id"],
        }
    }

    /// 不含个人数据的表，任何已登录用户都可不加过滤地订阅
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            ChangeTable::Courses | ChangeTable::Assignments | ChangeTable::Announcements
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// 列等值过滤
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFilter {
    pub column: String,
    pub value: i64,
}

/// 一次行变更
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: ChangeTable,
    pub kind: ChangeKind,
    pub id: i64,
    /// 归属字段，用于过滤
    pub keys: BTreeMap<&'static str, i64>,
}

impl ChangeEvent {
    pub fn new(table: ChangeTable, kind: ChangeKind, id: i64) -> Self {
        let mut keys = BTreeMap::new();
        keys.insert("id", id);
        Self {
            table,
            kind,
            id,
            keys,
        }
    }

    pub fn key(mut self, column: &'static str, value: i64) -> Self {
        self.keys.insert(column, value);
        self
    }

    pub fn matches(&self, filter: &ChangeFilter) -> bool {
        self.keys.get(filter.column.as_str()) == Some(&filter.value)
    }
}

/// 按表划分的广播通道集合
pub struct ChangeHub {
    channels: DashMap<ChangeTable, broadcast::Sender<ChangeEvent>>,
    capacity: usize,
}

impl ChangeHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// 进程内共享实例
    pub fn shared() -> Arc<ChangeHub> {
        SHARED_HUB.clone()
    }

    fn sender(&self, table: ChangeTable) -> broadcast::Sender<ChangeEvent> {
        self.channels
            .entry(table)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    pub fn subscribe(&self, table: ChangeTable) -> broadcast::Receiver<ChangeEvent> {
        self.sender(table).subscribe()
    }

    /// 发布事件，返回收到事件的订阅者数量（没有订阅者时为 0）
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let Some(sender) = self.channels.get(&event.table).map(|s| s.clone()) else {
            return 0;
        };
        let table = event.table;
        match sender.send(event) {
            Ok(n) => n,
            Err(_) => {
                debug!("No subscribers for {:?}", table);
                0
            }
        }
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = ChangeEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_are_routed_per_table() {
        let hub = ChangeHub::new(8);
        let mut grades = hub.subscribe(ChangeTable::Grades);
        let mut courses = hub.subscribe(ChangeTable::Courses);

        let delivered = hub.publish(
            ChangeEvent::new(ChangeTable::Grades, ChangeKind::Update, 5).key("student_id", 9),
        );
        assert_eq!(delivered, 1);

        let event = grades.recv().await.unwrap();
        assert_eq!(event.id, 5);
        assert_eq!(event.kind, ChangeKind::Update);
        assert!(courses.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = ChangeHub::new(8);
        let event = ChangeEvent::new(ChangeTable::Notifications, ChangeKind::Insert, 1);
        assert_eq!(hub.publish(event), 0);
    }

    #[test]
    fn test_filter_matching() {
        let event = ChangeEvent::new(ChangeTable::Grades, ChangeKind::Insert, 3)
            .key("student_id", 7)
            .key("course_id", 2);
        let own = ChangeFilter {
            column: "student_id".into(),
            value: 7,
        };
        let other = ChangeFilter {
            column: "student_id".into(),
            value: 8,
        };
        let unknown = ChangeFilter {
            column: "lecturer_id".into(),
            value: 7,
        };
        assert!(event.matches(&own));
        assert!(!event.matches(&other));
        assert!(!event.matches(&unknown));
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let hub = ChangeHub::new(2);
        let mut rx = hub.subscribe(ChangeTable::Feedback);
        for id in 1..=5 {
            hub.publish(ChangeEvent::new(ChangeTable::Feedback, ChangeKind::Insert, id));
        }
        match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(n)) => assert_eq!(n, 3),
            other => panic!("expected lag, got {other:?}"),
        }
    }
}
