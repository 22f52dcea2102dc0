/*!
 * 实时变更 WebSocket 会话
 *
 * 客户端通过以下 URL 连接：
 * ```text
 * ws://host/api/v1/realtime?token=<access_token>
 * ```
 *
 * ## 客户端消息
 * ```json
 * {"type": "subscribe", "table": "grades", "filter": {"column": "student_id", "value": 7}}
 * {"type": "unsubscribe", "table": "grades"}
 * {"type": "ping"}
 * ```
 *
 * ## 服务端推送
 * ```json
 * {"type": "change", "table": "grades", "event": "update", "id": 42}
 * {"type": "lagged", "table": "grades", "missed": 3}
 * ```
 *
 * 连接建立后自动订阅本人的通知。
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use actix_ws::Message;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::hub::{ChangeEvent, ChangeFilter, ChangeHub, ChangeKind, ChangeTable};
use super::subscription::authorize_subscription;
use crate::config::AppConfig;
use crate::models::profiles::entities::UserRole;

/// 客户端消息
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        table: ChangeTable,
        #[serde(default)]
        filter: Option<ChangeFilter>,
    },
    Unsubscribe {
        table: ChangeTable,
    },
    Ping,
}

/// 服务端消息
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        user_id: i64,
    },
    Subscribed {
        table: ChangeTable,
        filter: Option<ChangeFilter>,
    },
    Unsubscribed {
        table: ChangeTable,
    },
    Change {
        table: ChangeTable,
        event: ChangeKind,
        id: i64,
    },
    Lagged {
        table: ChangeTable,
        missed: u64,
    },
    Pong,
    Error {
        message: String,
    },
}

impl From<&ChangeEvent> for ServerMessage {
    fn from(event: &ChangeEvent) -> Self {
        ServerMessage::Change {
            table: event.table,
            event: event.kind,
            id: event.id,
        }
    }
}

/// 单个连接的订阅状态
pub struct RealtimeSession {
    user_id: i64,
    role: Option<UserRole>,
    hub: Arc<ChangeHub>,
    outbox: mpsc::Sender<ServerMessage>,
    forwarders: HashMap<ChangeTable, JoinHandle<()>>,
}

impl RealtimeSession {
    pub fn new(
        user_id: i64,
        role: Option<UserRole>,
        hub: Arc<ChangeHub>,
        outbox: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            user_id,
            role,
            hub,
            outbox,
            forwarders: HashMap::new(),
        }
    }

    /// 订阅一张表；同一张表重复订阅时替换原过滤条件
    pub fn subscribe(
        &mut self,
        table: ChangeTable,
        filter: Option<ChangeFilter>,
    ) -> ServerMessage {
        let filter = match authorize_subscription(self.role, self.user_id, table, filter) {
            Ok(filter) => filter,
            Err(message) => return ServerMessage::Error { message },
        };

        self.unsubscribe(table);
        let rx = self.hub.subscribe(table);
        let handle = tokio::spawn(forward(rx, table, filter.clone(), self.outbox.clone()));
        self.forwarders.insert(table, handle);
        debug!("User {} subscribed to {:?}", self.user_id, table);

        ServerMessage::Subscribed { table, filter }
    }

    pub fn unsubscribe(&mut self, table: ChangeTable) -> bool {
        match self.forwarders.remove(&table) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn handle(&mut self, message: ClientMessage) -> ServerMessage {
        match message {
            ClientMessage::Subscribe { table, filter } => self.subscribe(table, filter),
            ClientMessage::Unsubscribe { table } => {
                self.unsubscribe(table);
                ServerMessage::Unsubscribed { table }
            }
            ClientMessage::Ping => ServerMessage::Pong,
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.forwarders.len()
    }
}

impl Drop for RealtimeSession {
    fn drop(&mut self) {
        for (_, handle) in self.forwarders.drain() {
            handle.abort();
        }
    }
}

// 把广播事件按过滤条件转发到会话的发送队列
async fn forward(
    mut rx: broadcast::Receiver<ChangeEvent>,
    table: ChangeTable,
    filter: Option<ChangeFilter>,
    outbox: mpsc::Sender<ServerMessage>,
) {
    loop {
        let message = match rx.recv().await {
            Ok(event) => {
                if filter.as_ref().is_some_and(|f| !event.matches(f)) {
                    continue;
                }
                ServerMessage::from(&event)
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                ServerMessage::Lagged { table, missed }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        if outbox.send(message).await.is_err() {
            break;
        }
    }
}

async fn send_json(session: &mut actix_ws::Session, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => session.text(json).await.is_ok(),
        Err(e) => {
            warn!("Failed to serialize realtime message: {}", e);
            true
        }
    }
}

/// 处理 WebSocket 连接直到断开
pub async fn run_session(
    user_id: i64,
    role: Option<UserRole>,
    mut ws: actix_ws::Session,
    mut stream: actix_ws::MessageStream,
) {
    let config = AppConfig::get();
    info!("Realtime connected for user: {}", user_id);

    let (outbox, mut inbox) = mpsc::channel(config.realtime.channel_capacity.max(1));
    let mut session = RealtimeSession::new(user_id, role, ChangeHub::shared(), outbox);

    if !send_json(&mut ws, &ServerMessage::Connected { user_id }).await {
        return;
    }
    session.subscribe(ChangeTable::Notifications, None);

    let mut heartbeat =
        tokio::time::interval(Duration::from_secs(config.realtime.heartbeat_interval.max(1)));

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => session.handle(client_msg),
                            Err(e) => ServerMessage::Error { message: format!("Invalid message: {e}") },
                        };
                        if !send_json(&mut ws, &reply).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if ws.pong(&data).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        warn!("Realtime error for user {}: {:?}", user_id, e);
                        break;
                    }
                    _ => {}
                }
            }

            Some(message) = inbox.recv() => {
                if !send_json(&mut ws, &message).await {
                    break;
                }
            }

            _ = heartbeat.tick() => {
                if ws.ping(b"").await.is_err() {
                    break;
                }
            }
        }
    }

    debug!(
        "Closing realtime session for user {} with {} subscriptions",
        user_id,
        session.subscription_count()
    );
    drop(session);
    let _ = ws.close(None).await;
    info!("Realtime disconnected for user: {}", user_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Option<UserRole>, user_id: i64) -> (RealtimeSession, Arc<ChangeHub>, mpsc::Receiver<ServerMessage>) {
        let hub = Arc::new(ChangeHub::new(16));
        let (tx, rx) = mpsc::channel(16);
        (RealtimeSession::new(user_id, role, hub.clone(), tx), hub, rx)
    }

    #[tokio::test]
    async fn test_filtered_events_reach_subscriber() {
        let (mut s, hub, mut rx) = session(Some(UserRole::Student), 7);
        let reply = s.handle(ClientMessage::Subscribe {
            table: ChangeTable::Grades,
            filter: Some(ChangeFilter {
                column: "student_id".into(),
                value: 7,
            }),
        });
        assert!(matches!(reply, ServerMessage::Subscribed { .. }));
        tokio::task::yield_now().await;

        hub.publish(ChangeEvent::new(ChangeTable::Grades, ChangeKind::Insert, 1).key("student_id", 8));
        hub.publish(ChangeEvent::new(ChangeTable::Grades, ChangeKind::Update, 2).key("student_id", 7));

        let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            msg,
            ServerMessage::Change {
                table: ChangeTable::Grades,
                event: ChangeKind::Update,
                id: 2
            }
        );
    }

    #[tokio::test]
    async fn test_forbidden_subscription_reports_error() {
        let (mut s, _hub, _rx) = session(Some(UserRole::Student), 7);
        let reply = s.handle(ClientMessage::Subscribe {
            table: ChangeTable::Feedback,
            filter: None,
        });
        assert!(matches!(reply, ServerMessage::Error { .. }));
        assert_eq!(s.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_forwarding() {
        let (mut s, hub, mut rx) = session(Some(UserRole::Lecturer), 2);
        s.handle(ClientMessage::Subscribe {
            table: ChangeTable::Courses,
            filter: None,
        });
        assert_eq!(s.subscription_count(), 1);
        let reply = s.handle(ClientMessage::Unsubscribe {
            table: ChangeTable::Courses,
        });
        assert_eq!(
            reply,
            ServerMessage::Unsubscribed {
                table: ChangeTable::Courses
            }
        );
        tokio::task::yield_now().await;

        hub.publish(ChangeEvent::new(ChangeTable::Courses, ChangeKind::Insert, 1));
        let got = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(got.is_err() || got.unwrap().is_none());
    }

    #[test]
    fn test_client_message_format() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"subscribe","table":"enrollment_requests","filter":{"column":"course_id","value":3}}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Subscribe {
                table: ChangeTable::EnrollmentRequests,
                filter: Some(_)
            }
        ));

        let json = serde_json::to_value(ServerMessage::Change {
            table: ChangeTable::Grades,
            event: ChangeKind::Insert,
            id: 9,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "change", "table": "grades", "event": "insert", "id": 9})
        );
    }
}
