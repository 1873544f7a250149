use actix::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::metrics::Metrics;
use crate::models::UserId;

// ============================================================================
// Session Registry Actor
// ============================================================================
//
// Owns the map from user id to that user's active client sessions. A session
// is an unbounded sender the connection task drains; delivering a payload
// means pushing it to every live sender of every recipient. Senders whose
// receiving half is gone are pruned during delivery.
//
// All mutation goes through the actor mailbox, so no locking is needed.
//
// ============================================================================

struct ClientSession {
    id: Uuid,
    sender: mpsc::UnboundedSender<String>,
}

pub struct SessionRegistry {
    sessions: HashMap<UserId, Vec<ClientSession>>,
    metrics: Arc<Metrics>,
}

impl SessionRegistry {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            sessions: HashMap::new(),
            metrics,
        }
    }

    fn session_count(&self) -> usize {
        self.sessions.values().map(|v| v.len()).sum()
    }

    fn update_gauge(&self) {
        self.metrics.set_active_sessions(self.session_count() as i64);
    }
}

impl Actor for SessionRegistry {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("SessionRegistry started");
    }
}

// ============================================================================
// Actor Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "()")]
pub struct RegisterSession {
    pub user_id: UserId,
    pub session_id: Uuid,
    pub sender: mpsc::UnboundedSender<String>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct UnregisterSession {
    pub user_id: UserId,
    pub session_id: Uuid,
}

/// Deliver a payload to every active session of the given users.
/// Resolves to the number of sessions the payload reached.
#[derive(Message)]
#[rtype(result = "usize")]
pub struct DeliverToUsers {
    pub recipients: Vec<UserId>,
    pub payload: String,
}

#[derive(Message)]
#[rtype(result = "usize")]
pub struct ActiveSessionCount;

// ============================================================================
// Message Handlers
// ============================================================================

impl Handler<RegisterSession> for SessionRegistry {
    type Result = ();

    fn handle(&mut self, msg: RegisterSession, _: &mut Self::Context) -> Self::Result {
        tracing::debug!(
            user_id = %msg.user_id,
            session_id = %msg.session_id,
            "Session connected"
        );

        self.sessions.entry(msg.user_id).or_default().push(ClientSession {
            id: msg.session_id,
            sender: msg.sender,
        });
        self.update_gauge();
    }
}

impl Handler<UnregisterSession> for SessionRegistry {
    type Result = ();

    fn handle(&mut self, msg: UnregisterSession, _: &mut Self::Context) -> Self::Result {
        if let Some(sessions) = self.sessions.get_mut(&msg.user_id) {
            sessions.retain(|s| s.id != msg.session_id);
            if sessions.is_empty() {
                self.sessions.remove(&msg.user_id);
            }
        }
        self.update_gauge();

        tracing::debug!(
            user_id = %msg.user_id,
            session_id = %msg.session_id,
            "Session disconnected"
        );
    }
}

impl Handler<DeliverToUsers> for SessionRegistry {
    type Result = usize;

    fn handle(&mut self, msg: DeliverToUsers, _: &mut Self::Context) -> Self::Result {
        let mut reached = 0;

        for user_id in &msg.recipients {
            let Some(sessions) = self.sessions.get_mut(user_id) else {
                continue;
            };

            // Prune sessions whose receiver hung up.
            sessions.retain(|session| match session.sender.send(msg.payload.clone()) {
                Ok(()) => {
                    reached += 1;
                    true
                }
                Err(_) => {
                    tracing::debug!(
                        user_id = %user_id,
                        session_id = %session.id,
                        "Dropping closed session"
                    );
                    false
                }
            });

            if sessions.is_empty() {
                self.sessions.remove(user_id);
            }
        }
        self.update_gauge();

        reached
    }
}

impl Handler<ActiveSessionCount> for SessionRegistry {
    type Result = usize;

    fn handle(&mut self, _: ActiveSessionCount, _: &mut Self::Context) -> Self::Result {
        self.session_count()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Addr<SessionRegistry> {
        let metrics = Arc::new(Metrics::new().unwrap());
        SessionRegistry::new(metrics).start()
    }

    #[actix::test]
    async fn test_delivery_reaches_only_recipients() {
        let registry = registry();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        registry
            .send(RegisterSession {
                user_id: UserId(1),
                session_id: Uuid::new_v4(),
                sender: tx1,
            })
            .await
            .unwrap();
        registry
            .send(RegisterSession {
                user_id: UserId(2),
                session_id: Uuid::new_v4(),
                sender: tx2,
            })
            .await
            .unwrap();

        let reached = registry
            .send(DeliverToUsers {
                recipients: vec![UserId(1)],
                payload: "{\"type\":\"user_topic\"}".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(reached, 1);
        assert_eq!(rx1.recv().await.unwrap(), "{\"type\":\"user_topic\"}");
        assert!(rx2.try_recv().is_err());
    }

    #[actix::test]
    async fn test_all_sessions_of_a_user_receive() {
        let registry = registry();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        for sender in [tx_a, tx_b] {
            registry
                .send(RegisterSession {
                    user_id: UserId(1),
                    session_id: Uuid::new_v4(),
                    sender,
                })
                .await
                .unwrap();
        }

        let reached = registry
            .send(DeliverToUsers {
                recipients: vec![UserId(1)],
                payload: "payload".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(reached, 2);
        assert_eq!(rx_a.recv().await.unwrap(), "payload");
        assert_eq!(rx_b.recv().await.unwrap(), "payload");
    }

    #[actix::test]
    async fn test_closed_sessions_are_pruned() {
        let registry = registry();
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        registry
            .send(RegisterSession {
                user_id: UserId(1),
                session_id: Uuid::new_v4(),
                sender: tx,
            })
            .await
            .unwrap();

        let reached = registry
            .send(DeliverToUsers {
                recipients: vec![UserId(1)],
                payload: "payload".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(reached, 0);

        let active = registry.send(ActiveSessionCount).await.unwrap();
        assert_eq!(active, 0);
    }

    #[actix::test]
    async fn test_unregister_removes_session() {
        let registry = registry();
        let (tx, _rx) = mpsc::unbounded_channel();
        let session_id = Uuid::new_v4();

        registry
            .send(RegisterSession {
                user_id: UserId(1),
                session_id,
                sender: tx,
            })
            .await
            .unwrap();
        registry
            .send(UnregisterSession {
                user_id: UserId(1),
                session_id,
            })
            .await
            .unwrap();

        assert_eq!(registry.send(ActiveSessionCount).await.unwrap(), 0);
    }
}
