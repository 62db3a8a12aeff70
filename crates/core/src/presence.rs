//! Presence registry and real-time events.
//!
//! Maps each online account to the single live connection that last registered for it. Both
//! directions of the mapping sit behind one lock, so a registration that replaces an older
//! connection and a late disconnect from that older connection can never interleave into a
//! state where the account looks offline while its newest connection is still open.
//!
//! Delivery is best-effort and at-most-once: events go into a bounded per-connection channel
//! with `try_send`. An offline recipient or a full channel drops the event.

use crate::models::{Appointment, Role};
use crate::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use utoipa::ToSchema;

/// Process-local identifier of one socket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Who a connection claims to be, after the transport has checked the claim.
#[derive(Debug, Clone)]
pub struct Registration {
    pub account_id: RecordId,
    pub role: Role,
    pub display_name: String,
}

struct Entry {
    connection: ConnectionId,
    role: Role,
    display_name: String,
    sender: mpsc::Sender<ServerEvent>,
    connected_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    by_account: HashMap<RecordId, Entry>,
    by_connection: HashMap<ConnectionId, RecordId>,
}

/// Snapshot row for the admin presence view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnlineAccount {
    #[schema(value_type = String)]
    pub account_id: RecordId,
    pub role: Role,
    pub display_name: String,
    pub connected_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct PresenceRegistry {
    inner: Mutex<Inner>,
    next_connection: AtomicU64,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_connection.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Binds `connection` to the account, replacing whatever was bound before.
    ///
    /// Returns the connection that was displaced for this account, if any. A connection that
    /// was previously registered under a different account loses that older binding.
    pub fn register(
        &self,
        connection: ConnectionId,
        registration: Registration,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Option<ConnectionId> {
        let mut inner = self.lock();

        if let Some(previous_account) = inner.by_connection.remove(&connection) {
            if previous_account != registration.account_id
                && inner
                    .by_account
                    .get(&previous_account)
                    .is_some_and(|e| e.connection == connection)
            {
                inner.by_account.remove(&previous_account);
            }
        }

        let entry = Entry {
            connection,
            role: registration.role,
            display_name: registration.display_name,
            sender,
            connected_at: Utc::now(),
        };
        let displaced = inner
            .by_account
            .insert(registration.account_id.clone(), entry)
            .map(|old| old.connection)
            .filter(|old| *old != connection);
        if let Some(old) = displaced {
            inner.by_connection.remove(&old);
        }
        inner
            .by_connection
            .insert(connection, registration.account_id.clone());

        tracing::debug!(
            account = %registration.account_id,
            %connection,
            displaced = ?displaced,
            "presence registered"
        );
        displaced
    }

    /// Drops the binding for `connection`. Bindings made by newer connections are untouched.
    ///
    /// Returns the account that went offline, if this connection was its current one.
    pub fn unregister(&self, connection: ConnectionId) -> Option<RecordId> {
        let mut inner = self.lock();
        let account = inner.by_connection.remove(&connection)?;
        let current = inner
            .by_account
            .get(&account)
            .is_some_and(|e| e.connection == connection);
        if !current {
            return None;
        }
        inner.by_account.remove(&account);
        tracing::debug!(%account, %connection, "presence unregistered");
        Some(account)
    }

    /// Pushes an event to the account's live connection. Returns whether it was queued.
    pub fn send(&self, account: &RecordId, event: ServerEvent) -> bool {
        let inner = self.lock();
        let Some(entry) = inner.by_account.get(account) else {
            tracing::debug!(%account, "recipient offline, event dropped");
            return false;
        };
        match entry.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!(%account, connection = %entry.connection, "channel full, event dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(%account, connection = %entry.connection, "channel closed, event dropped");
                false
            }
        }
    }

    pub fn is_online(&self, account: &RecordId) -> bool {
        self.lock().by_account.contains_key(account)
    }

    pub fn connection_of(&self, account: &RecordId) -> Option<ConnectionId> {
        self.lock().by_account.get(account).map(|e| e.connection)
    }

    pub fn len(&self) -> usize {
        self.lock().by_account.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Online accounts, longest-connected first.
    pub fn online(&self) -> Vec<OnlineAccount> {
        let inner = self.lock();
        let mut rows: Vec<_> = inner
            .by_account
            .iter()
            .map(|(id, e)| OnlineAccount {
                account_id: id.clone(),
                role: e.role,
                display_name: e.display_name.clone(),
                connected_at: e.connected_at,
            })
            .collect();
        rows.sort_by(|a, b| a.connected_at.cmp(&b.connected_at));
        rows
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Messages a client sends over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    Register(RegisterPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub account_id: String,
    pub role: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Messages the server pushes over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    RegistrationConfirmed(RegistrationConfirmed),
    AppointmentNotification(AppointmentEvent),
    AppointmentUpdate(AppointmentEvent),
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationConfirmed {
    pub account_id: RecordId,
    pub role: Role,
    pub connected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment: Option<Appointment>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(account: &RecordId) -> Registration {
        Registration {
            account_id: account.clone(),
            role: Role::Doctor,
            display_name: "Dr. Test".into(),
        }
    }

    fn ping() -> ServerEvent {
        ServerEvent::error("ping")
    }

    #[test]
    fn second_registration_wins_and_stale_disconnect_is_ignored() {
        let registry = PresenceRegistry::new();
        let account = RecordId::new();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        let first = registry.next_connection_id();
        let second = registry.next_connection_id();

        assert_eq!(registry.register(first, registration(&account), tx1), None);
        assert_eq!(
            registry.register(second, registration(&account), tx2),
            Some(first)
        );
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.unregister(first), None);
        assert_eq!(registry.connection_of(&account), Some(second));

        assert!(registry.send(&account, ping()));
        assert_eq!(rx2.try_recv().unwrap(), ping());
        assert!(rx1.try_recv().is_err());

        assert_eq!(registry.unregister(second), Some(account.clone()));
        assert!(!registry.is_online(&account));
    }

    #[test]
    fn reregistering_a_connection_moves_it_between_accounts() {
        let registry = PresenceRegistry::new();
        let alice = RecordId::new();
        let bob = RecordId::new();
        let conn = registry.next_connection_id();
        let (tx, _rx) = mpsc::channel(4);

        registry.register(conn, registration(&alice), tx.clone());
        registry.register(conn, registration(&bob), tx);

        assert!(!registry.is_online(&alice));
        assert!(registry.is_online(&bob));
        assert_eq!(registry.online().len(), 1);
    }

    #[test]
    fn offline_or_full_recipients_drop_events() {
        let registry = PresenceRegistry::new();
        let account = RecordId::new();
        assert!(!registry.send(&account, ping()));

        let (tx, _rx) = mpsc::channel(1);
        registry.register(registry.next_connection_id(), registration(&account), tx);
        assert!(registry.send(&account, ping()));
        assert!(!registry.send(&account, ping()));
    }

    #[test]
    fn events_use_tagged_snake_case_envelope() {
        let json = serde_json::to_value(ServerEvent::AppointmentUpdate(AppointmentEvent {
            kind: "status_changed".into(),
            message: "Appointment cancelled".into(),
            appointment: None,
            timestamp: Utc::now(),
        }))
        .unwrap();
        assert_eq!(json["event"], "appointment_update");
        assert_eq!(json["data"]["type"], "status_changed");

        let parsed: ClientEvent = serde_json::from_str(
            r#"{"event":"register","data":{"accountId":"abc","role":"doctor","displayName":"Dr. A"}}"#,
        )
        .unwrap();
        let ClientEvent::Register(payload) = parsed;
        assert_eq!(payload.account_id, "abc");
        assert_eq!(payload.display_name.as_deref(), Some("Dr. A"));
    }
}
