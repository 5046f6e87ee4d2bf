//! Process-wide subscriber registry and fan-out (§4.1, §5).
//!
//! Grounded on the host platform's `records::subscribe::SubscriptionManager`
//! (non-blocking `try_send` fan-out under a `parking_lot::RwLock` registry,
//! dead-subscriber sweep) and corroborated by
//! `other_examples/21a59585_eshanized-AeroDB__src-realtime-dispatcher.rs.rs`'s
//! `RwLock<HashMap<_, Connection>>` + per-connection channel shape.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use log::*;
use parking_lot::RwLock;

use crate::constants::{AUTH_CHANNEL_CAPACITY, DEFAULT_EVENT_CHANNEL_CAPACITY, SUBSCRIBER_ID_PREFIX};
use crate::event::{AuthResultEvent, Event};

static SUBSCRIBER_COUNTER: AtomicI64 = AtomicI64::new(0);

fn next_subscriber_id() -> String {
  let n = SUBSCRIBER_COUNTER.fetch_add(1, Ordering::Relaxed);
  return format!("{SUBSCRIBER_ID_PREFIX}{n}");
}

/// A registered connection's receiving half, returned by [`Hub::subscribe`]
/// / [`Hub::subscribe_auth`] (§3).
pub struct Subscriber {
  id: String,
  tables: HashSet<String>,
  events_rx: async_channel::Receiver<Event>,
  auth_events_rx: Option<async_channel::Receiver<AuthResultEvent>>,
}

impl Subscriber {
  pub fn id(&self) -> &str {
    return &self.id;
  }

  pub fn tables(&self) -> &HashSet<String> {
    return &self.tables;
  }

  /// Receives the next event, or `None` once the Hub has unsubscribed (or
  /// closed) this subscriber.
  pub async fn recv(&self) -> Option<Event> {
    return self.events_rx.recv().await.ok();
  }

  /// Receives the (single) auth result, or `None` once the Hub has
  /// unsubscribed (or closed) this subscriber. `None` immediately if this
  /// subscriber wasn't created via [`Hub::subscribe_auth`].
  pub async fn recv_auth(&self) -> Option<AuthResultEvent> {
    let rx = self.auth_events_rx.as_ref()?;
    return rx.recv().await.ok();
  }
}

/// Sending half of a registered connection, held only by the Hub's
/// registry.
struct Registration {
  tables: HashSet<String>,
  events_tx: async_channel::Sender<Event>,
  auth_events_tx: Option<async_channel::Sender<AuthResultEvent>>,
}

#[derive(Default)]
struct Registry {
  subscribers: HashMap<String, Registration>,
}

/// Process-wide broadcast hub (§4.1).
///
/// Cheaply cloneable; every clone shares the same registry.
#[derive(Clone)]
pub struct Hub {
  registry: Arc<RwLock<Registry>>,
  event_channel_capacity: usize,
}

impl Default for Hub {
  fn default() -> Self {
    return Self::new();
  }
}

impl Hub {
  pub fn new() -> Self {
    return Self::with_capacity(DEFAULT_EVENT_CHANNEL_CAPACITY);
  }

  /// Same as [`Hub::new`] with an overridable event-channel capacity
  /// (§10.2; the auth channel's capacity of 1 is fixed per spec and not
  /// configurable).
  pub fn with_capacity(event_channel_capacity: usize) -> Self {
    return Self {
      registry: Arc::new(RwLock::new(Registry::default())),
      event_channel_capacity,
    };
  }

  /// Registers a table subscriber (§4.1 `Subscribe`).
  pub fn subscribe(&self, tables: HashSet<String>) -> Subscriber {
    let id = next_subscriber_id();
    let (events_tx, events_rx) = async_channel::bounded(self.event_channel_capacity);

    self.registry.write().subscribers.insert(
      id.clone(),
      Registration {
        tables: tables.clone(),
        events_tx,
        auth_events_tx: None,
      },
    );

    return Subscriber {
      id,
      tables,
      events_rx,
      auth_events_rx: None,
    };
  }

  /// Registers an auth-only subscriber (§4.1 `SubscribeAuth`). The
  /// returned subscriber's id doubles as the CSRF state value.
  pub fn subscribe_auth(&self) -> Subscriber {
    let id = next_subscriber_id();
    let (events_tx, events_rx) = async_channel::bounded(self.event_channel_capacity);
    let (auth_tx, auth_rx) = async_channel::bounded(AUTH_CHANNEL_CAPACITY);

    self.registry.write().subscribers.insert(
      id.clone(),
      Registration {
        tables: HashSet::new(),
        events_tx,
        auth_events_tx: Some(auth_tx),
      },
    );

    return Subscriber {
      id,
      tables: HashSet::new(),
      events_rx,
      auth_events_rx: Some(auth_rx),
    };
  }

  /// Idempotent (§4.1 `Unsubscribe`).
  pub fn unsubscribe(&self, id: &str) {
    let removed = self.registry.write().subscribers.remove(id);
    if let Some(registration) = removed {
      registration.events_tx.close();
      if let Some(auth_tx) = &registration.auth_events_tx {
        auth_tx.close();
      }
    }
  }

  pub fn has_client(&self, id: &str) -> bool {
    return self.registry.read().subscribers.contains_key(id);
  }

  pub fn client_count(&self) -> usize {
    return self.registry.read().subscribers.len();
  }

  /// Non-blocking fan-out (§4.1 `Publish`).
  ///
  /// Acquires the registry's reader lock, iterates matching subscribers,
  /// and attempts a non-blocking send on each. Never awaits while holding
  /// the lock (§5, §9).
  pub fn publish(&self, event: Event) {
    let registry = self.registry.read();
    for (id, registration) in registry.subscribers.iter() {
      if !registration.tables.contains(&event.table) {
        continue;
      }

      match registration.events_tx.try_send(event.clone()) {
        Ok(()) => {}
        Err(async_channel::TrySendError::Full(_)) => {
          warn!(
            "realtime: event channel full for subscriber {id}, dropping {:?} on {}",
            event.action, event.table
          );
        }
        Err(async_channel::TrySendError::Closed(_)) => {
          // The subscriber is mid-unregistration; nothing to do, the
          // registry entry will be gone on the next lookup.
        }
      }
    }
  }

  /// Non-blocking targeted delivery (§4.1 `PublishAuth`).
  pub fn publish_auth(&self, id: &str, result: AuthResultEvent) {
    let registry = self.registry.read();
    let Some(registration) = registry.subscribers.get(id) else {
      warn!("realtime: publish_auth for unknown subscriber {id}");
      return;
    };

    let Some(auth_tx) = &registration.auth_events_tx else {
      warn!("realtime: publish_auth for subscriber {id} without an auth channel");
      return;
    };

    match auth_tx.try_send(result) {
      Ok(()) => {}
      Err(async_channel::TrySendError::Full(_)) => {
        warn!("realtime: auth channel full for subscriber {id}, dropping delivery");
      }
      Err(async_channel::TrySendError::Closed(_)) => {
        warn!("realtime: auth channel closed for subscriber {id}, dropping delivery");
      }
    }
  }

  /// Idempotent (§4.1 `Close`). Removes and closes every subscriber.
  pub fn close(&self) {
    let mut registry = self.registry.write();
    for (_, registration) in registry.subscribers.drain() {
      registration.events_tx.close();
      if let Some(auth_tx) = &registration.auth_events_tx {
        auth_tx.close();
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::Map;
  use std::collections::HashSet;

  use crate::event::RecordAction;

  fn tables(names: &[&str]) -> HashSet<String> {
    return names.iter().map(|s| s.to_string()).collect();
  }

  fn sample_event(table: &str) -> Event {
    let mut record = Map::new();
    record.insert("id".to_string(), serde_json::Value::from(1));
    return Event::new(RecordAction::Create, table, record);
  }

  #[test]
  fn p1_registry_cardinality() {
    let hub = Hub::new();
    let a = hub.subscribe(tables(&["posts"]));
    let b = hub.subscribe_auth();
    assert_eq!(hub.client_count(), 2);

    hub.unsubscribe(a.id());
    assert_eq!(hub.client_count(), 1);

    hub.unsubscribe(b.id());
    assert_eq!(hub.client_count(), 0);

    hub.close();
    assert_eq!(hub.client_count(), 0);
  }

  #[test]
  fn p2_ids_are_distinct_and_nonempty() {
    let hub = Hub::new();
    let a = hub.subscribe(tables(&["posts"]));
    let b = hub.subscribe(tables(&["posts"]));

    assert_ne!(a.id(), b.id());
    assert!(!a.id().is_empty());
    assert!(!b.id().is_empty());
  }

  #[tokio::test]
  async fn p3_table_isolation() {
    let hub = Hub::new();
    let a = hub.subscribe(tables(&["posts"]));
    let b = hub.subscribe(tables(&["comments"]));

    hub.publish(sample_event("posts"));

    assert_eq!(a.recv().await.unwrap().table, "posts");
    assert!(
      tokio::time::timeout(std::time::Duration::from_millis(20), b.recv())
        .await
        .is_err()
    );

    hub.publish(sample_event("comments"));
    assert_eq!(b.recv().await.unwrap().table, "comments");
  }

  #[tokio::test]
  async fn p4_channel_close_on_unsubscribe_is_idempotent() {
    let hub = Hub::new();
    let sub = hub.subscribe_auth();

    hub.unsubscribe(sub.id());
    assert!(sub.recv().await.is_none());
    assert!(sub.recv_auth().await.is_none());

    // Second unsubscribe is a no-op, not a panic.
    hub.unsubscribe(sub.id());
  }

  #[tokio::test]
  async fn p5_non_blocking_broadcast_drops_when_full() {
    const CAPACITY: usize = 4;

    let hub = Hub::with_capacity(CAPACITY);
    let sub = hub.subscribe(tables(&["posts"]));

    for _ in 0..CAPACITY + 1 {
      hub.publish(sample_event("posts"));
    }

    assert_eq!(hub.client_count(), 1);

    let mut drained = 0;
    while tokio::time::timeout(std::time::Duration::from_millis(5), sub.recv())
      .await
      .is_ok()
    {
      drained += 1;
    }
    assert_eq!(drained, CAPACITY);
  }

  #[tokio::test]
  async fn p8_auth_channel_is_one_shot() {
    let hub = Hub::new();
    let sub = hub.subscribe_auth();

    hub.publish_auth(sub.id(), AuthResultEvent::success("AT", "RT"));
    hub.publish_auth(sub.id(), AuthResultEvent::success("AT2", "RT2"));

    let received = sub.recv_auth().await.unwrap();
    assert_eq!(received.token, "AT");
  }

  #[test]
  fn publish_auth_for_unknown_or_table_only_subscriber_is_a_noop() {
    let hub = Hub::new();
    hub.publish_auth("nonexistent", AuthResultEvent::success("AT", "RT"));

    let table_sub = hub.subscribe(tables(&["posts"]));
    hub.publish_auth(table_sub.id(), AuthResultEvent::success("AT", "RT"));
  }

  #[tokio::test]
  async fn subscribe_unsubscribe_subscribe_yields_distinct_subscribers() {
    let hub = Hub::new();
    let first = hub.subscribe(tables(&["posts"]));
    let first_id = first.id().to_string();
    hub.unsubscribe(&first_id);

    let second = hub.subscribe(tables(&["posts"]));
    assert_ne!(first_id, second.id());
  }
}
