// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process fan-out of schedule mutations to subscribed clients.
//!
//! Subscriptions are scoped per user: an event is delivered only to
//! subscribers whose user is the schedule's organizer, partner, or the
//! acting user. Delivery is best-effort and at-most-once; a subscriber
//! that is gone or has a full buffer simply misses the event.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use dashmap::DashMap;
use futures_util::Stream;
use tokio::sync::mpsc;

use crate::models::ScheduleEvent;

/// Events buffered per subscriber before delivery starts dropping.
const SUBSCRIBER_BUFFER: usize = 32;

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<ScheduleEvent>,
}

type SubscriberRegistry = Arc<DashMap<u64, Vec<Subscriber>>>;

/// Publish/subscribe hub for schedule events.
#[derive(Default)]
pub struct ScheduleBroadcaster {
    /// Live subscribers, keyed by user ID. Shared with subscriptions
    /// so dropping one can deregister itself.
    subscribers: SubscriberRegistry,
    next_id: AtomicU64,
}

impl ScheduleBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for one user. Dropping the returned
    /// subscription deregisters it; deregistration is safe against
    /// concurrent publishes.
    pub fn subscribe(&self, user_id: u64) -> ScheduleSubscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.subscribers
            .entry(user_id)
            .or_default()
            .push(Subscriber { id, tx });

        tracing::debug!(user_id, subscriber_id = id, "Schedule subscriber registered");

        ScheduleSubscription {
            registry: Arc::clone(&self.subscribers),
            user_id,
            subscriber_id: id,
            rx,
        }
    }

    /// Fan an event out to every subscriber it concerns. Non-blocking:
    /// full buffers drop the event for that subscriber, closed
    /// subscribers are pruned.
    pub fn publish(&self, event: &ScheduleEvent) {
        for user_id in event.interested_user_ids() {
            let Some(mut subs) = self.subscribers.get_mut(&user_id) else {
                continue;
            };

            subs.retain(|sub| match sub.tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(
                        user_id,
                        subscriber_id = sub.id,
                        event = %event.event_type,
                        "Subscriber buffer full, dropping event"
                    );
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            });
        }
    }

    /// Number of live subscribers for a user.
    pub fn subscriber_count(&self, user_id: u64) -> usize {
        self.subscribers
            .get(&user_id)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }
}

fn deregister(registry: &SubscriberRegistry, user_id: u64, subscriber_id: u64) {
    let now_empty = match registry.get_mut(&user_id) {
        Some(mut subs) => {
            subs.retain(|sub| sub.id != subscriber_id);
            subs.is_empty()
        }
        None => false,
    };

    // The shard guard is released above; removing while holding it
    // would deadlock.
    if now_empty {
        registry.remove_if(&user_id, |_, subs| subs.is_empty());
    }
}

/// A single subscriber's event stream.
pub struct ScheduleSubscription {
    registry: SubscriberRegistry,
    user_id: u64,
    subscriber_id: u64,
    rx: mpsc::Receiver<ScheduleEvent>,
}

impl ScheduleSubscription {
    /// Receive the next event (test/polling convenience; SSE consumes
    /// this type as a `Stream`).
    pub async fn recv(&mut self) -> Option<ScheduleEvent> {
        self.rx.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<ScheduleEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for ScheduleSubscription {
    type Item = ScheduleEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for ScheduleSubscription {
    fn drop(&mut self) {
        deregister(&self.registry, self.user_id, self.subscriber_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScheduleEventType, ScheduleStatus, WalkSchedule};
    use chrono::{NaiveDate, NaiveTime, Utc};
    use uuid::Uuid;

    fn make_event(organizer: u64, partner: Option<u64>, actor: u64) -> ScheduleEvent {
        ScheduleEvent {
            event_type: ScheduleEventType::ScheduleUpdated,
            schedule: WalkSchedule {
                id: Uuid::new_v4(),
                organizer_id: organizer,
                partner_id: partner,
                title: "Evening walk".to_string(),
                scheduled_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                scheduled_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                duration_minutes: Some(30),
                location_name: "Dog park".to_string(),
                max_participants: 2,
                is_group_walk: false,
                status: ScheduleStatus::Scheduled,
                reminder_sent: false,
                joined_count: 1,
                created_at: Utc::now(),
            },
            acting_user_id: actor,
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_reaches_organizer_and_partner() {
        let hub = Arc::new(ScheduleBroadcaster::new());
        let mut organizer_sub = hub.subscribe(1);
        let mut partner_sub = hub.subscribe(2);

        hub.publish(&make_event(1, Some(2), 1));

        assert!(organizer_sub.try_recv().is_some());
        assert!(partner_sub.try_recv().is_some());
    }

    #[tokio::test]
    async fn test_uninvolved_user_sees_nothing() {
        let hub = Arc::new(ScheduleBroadcaster::new());
        let mut bystander = hub.subscribe(99);

        hub.publish(&make_event(1, Some(2), 1));

        assert!(bystander.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_acting_user_receives_even_when_not_organizer() {
        let hub = Arc::new(ScheduleBroadcaster::new());
        let mut actor_sub = hub.subscribe(3);

        hub.publish(&make_event(1, Some(2), 3));

        assert!(actor_sub.try_recv().is_some());
    }

    #[tokio::test]
    async fn test_drop_deregisters() {
        let hub = Arc::new(ScheduleBroadcaster::new());
        let sub = hub.subscribe(1);
        assert_eq!(hub.subscriber_count(1), 1);

        drop(sub);
        assert_eq!(hub.subscriber_count(1), 0);
    }

    #[tokio::test]
    async fn test_disconnected_subscriber_misses_events_without_error() {
        let hub = Arc::new(ScheduleBroadcaster::new());
        let mut sub = hub.subscribe(1);

        drop(hub.subscribe(1)); // second subscriber, gone already
        hub.publish(&make_event(1, None, 1));

        // The live subscriber still gets the event exactly once
        assert!(sub.try_recv().is_some());
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_full_buffer_drops_without_blocking() {
        let hub = Arc::new(ScheduleBroadcaster::new());
        let mut sub = hub.subscribe(1);

        for _ in 0..(SUBSCRIBER_BUFFER + 5) {
            hub.publish(&make_event(1, None, 1));
        }

        // Subscriber survives, with exactly one buffer's worth queued
        assert_eq!(hub.subscriber_count(1), 1);
        let mut received = 0;
        while sub.try_recv().is_some() {
            received += 1;
        }
        assert_eq!(received, SUBSCRIBER_BUFFER);
    }
}
