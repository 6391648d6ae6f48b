use crate::models::events::{Event, EventType};
use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, error, info};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

pub type HandlerFuture = BoxFuture<'static, ()>;
pub type HandlerFn = Arc<dyn Fn(Arc<Event>) -> HandlerFuture + Send + Sync>;
pub type FilterFn = Arc<dyn Fn(&Event) -> bool + Send + Sync>;
/// Middleware returns the (possibly modified) event, or `None` to drop it.
pub type MiddlewareFn = Arc<dyn Fn(Event) -> Option<Event> + Send + Sync>;

struct HandlerEntry {
    name: String,
    priority: i32,
    seq: u64,
    filter: Option<FilterFn>,
    handler: HandlerFn,
}

struct BusInner {
    handlers: HashMap<EventType, Vec<HandlerEntry>>,
    middleware: Vec<MiddlewareFn>,
    history: VecDeque<Arc<Event>>,
    next_seq: u64,
}

/// In-process pub/sub bus.
///
/// Handlers run in descending priority (ties in registration order), each
/// optionally gated by a filter. Middleware runs in registration order and
/// may mutate or drop the event before any handler sees it. A panicking
/// handler is logged and never prevents later handlers from running.
pub struct EventBus {
    inner: Mutex<BusInner>,
    history_limit: usize,
}

impl EventBus {
    pub const DEFAULT_HISTORY: usize = 100;

    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(BusInner {
                handlers: HashMap::new(),
                middleware: Vec::new(),
                history: VecDeque::with_capacity(Self::DEFAULT_HISTORY),
                next_seq: 0,
            }),
            history_limit: Self::DEFAULT_HISTORY,
        })
    }

    /// Subscribe an async handler.
    pub fn subscribe<F, Fut>(&self, event_type: EventType, name: &str, priority: i32, handler: F)
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.subscribe_filtered(event_type, name, priority, None, handler);
    }

    /// Subscribe an async handler with a per-handler filter.
    pub fn subscribe_filtered<F, Fut>(
        &self,
        event_type: EventType,
        name: &str,
        priority: i32,
        filter: Option<FilterFn>,
        handler: F,
    ) where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let boxed: HandlerFn = Arc::new(move |event| handler(event).boxed());
        let mut inner = self.inner.lock().unwrap();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let entries = inner.handlers.entry(event_type).or_default();
        entries.push(HandlerEntry {
            name: name.to_string(),
            priority,
            seq,
            filter,
            handler: boxed,
        });
        // Descending priority; registration order breaks ties.
        entries.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));

        info!(
            "Event handler subscribed: {} for {:?} (priority {})",
            name, event_type, priority
        );
    }

    /// Subscribe a synchronous handler.
    pub fn subscribe_sync<F>(&self, event_type: EventType, name: &str, priority: i32, handler: F)
    where
        F: Fn(Arc<Event>) + Send + Sync + 'static,
    {
        self.subscribe(event_type, name, priority, move |event| {
            handler(event);
            std::future::ready(())
        });
    }

    pub fn add_middleware(&self, middleware: MiddlewareFn) {
        let mut inner = self.inner.lock().unwrap();
        inner.middleware.push(middleware);
        info!("Event middleware registered (total {})", inner.middleware.len());
    }

    /// Publish an event: middleware, history, then handlers. Every handler
    /// in one publish sees the same event value via a shared reference.
    pub async fn publish(&self, event: Event) {
        debug!("Event: {:?}", event.event_type);

        let (event, handlers) = {
            let inner = self.inner.lock().unwrap();

            let mut current = event;
            let middleware: Vec<MiddlewareFn> = inner.middleware.clone();
            drop(inner);

            for mw in middleware {
                match mw(current) {
                    Some(next) => current = next,
                    None => {
                        debug!("Event dropped by middleware");
                        return;
                    }
                }
            }

            let mut inner = self.inner.lock().unwrap();
            let shared = Arc::new(current);
            if inner.history.len() >= self.history_limit {
                inner.history.pop_front();
            }
            inner.history.push_back(Arc::clone(&shared));

            let handlers: Vec<(String, Option<FilterFn>, HandlerFn)> = inner
                .handlers
                .get(&shared.event_type)
                .map(|entries| {
                    entries
                        .iter()
                        .map(|e| (e.name.clone(), e.filter.clone(), Arc::clone(&e.handler)))
                        .collect()
                })
                .unwrap_or_default();
            (shared, handlers)
        };

        if handlers.is_empty() {
            debug!("No event handlers registered for {:?}", event.event_type);
            return;
        }

        for (name, filter, handler) in handlers {
            if let Some(filter) = &filter {
                if !filter(&event) {
                    continue;
                }
            }

            let outcome = AssertUnwindSafe(handler(Arc::clone(&event)))
                .catch_unwind()
                .await;
            if outcome.is_err() {
                // Fault tolerance: one crashing handler must not starve the
                // rest.
                error!(
                    "Event handler '{}' panicked while handling {:?}",
                    name, event.event_type
                );
            }
        }
    }

    /// Most recent events, newest last.
    pub fn history(&self, limit: usize) -> Vec<Arc<Event>> {
        let inner = self.inner.lock().unwrap();
        inner
            .history
            .iter()
            .rev()
            .take(limit)
            .rev()
            .cloned()
            .collect()
    }

    pub fn clear_history(&self) {
        self.inner.lock().unwrap().history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::events::{EncoderId, EventData, EventOrigin};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn rotate(delta: i8) -> Event {
        Event::new(
            EventOrigin::Input,
            EventData::EncoderRotate {
                encoder: EncoderId::Selector,
                delta,
            },
        )
    }

    #[tokio::test]
    async fn handlers_run_in_descending_priority_with_ties_in_order() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for (name, priority) in [("low", 0), ("high", 10), ("mid-a", 5), ("mid-b", 5)] {
            let calls = Arc::clone(&calls);
            bus.subscribe_sync(EventType::EncoderRotate, name, priority, move |_| {
                calls.lock().unwrap().push(name);
            });
        }

        bus.publish(rotate(1)).await;
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["high", "mid-a", "mid-b", "low"]
        );
    }

    #[tokio::test]
    async fn filters_gate_individual_handlers() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let filter: FilterFn = Arc::new(|event| {
            matches!(
                event.data,
                EventData::EncoderRotate { delta, .. } if delta > 0
            )
        });
        bus.subscribe_filtered(
            EventType::EncoderRotate,
            "positive-only",
            0,
            Some(filter),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(())
            },
        );

        bus.publish(rotate(1)).await;
        bus.publish(rotate(-1)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn middleware_can_drop_events() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        bus.subscribe_sync(EventType::EncoderRotate, "count", 0, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.add_middleware(Arc::new(|event| {
            match event.data {
                EventData::EncoderRotate { delta, .. } if delta < 0 => None,
                _ => Some(event),
            }
        }));

        bus.publish(rotate(1)).await;
        bus.publish(rotate(-1)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_handler_does_not_stop_later_handlers() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        bus.subscribe_sync(EventType::EncoderRotate, "explodes", 10, |_| {
            panic!("handler bug");
        });
        let counter = Arc::clone(&hits);
        bus.subscribe_sync(EventType::EncoderRotate, "survives", 0, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(rotate(1)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn history_is_bounded_and_ordered() {
        let bus = EventBus::new();
        for i in 0..150 {
            bus.publish(rotate(if i % 2 == 0 { 1 } else { -1 })).await;
        }
        let history = bus.history(200);
        assert_eq!(history.len(), EventBus::DEFAULT_HISTORY);

        let recent = bus.history(5);
        assert_eq!(recent.len(), 5);
    }
}
