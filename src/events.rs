//! Typed publish/subscribe between the views.
//!
//! Events are queued by `publish` and delivered by `dispatch`, so a handler
//! may publish further events without re-entering the bus.

use crate::model::Task;
use anyhow::Result;
use log::trace;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// The named channels a subscriber can listen on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    TaskStart,
    TaskStop,
    Rotate,
    RouteHome,
}

#[derive(Debug, Clone)]
pub enum Event {
    /// A task should start being timed.
    TaskStart(Task),
    /// The timed task was stopped and saved.
    TaskStop,
    /// The screen rotated to the given angle, in degrees.
    Rotate(i32),
    /// The router navigated back home.
    RouteHome,
}

impl Event {
    pub fn channel(&self) -> Channel {
        match self {
            Event::TaskStart(_) => Channel::TaskStart,
            Event::TaskStop => Channel::TaskStop,
            Event::Rotate(_) => Channel::Rotate,
            Event::RouteHome => Channel::RouteHome,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Handler = Rc<RefCell<dyn FnMut(&Event) -> Result<()>>>;

struct Subscriber {
    id: SubscriptionId,
    channel: Channel,
    handler: Handler,
}

#[derive(Default)]
pub struct EventBus {
    next_id: Cell<u64>,
    subscribers: RefCell<Vec<Subscriber>>,
    queue: RefCell<VecDeque<Event>>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    pub fn subscribe<F>(&self, channel: Channel, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) -> Result<()> + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers.borrow_mut().push(Subscriber {
            id,
            channel,
            handler: Rc::new(RefCell::new(handler)),
        });
        id
    }

    /// Remove a subscription. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    pub fn publish(&self, event: Event) {
        trace!("event=bus_publish channel={:?}", event.channel());
        self.queue.borrow_mut().push_back(event);
    }

    /// Deliver queued events in order, including the ones published while
    /// dispatching. Stops at the first handler error, leaving the remaining
    /// events queued. Returns the number of events delivered.
    pub fn dispatch(&self) -> Result<usize> {
        let mut delivered = 0;
        loop {
            let event = match self.queue.borrow_mut().pop_front() {
                Some(event) => event,
                None => return Ok(delivered),
            };

            let handlers: Vec<Handler> = self
                .subscribers
                .borrow()
                .iter()
                .filter(|s| s.channel == event.channel())
                .map(|s| Rc::clone(&s.handler))
                .collect();

            for handler in handlers {
                (&mut *handler.borrow_mut())(&event)?;
            }
            delivered += 1;
        }
    }

    /// Publish and immediately dispatch.
    pub fn trigger(&self, event: Event) -> Result<usize> {
        self.publish(event);
        self.dispatch()
    }
}
