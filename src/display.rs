//! The time display: shows the task being timed and its elapsed time.
//!
//! # Invariants
//! - The display is running iff it holds a session, and a session always
//!   carries both the timed task and its outstanding tick handle.
//! - Ticks with a handle other than the session's are ignored.
//! - Stopping while idle has no effect and publishes nothing.

use crate::clock::Clock;
use crate::events::{Channel, Event, EventBus, SubscriptionId};
use crate::frames::{FrameLoop, TickHandle};
use crate::journal::TaskStore;
use crate::model::{format_elapsed, Record, Task};
use crate::surface::{Part, Surface};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::{debug, info};
use std::cell::RefCell;
use std::rc::Rc;

/// Screen orientation, derived from a rotation angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn from_angle(degrees: i32) -> Orientation {
        if degrees.rem_euclid(180) == 0 {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        }
    }
}

struct Session {
    task: Task,
    started_at: DateTime<Local>,
    tick: TickHandle,
}

pub struct TimeDisplay<S: Surface, C: Clock, P: TaskStore> {
    surface: S,
    clock: C,
    store: P,
    bus: Rc<EventBus>,
    frames: Rc<FrameLoop>,
    session: Option<Session>,
    last_record: Option<Record>,
    subscriptions: Vec<SubscriptionId>,
}

impl<S, C, P> TimeDisplay<S, C, P>
where
    S: Surface + 'static,
    C: Clock + 'static,
    P: TaskStore + 'static,
{
    /// Build a hidden, idle display listening on `bus`. It stops listening
    /// when dropped.
    pub fn attach(
        surface: S,
        clock: C,
        store: P,
        bus: Rc<EventBus>,
        frames: Rc<FrameLoop>,
    ) -> Rc<RefCell<TimeDisplay<S, C, P>>> {
        let display = Rc::new(RefCell::new(TimeDisplay {
            surface,
            clock,
            store,
            bus: Rc::clone(&bus),
            frames,
            session: None,
            last_record: None,
            subscriptions: Vec::new(),
        }));

        let subscriptions: Vec<SubscriptionId> = [Channel::TaskStart, Channel::Rotate, Channel::RouteHome]
            .iter()
            .map(|channel| {
                let weak = Rc::downgrade(&display);
                bus.subscribe(*channel, move |event| match weak.upgrade() {
                    Some(display) => display.borrow_mut().handle(event),
                    None => Ok(()),
                })
            })
            .collect();

        {
            let mut this = display.borrow_mut();
            this.subscriptions = subscriptions;
            this.surface.hide();
        }
        display
    }
}

impl<S: Surface, C: Clock, P: TaskStore> TimeDisplay<S, C, P> {
    pub fn handle(&mut self, event: &Event) -> Result<()> {
        match event {
            Event::TaskStart(task) => self.start_task(task.clone()),
            Event::Rotate(degrees) => {
                self.rotate(*degrees);
                Ok(())
            }
            Event::RouteHome => self.stop_task(),
            Event::TaskStop => Ok(()),
        }
    }

    /// Start timing `task`. A task already being timed is stopped first.
    pub fn start_task(&mut self, mut task: Task) -> Result<()> {
        if self.session.is_some() {
            self.stop_task()?;
        }

        let started_at = self.clock.now();
        task.start(started_at);
        info!(
            "event=task_start module=display task={} order={}",
            task.id, task.order
        );

        self.surface.set_text(Part::TaskName, &task.name);
        self.surface.set_text(Part::TimeCircle, "00:00");
        let class = task.order_class();
        if !self.surface.has_class(&class) {
            self.surface.add_class(&class);
        }
        self.surface.show();

        let tick = self.frames.request_frame();
        self.session = Some(Session {
            task,
            started_at,
            tick,
        });
        Ok(())
    }

    /// Stop timing, save the task and publish `TaskStop`. Does nothing when
    /// idle.
    pub fn stop_task(&mut self) -> Result<()> {
        let Session { mut task, tick, .. } = match self.session.take() {
            Some(session) => session,
            None => {
                debug!("event=task_stop_ignored module=display reason=idle");
                return Ok(());
            }
        };

        self.frames.cancel_frame(tick);
        self.last_record = task.stop(self.clock.now()).cloned();
        self.surface.hide();
        self.surface.remove_class(&task.order_class());

        self.store
            .save(&task)
            .with_context(|| format!("Failed to save task {}.", task.id))?;
        info!(
            "event=task_stop module=display task={} seconds={}",
            task.id,
            self.last_record.as_ref().map_or(0, |r| r.time)
        );
        self.bus.publish(Event::TaskStop);
        Ok(())
    }

    /// Repaint the elapsed time and ask for the next frame. Returns false,
    /// doing nothing, if `handle` is not the session's outstanding tick.
    pub fn tick(&mut self, handle: TickHandle, now: DateTime<Local>) -> bool {
        let session = match self.session.as_mut() {
            Some(session) if session.tick == handle => session,
            _ => return false,
        };

        let elapsed = format_elapsed(now - session.started_at);
        self.surface.set_text(Part::TimeCircle, &elapsed);
        session.tick = self.frames.request_frame();
        true
    }

    pub fn rotate(&mut self, degrees: i32) {
        match Orientation::from_angle(degrees) {
            Orientation::Vertical => self.surface.hide(),
            Orientation::Horizontal if self.session.is_some() && !self.surface.is_visible() => {
                self.surface.show()
            }
            Orientation::Horizontal => {}
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    #[cfg(test)]
    pub fn active_task(&self) -> Option<&Task> {
        self.session.as_ref().map(|s| &s.task)
    }

    /// The record appended by the most recent stop.
    pub fn last_record(&self) -> Option<&Record> {
        self.last_record.as_ref()
    }

    #[cfg(test)]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[cfg(test)]
    pub fn store(&self) -> &P {
        &self.store
    }
}

impl<S: Surface, C: Clock, P: TaskStore> Drop for TimeDisplay<S, C, P> {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.bus.unsubscribe(id);
        }
        if let Some(session) = &self.session {
            self.frames.cancel_frame(session.tick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::surface::MemorySurface;
    use chrono::{Duration, TimeZone};
    use std::cell::Cell;

    #[derive(Default)]
    struct SavedTasks {
        saved: Vec<Task>,
    }

    impl TaskStore for SavedTasks {
        fn save(&mut self, task: &Task) -> Result<()> {
            self.saved.push(task.clone());
            Ok(())
        }
    }

    type Display = TimeDisplay<MemorySurface, ManualClock, SavedTasks>;

    struct Fixture {
        bus: Rc<EventBus>,
        frames: Rc<FrameLoop>,
        clock: ManualClock,
        display: Rc<RefCell<Display>>,
        stops: Rc<Cell<usize>>,
    }

    fn start_of_session() -> DateTime<Local> {
        Local.with_ymd_and_hms(2000, 1, 10, 9, 0, 0).unwrap()
    }

    fn fixture() -> Fixture {
        let bus = Rc::new(EventBus::new());
        let frames = Rc::new(FrameLoop::new());
        let clock = ManualClock::at(start_of_session());
        let display = TimeDisplay::attach(
            MemorySurface::default(),
            clock.clone(),
            SavedTasks::default(),
            Rc::clone(&bus),
            Rc::clone(&frames),
        );

        let stops = Rc::new(Cell::new(0));
        let seen = Rc::clone(&stops);
        bus.subscribe(Channel::TaskStop, move |_| {
            seen.set(seen.get() + 1);
            Ok(())
        });

        Fixture {
            bus,
            frames,
            clock,
            display,
            stops,
        }
    }

    fn task(order: u32) -> Task {
        Task::new(7, "some name".to_string(), order, start_of_session())
    }

    fn tick_at(f: &Fixture, seconds: i64) -> String {
        let handle = f.frames.take_pending().expect("a frame should be requested");
        assert!(f
            .display
            .borrow_mut()
            .tick(handle, start_of_session() + Duration::seconds(seconds)));
        f.display.borrow().surface().time.clone()
    }

    #[test]
    fn shows_when_task_starts() {
        let f = fixture();
        assert!(!f.display.borrow().surface().is_visible());

        f.bus.trigger(Event::TaskStart(task(1))).unwrap();

        let display = f.display.borrow();
        assert!(display.surface().is_visible());
        assert!(display.is_running());
        assert_eq!(display.surface().task_name, "some name");
        assert_eq!(display.active_task().map(|t| t.id), Some(7));
        assert!(display.active_task().map_or(false, |t| t.is_running()));
    }

    #[test]
    fn order_class_is_added_and_removed_exactly() {
        let f = fixture();
        f.display.borrow_mut().surface.add_class("task-order-22");
        f.display.borrow_mut().start_task(task(2)).unwrap();
        assert!(f.display.borrow().surface().has_class("task-order-2"));

        f.display.borrow_mut().stop_task().unwrap();

        let display = f.display.borrow();
        assert!(!display.surface().has_class("task-order-2"));
        assert!(display.surface().has_class("task-order-22"));
    }

    #[test]
    fn records_time_on_stop() {
        let f = fixture();
        f.bus.trigger(Event::TaskStart(task(1))).unwrap();
        f.clock.advance(Duration::seconds(1));
        f.display.borrow_mut().stop_task().unwrap();
        f.bus.dispatch().unwrap();

        let display = f.display.borrow();
        let saved = &display.store().saved;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].records[0].date, "2000-01-10");
        assert_eq!(saved[0].records[0].time, 1);
        assert_eq!(display.last_record().map(|r| r.time), Some(1));
        assert!(!display.surface().is_visible());
        assert!(!display.is_running());
        assert_eq!(f.stops.get(), 1);
    }

    #[test]
    fn stop_while_idle_is_a_no_op() {
        let f = fixture();
        f.display.borrow_mut().stop_task().unwrap();
        f.bus.dispatch().unwrap();

        assert_eq!(f.stops.get(), 0);
        assert!(f.display.borrow().store().saved.is_empty());
    }

    #[test]
    fn stopping_twice_saves_once() {
        let f = fixture();
        f.bus.trigger(Event::TaskStart(task(1))).unwrap();
        f.display.borrow_mut().stop_task().unwrap();
        f.display.borrow_mut().stop_task().unwrap();
        f.bus.dispatch().unwrap();

        assert_eq!(f.stops.get(), 1);
        assert_eq!(f.display.borrow().store().saved.len(), 1);
    }

    #[test]
    fn route_home_stops_once() {
        let f = fixture();
        f.bus.trigger(Event::TaskStart(task(1))).unwrap();
        f.clock.advance(Duration::seconds(30));

        f.bus.trigger(Event::RouteHome).unwrap();
        f.bus.trigger(Event::RouteHome).unwrap();

        assert_eq!(f.stops.get(), 1);
        let display = f.display.borrow();
        assert_eq!(display.store().saved.len(), 1);
        assert_eq!(display.store().saved[0].records[0].time, 30);
        assert!(!display.is_running());
    }

    #[test]
    fn route_home_while_idle_publishes_nothing() {
        let f = fixture();
        f.bus.trigger(Event::RouteHome).unwrap();

        assert_eq!(f.stops.get(), 0);
    }

    #[test]
    fn ticks_render_elapsed_time() {
        let f = fixture();
        f.display.borrow_mut().start_task(task(1)).unwrap();

        assert_eq!(tick_at(&f, 7), "00:07");
        assert_eq!(tick_at(&f, 17), "00:17");
        assert_eq!(tick_at(&f, 70), "01:10");
        assert_eq!(tick_at(&f, 700), "11:40");
    }

    #[test]
    fn stale_tick_after_stop_is_ignored() {
        let f = fixture();
        f.display.borrow_mut().start_task(task(1)).unwrap();
        let handle = f.frames.take_pending().unwrap();
        f.display.borrow_mut().stop_task().unwrap();

        let mut display = f.display.borrow_mut();
        assert!(!display.tick(handle, start_of_session() + Duration::seconds(5)));
        assert_eq!(display.surface().time, "00:00");
        assert!(!f.frames.has_pending());
    }

    #[test]
    fn stop_cancels_the_outstanding_frame() {
        let f = fixture();
        f.display.borrow_mut().start_task(task(1)).unwrap();
        assert!(f.frames.has_pending());

        f.display.borrow_mut().stop_task().unwrap();
        assert!(!f.frames.has_pending());
    }

    #[test]
    fn starting_while_running_stops_the_previous_task() {
        let f = fixture();
        f.display.borrow_mut().start_task(task(1)).unwrap();
        f.clock.advance(Duration::seconds(5));
        let mut second = task(2);
        second.id = 8;
        f.bus.trigger(Event::TaskStart(second)).unwrap();

        let display = f.display.borrow();
        assert_eq!(display.store().saved.len(), 1);
        assert_eq!(display.store().saved[0].id, 7);
        assert_eq!(display.active_task().map(|t| t.id), Some(8));
        assert!(display.surface().has_class("task-order-2"));
        assert!(!display.surface().has_class("task-order-1"));
        assert_eq!(f.stops.get(), 1);
    }

    #[test]
    fn vertical_rotation_hides() {
        let f = fixture();
        f.display.borrow_mut().surface.show();
        f.bus.trigger(Event::Rotate(90)).unwrap();

        assert!(!f.display.borrow().surface().is_visible());
    }

    #[test]
    fn vertical_rotation_while_running_keeps_timing() {
        let f = fixture();
        f.bus.trigger(Event::TaskStart(task(1))).unwrap();
        f.bus.trigger(Event::Rotate(90)).unwrap();

        {
            let display = f.display.borrow();
            assert!(!display.surface().is_visible());
            assert!(display.is_running());
        }
        assert_eq!(tick_at(&f, 7), "00:07");
        assert!(!f.display.borrow().surface().is_visible());
        assert_eq!(f.stops.get(), 0);
    }

    #[test]
    fn horizontal_rotation_shows_only_while_running() {
        let f = fixture();
        f.bus.trigger(Event::Rotate(0)).unwrap();
        assert!(!f.display.borrow().surface().is_visible());

        f.display.borrow_mut().start_task(task(1)).unwrap();
        f.display.borrow_mut().surface.hide();
        f.bus.trigger(Event::Rotate(0)).unwrap();

        let display = f.display.borrow();
        assert!(display.surface().is_visible());
        assert!(display.is_running());
    }

    #[test]
    fn orientation_from_angle() {
        assert_eq!(Orientation::from_angle(0), Orientation::Horizontal);
        assert_eq!(Orientation::from_angle(180), Orientation::Horizontal);
        assert_eq!(Orientation::from_angle(90), Orientation::Vertical);
        assert_eq!(Orientation::from_angle(-90), Orientation::Vertical);
    }

    #[test]
    fn dropping_the_display_unsubscribes() {
        let f = fixture();
        assert_eq!(f.bus.subscriber_count(), 4);

        let Fixture { bus, display, .. } = f;
        drop(display);

        assert_eq!(bus.subscriber_count(), 1);
        bus.trigger(Event::RouteHome).unwrap();
    }
}
