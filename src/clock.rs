use chrono::{DateTime, Local};

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// The local wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: std::rc::Rc<std::cell::Cell<DateTime<Local>>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn at(now: DateTime<Local>) -> ManualClock {
        ManualClock {
            now: std::rc::Rc::new(std::cell::Cell::new(now)),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.now.get()
    }
}
