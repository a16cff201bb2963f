use crate::clock::{Clock, SystemClock};
use crate::display::TimeDisplay;
use crate::events::{Event, EventBus};
use crate::frames::FrameLoop;
use crate::journal;
use crate::model::{format_elapsed, Record, Task, TaskId};
use crate::surface::TerminalSurface;
use anyhow::Result;
use chrono::Duration;
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::tty::IsTty;
use humantime::format_duration;
use log::{debug, info};
use prettytable::Table;
use rusqlite::Connection;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::Duration as StdDuration;

const NAME_WIDTH: usize = 40;

/// What the user can ask for while a task is being timed.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Stop,
    Home,
}

/// The outcome of waiting for input during one frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Poll {
    Ready(Input),
    Idle,
    Closed,
}

/// Where a running session gets its input from.
pub trait InputSource {
    /// Wait at most `timeout` for the next input.
    fn poll_input(&mut self, timeout: StdDuration) -> Result<Poll>;
}

/// Key presses read from the terminal. Without a terminal attached the
/// input is closed from the start.
pub struct Keyboard {
    attached: bool,
}

impl Default for Keyboard {
    fn default() -> Keyboard {
        Keyboard {
            attached: io::stdin().is_tty(),
        }
    }
}

impl InputSource for Keyboard {
    fn poll_input(&mut self, timeout: StdDuration) -> Result<Poll> {
        if !self.attached {
            return Ok(Poll::Closed);
        }
        if !event::poll(timeout)? {
            return Ok(Poll::Idle);
        }
        match event::read()? {
            CEvent::Key(key) => Ok(parse_key(key).map_or(Poll::Idle, Poll::Ready)),
            _ => Ok(Poll::Idle),
        }
    }
}

pub fn add_task(db: Connection, name: String, order: Option<u32>) -> Result<()> {
    let order = match order {
        Some(order) => order,
        None => journal::tasks_count(&db)? + 1,
    };
    let task = journal::add_task(&db, &name, order, SystemClock.now())?;
    info!("event=task_add task={} order={}", task.id, task.order);
    println!("{}. {} (order {})", task.id, task.name, task.order);
    Ok(())
}

pub fn remove_task(db: Connection, id: TaskId) -> Result<()> {
    if journal::remove_task(&db, id)? {
        info!("event=task_remove task={}", id);
    } else {
        println!("No task with id {}.", id);
    }
    Ok(())
}

pub fn rename_task(db: Connection, id: TaskId, name: String) -> Result<()> {
    if !journal::rename_task(&db, id, &name)? {
        println!("No task with id {}.", id);
    }
    Ok(())
}

pub fn list(db: Connection) -> Result<()> {
    let tasks = journal::tasks(&db)?;
    if tasks.is_empty() {
        println!("No tasks! use 'taskclock add' to create one.");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row!["id", "order", "task", "sessions", "total time"]);
    for task in &tasks {
        table.add_row(row![
            task.id,
            task.order,
            textwrap::fill(&task.name, NAME_WIDTH),
            task.records.len(),
            format_duration(task.total_time())
        ]);
    }
    table.printstd();
    Ok(())
}

pub fn records(db: Connection, id: TaskId) -> Result<()> {
    let task = match journal::task(&db, id)? {
        Some(task) => task,
        None => {
            println!("No task with id {}.", id);
            return Ok(());
        }
    };

    let totals = journal::daily_totals(&db, id)?;
    if totals.is_empty() {
        println!("Nothing recorded on {} yet.", task.name);
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row!["date", "sessions", "time"]);
    for total in totals {
        table.add_row(row![
            total.date,
            total.sessions,
            format_duration(StdDuration::from_secs(u64::from(total.time)))
        ]);
    }
    table.printstd();
    println!("{}: {}", task.name, format_duration(task.total_time()));
    Ok(())
}

/// Time a task on the terminal until the user stops it.
pub fn start(db: Connection, id: TaskId, frame: StdDuration) -> Result<()> {
    let task = match journal::task(&db, id)? {
        Some(task) => task,
        None => {
            println!("No task with id {}.", id);
            return Ok(());
        }
    };
    let name = task.name.clone();

    println!("Timing {}. Press enter, s or q to stop, h to go home.", name);
    let mut keyboard = Keyboard::default();
    if keyboard.attached {
        enable_raw_mode()?;
    }
    let result = run_session(db, task, io::stdout(), SystemClock, &mut keyboard, frame);
    if keyboard.attached {
        disable_raw_mode()?;
    }

    if let Some(record) = result? {
        println!(
            "{}: {} recorded on {}.",
            name,
            format_elapsed(Duration::seconds(i64::from(record.time))),
            record.date
        );
    }
    Ok(())
}

/// Drive one timing session: start `task`, redraw every `frame` and stop
/// on the first stop, home, or closed input. Returns the saved record.
pub fn run_session<W, C, I>(
    db: Connection,
    task: Task,
    out: W,
    clock: C,
    input: &mut I,
    frame: StdDuration,
) -> Result<Option<Record>>
where
    W: Write + 'static,
    C: Clock + Clone + 'static,
    I: InputSource,
{
    let bus = Rc::new(EventBus::new());
    let frames = Rc::new(FrameLoop::new());
    let display = TimeDisplay::attach(
        TerminalSurface::new(out),
        clock.clone(),
        db,
        Rc::clone(&bus),
        Rc::clone(&frames),
    );

    bus.trigger(Event::TaskStart(task))?;

    while display.borrow().is_running() {
        match input.poll_input(frame)? {
            Poll::Ready(Input::Stop) => {
                display.borrow_mut().stop_task()?;
                bus.dispatch()?;
            }
            Poll::Ready(Input::Home) => {
                bus.trigger(Event::RouteHome)?;
            }
            Poll::Idle => {}
            Poll::Closed => {
                debug!("event=input_closed module=interface");
                bus.trigger(Event::RouteHome)?;
                break;
            }
        }

        if let Some(handle) = frames.take_pending() {
            display.borrow_mut().tick(handle, clock.now());
        }
    }

    let record = display.borrow().last_record().cloned();
    Ok(record)
}

/// Map a key press to an input. Releases, repeats and unknown keys are
/// ignored.
pub fn parse_key(key: KeyEvent) -> Option<Input> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Input::Stop),
        KeyCode::Enter | KeyCode::Esc | KeyCode::Char('s') | KeyCode::Char('q') => {
            Some(Input::Stop)
        }
        KeyCode::Char('h') => Some(Input::Home),
        _ => None,
    }
}
