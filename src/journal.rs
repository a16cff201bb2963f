use crate::model::{Record, Task, TaskId};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::convert::TryFrom;

/// Where a task goes once a session on it is stopped.
pub trait TaskStore {
    fn save(&mut self, task: &Task) -> Result<()>;
}

impl TaskStore for Connection {
    fn save(&mut self, task: &Task) -> Result<()> {
        save_task(self, task)
    }
}

/// Time spent on a task during one day.
#[derive(Debug, PartialEq, Eq)]
pub struct DailyTotal {
    pub date: String,
    pub sessions: u32,
    pub time: u32, // in seconds
}

/// Initialize the journal database.
pub fn init_journal(db: &Connection) -> Result<()> {
    db.execute(
        "CREATE TABLE if not exists task (
                  id              INTEGER PRIMARY KEY AUTOINCREMENT,
                  name            TEXT NOT NULL,
                  position        INTEGER NOT NULL,
                  created_at      TEXT NOT NULL
                  )",
        [],
    )
    .context("Failed to create task table.")?;

    db.execute(
        "CREATE TABLE if not exists record (
                  id              INTEGER PRIMARY KEY AUTOINCREMENT,
                  task_id         INTEGER NOT NULL,
                  date            TEXT NOT NULL,
                  time            INTEGER NOT NULL
                  )",
        [],
    )
    .context("Failed to create record table.")?;

    db.execute(
        "CREATE INDEX if not exists record_task ON record (task_id)",
        [],
    )
    .context("Failed to create index on record table.")?;

    Ok(())
}

/// Return the number of tasks in the journal.
pub fn tasks_count(db: &Connection) -> Result<u32> {
    let count = db
        .query_row("SELECT count(*) FROM task", [], |row| row.get::<_, u32>(0))
        .context("Failed to count tasks from database.")?;
    Ok(count)
}

/// Add a task at the given order. Orders are not required to be unique.
pub fn add_task(
    db: &Connection,
    name: &str,
    order: u32,
    created_at: DateTime<Local>,
) -> Result<Task> {
    db.execute(
        "INSERT INTO task (name, position, created_at) VALUES(?1, ?2, ?3)",
        params![name, order, created_at],
    )
    .context("Failed to insert task to database.")?;

    let id = TaskId::try_from(db.last_insert_rowid()).context("Task id out of range.")?;
    Ok(Task::new(id, name.to_string(), order, created_at))
}

/// Get all the tasks, with their records, by order.
pub fn tasks(db: &Connection) -> Result<Vec<Task>> {
    let mut stmt = db
        .prepare("SELECT id, name, position, created_at FROM task ORDER BY position, id")
        .context("Failed to fetch tasks from database.")?;
    let mapped_rows = stmt
        .query_map([], |row| task_from_row(row))
        .context("Failed to fetch tasks from database.")?;

    let mut tasks = Vec::new();
    for task in mapped_rows {
        let mut task = task?;
        task.records = records(db, task.id)?;
        tasks.push(task);
    }

    Ok(tasks)
}

/// Get a task, with its records, by id.
pub fn task(db: &Connection, id: TaskId) -> Result<Option<Task>> {
    let task = db
        .query_row(
            "SELECT id, name, position, created_at FROM task WHERE id = ?1",
            params![id],
            |row| task_from_row(row),
        )
        .optional()
        .with_context(|| format!("Failed to obtain task {} from database.", id))?;

    match task {
        Some(mut task) => {
            task.records = records(db, task.id)?;
            Ok(Some(task))
        }
        None => Ok(None),
    }
}

/// Return the records of a task, in the order they were appended.
pub fn records(db: &Connection, id: TaskId) -> Result<Vec<Record>> {
    let mut stmt = db
        .prepare("SELECT date, time FROM record WHERE task_id = ?1 ORDER BY id")
        .context("Failed to fetch records from database.")?;
    let mapped_rows = stmt
        .query_map(params![id], |row| {
            Ok(Record {
                date: row.get(0)?,
                time: row.get(1)?,
            })
        })
        .context("Failed to fetch records from database.")?;

    let mut records = Vec::new();
    for record in mapped_rows {
        records.push(record?);
    }
    Ok(records)
}

/// Rename a task. Returns false if there is no such task.
pub fn rename_task(db: &Connection, id: TaskId, name: &str) -> Result<bool> {
    let changed = db
        .execute(
            "UPDATE task SET name = ?1 WHERE id = ?2",
            params![name, id],
        )
        .context("Failed to rename task in database.")?;
    Ok(changed > 0)
}

/// Remove a task and all its records. Returns false if there is no such
/// task.
pub fn remove_task(db: &Connection, id: TaskId) -> Result<bool> {
    let tx = db
        .unchecked_transaction()
        .context("Failed to begin transaction.")?;
    tx.execute("DELETE FROM record WHERE task_id = ?1", params![id])
        .context("Failed to remove records from database.")?;
    let removed = tx
        .execute("DELETE FROM task WHERE id = ?1", params![id])
        .context("Failed to remove task from database.")?;
    tx.commit().context("Failed to commit task removal.")?;
    Ok(removed > 0)
}

/// Write a task back. Records are append-only, so only the ones past the
/// stored count are inserted.
pub fn save_task(db: &Connection, task: &Task) -> Result<()> {
    let tx = db
        .unchecked_transaction()
        .context("Failed to begin transaction.")?;

    let updated = tx
        .execute(
            "UPDATE task SET name = ?1, position = ?2 WHERE id = ?3",
            params![task.name, task.order, task.id],
        )
        .context("Failed to update task in database.")?;
    if updated == 0 {
        bail!("Task {} is not in the journal.", task.id);
    }

    let stored = tx
        .query_row(
            "SELECT count(*) FROM record WHERE task_id = ?1",
            params![task.id],
            |row| row.get::<_, usize>(0),
        )
        .context("Failed to count records from database.")?;

    for record in task.records.iter().skip(stored) {
        tx.execute(
            "INSERT INTO record (task_id, date, time) VALUES(?1, ?2, ?3)",
            params![task.id, record.date, record.time],
        )
        .context("Failed to insert record to database.")?;
    }

    tx.commit().context("Failed to commit task.")?;
    Ok(())
}

/// Return the time spent on a task per day, oldest day first.
pub fn daily_totals(db: &Connection, id: TaskId) -> Result<Vec<DailyTotal>> {
    let mut stmt = db
        .prepare(
            "SELECT date, count(*), sum(time) FROM record WHERE task_id = ?1 GROUP BY date ORDER BY date",
        )
        .context("Failed to fetch daily totals from database.")?;
    let mapped_rows = stmt
        .query_map(params![id], |row| {
            Ok(DailyTotal {
                date: row.get(0)?,
                sessions: row.get(1)?,
                time: row.get(2)?,
            })
        })
        .context("Failed to fetch daily totals from database.")?;

    let mut totals = Vec::new();
    for total in mapped_rows {
        totals.push(total?);
    }
    Ok(totals)
}

/// Return a task, without records, from a row in this order: [id, name,
/// position, created_at]
pub fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task::new(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get::<_, DateTime<Local>>(3)?,
    ))
}
