use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use log::warn;
use std::io::Write;

/// The text slots of the time display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    TaskName,
    TimeCircle,
}

/// Something the time display renders onto.
pub trait Surface {
    fn show(&mut self);
    fn hide(&mut self);
    fn is_visible(&self) -> bool;
    fn set_text(&mut self, part: Part, text: &str);
    fn add_class(&mut self, class: &str);
    /// Remove exactly `class`, leaving any other class untouched.
    fn remove_class(&mut self, class: &str);
    fn has_class(&self, class: &str) -> bool;
}

/// Renders the display as a single, rewritten terminal line.
pub struct TerminalSurface<W: Write> {
    out: W,
    visible: bool,
    task_name: String,
    time: String,
    classes: Vec<String>,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> TerminalSurface<W> {
        TerminalSurface {
            out,
            visible: false,
            task_name: String::new(),
            time: String::new(),
            classes: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self) {
        let queued = if self.visible {
            let line = format!(
                "{} ({})  {}",
                self.task_name,
                self.classes.join(" "),
                self.time
            );
            queue!(
                self.out,
                MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(line)
            )
        } else {
            queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))
        };

        if let Err(err) = queued.and_then(|_| self.out.flush()) {
            warn!("event=render_failed module=surface error={}", err);
        }
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn show(&mut self) {
        self.visible = true;
        self.render();
    }

    fn hide(&mut self) {
        self.visible = false;
        self.render();
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_text(&mut self, part: Part, text: &str) {
        match part {
            Part::TaskName => self.task_name = text.to_string(),
            Part::TimeCircle => self.time = text.to_string(),
        }
        if self.visible {
            self.render();
        }
    }

    fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Keeps the rendered state in memory so tests can look at it.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySurface {
    pub visible: bool,
    pub task_name: String,
    pub time: String,
    pub classes: Vec<String>,
}

#[cfg(test)]
impl Surface for MemorySurface {
    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_text(&mut self, part: Part, text: &str) {
        match part {
            Part::TaskName => self.task_name = text.to_string(),
            Part::TimeCircle => self.time = text.to_string(),
        }
    }

    fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_surface_rewrites_the_line() {
        let mut surface = TerminalSurface::new(Vec::new());
        surface.set_text(Part::TaskName, "report");
        surface.add_class("task-order-3");
        surface.show();
        surface.set_text(Part::TimeCircle, "00:07");

        let out = String::from_utf8(surface.into_inner()).unwrap();
        assert!(out.ends_with("report (task-order-3)  00:07"));
        assert_eq!(out.matches("report (task-order-3)").count(), 2);
    }

    #[test]
    fn hidden_terminal_surface_only_clears() {
        let mut surface = TerminalSurface::new(Vec::new());
        surface.set_text(Part::TimeCircle, "00:07");
        surface.hide();
        assert!(!surface.is_visible());

        let out = String::from_utf8(surface.into_inner()).unwrap();
        assert!(!out.is_empty());
        assert!(!out.contains("00:07"));
    }

    #[test]
    fn remove_class_is_exact() {
        let mut surface = TerminalSurface::new(Vec::new());
        surface.add_class("task-order-1");
        surface.add_class("task-order-12");
        surface.remove_class("task-order-1");

        assert!(!surface.has_class("task-order-1"));
        assert!(surface.has_class("task-order-12"));
    }
}
