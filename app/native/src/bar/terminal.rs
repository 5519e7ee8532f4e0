//! Terminal presentation sink.
//!
//! Renders the bar as one line per change on stdout:
//!
//! ```text
//! left-1 left-2  ·  center  ·  right-1 right-2
//! ```
//!
//! Empty groups are skipped.
//!
//! Input is read from stdin, one command per line: `<name>` clicks a block
//! and `<name> <n>` activates the n-th (1-based) item of its menu.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};

use colored::Colorize;

use super::block::{BlockId, Position};
use super::layout::{BarLayout, Placement};
use super::sink::{PresentationSink, UiEvent, UiEventSender};
use crate::core::constants::ERROR_TEXT;
use crate::utils::spawn_named_thread;

const GROUP_SEPARATOR: &str = "  ·  ";

#[derive(Debug)]
struct Widget {
    name: String,
    text: String,
    position: Position,
    menu: Option<Vec<String>>,
}

/// Writes the bar to any [`Write`] target.
#[derive(Debug)]
pub struct TerminalSink<W> {
    out: W,
    layout: BarLayout,
    widgets: HashMap<BlockId, Widget>,
    styles: HashMap<String, String>,
    last_line: Option<String>,
}

impl TerminalSink<io::Stdout> {
    /// Creates a sink writing to stdout.
    #[must_use]
    pub fn stdout() -> Self { Self::new(io::stdout()) }
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            layout: BarLayout::new(),
            widgets: HashMap::new(),
            styles: HashMap::new(),
            last_line: None,
        }
    }

    /// Consumes the sink, returning the writer.
    pub fn into_inner(self) -> W { self.out }

    fn render_widget(&self, widget: &Widget) -> String {
        if widget.text == ERROR_TEXT {
            return widget.text.red().bold().to_string();
        }

        let class = format!("block{}", widget.name);
        if self.styles.contains_key(&class) {
            return widget.text.bold().to_string();
        }

        if widget.menu.is_some() {
            return widget.text.underline().to_string();
        }

        widget.text.clone()
    }

    /// Builds the current bar line.
    fn render(&self) -> String {
        let mut groups: [Vec<String>; 3] = Default::default();

        for id in self.layout.order() {
            let Some(widget) = self.widgets.get(id) else { continue };
            if widget.text.is_empty() {
                continue;
            }

            let slot = match widget.position {
                Position::Left => 0,
                Position::Center => 1,
                Position::Right => 2,
            };
            groups[slot].push(self.render_widget(widget));
        }

        let separator = GROUP_SEPARATOR.dimmed().to_string();
        groups
            .iter()
            .filter(|group| !group.is_empty())
            .map(|group| group.join(" "))
            .collect::<Vec<_>>()
            .join(&separator)
    }

    fn write_line(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            tracing::warn!(error = %err, "failed to write bar");
        }
    }
}

impl<W: Write + Send> PresentationSink for TerminalSink<W> {
    fn create_block(
        &mut self,
        id: BlockId,
        name: &str,
        text: &str,
        position: Position,
        placement: Placement,
    ) {
        self.layout.attach(id, placement);
        self.widgets.insert(id, Widget {
            name: name.to_string(),
            text: text.to_string(),
            position,
            menu: None,
        });
    }

    fn set_text(&mut self, id: BlockId, text: &str) {
        if let Some(widget) = self.widgets.get_mut(&id) {
            widget.text = text.to_string();
        }
    }

    fn create_menu(&mut self, id: BlockId) {
        if let Some(widget) = self.widgets.get_mut(&id) {
            widget.menu.get_or_insert_with(Vec::new);
        }
    }

    fn add_menu_item(&mut self, id: BlockId, label: &str) {
        if let Some(widget) = self.widgets.get_mut(&id) {
            widget.menu.get_or_insert_with(Vec::new).push(label.to_string());
        }
    }

    fn popup_menu(&mut self, id: BlockId) {
        let Some(widget) = self.widgets.get(&id) else { return };
        let Some(items) = &widget.menu else { return };

        let entries = items
            .iter()
            .enumerate()
            .map(|(idx, label)| format!("{}) {label}", idx + 1))
            .collect::<Vec<_>>()
            .join("  ");
        let line = format!("{} {entries}", format!("[{}]", widget.name).cyan());
        self.write_line(&line);
    }

    fn remove_block(&mut self, id: BlockId) {
        self.layout.detach(id);
        self.widgets.remove(&id);
    }

    fn add_css(&mut self, class: &str, css: &str) {
        tracing::debug!(%class, "style rule registered");
        self.styles.insert(class.to_string(), css.to_string());
    }

    fn flush(&mut self) {
        let line = self.render();
        if self.last_line.as_deref() == Some(line.as_str()) {
            return;
        }

        self.write_line(&line);
        self.last_line = Some(line);
    }
}

/// Parses one line of terminal input.
fn parse_input(line: &str) -> Option<UiEvent> {
    let mut parts = line.split_whitespace();
    let name = parts.next()?.to_string();

    match parts.next() {
        None => Some(UiEvent::Clicked { name }),
        Some(item) => {
            let index = item.parse::<usize>().ok()?.checked_sub(1)?;
            Some(UiEvent::MenuItemActivated { name, index })
        }
    }
}

/// Reads click commands from stdin on a background thread.
pub fn spawn_input_reader(events: UiEventSender) {
    spawn_named_thread("input", move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };

            match parse_input(&line) {
                Some(event) => {
                    if events.send(event).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => tracing::warn!(input = %line, "expected '<block>' or '<block> <item>'"),
            }
        }
    });
}
