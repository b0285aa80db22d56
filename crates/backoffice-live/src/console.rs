//! Commands typed into the `watch` screen

use crate::error::LiveError;
use crate::view::OrdersView;
use backoffice_core::OrderId;
use std::io::{self, BufRead};
use std::str::FromStr;
use tokio::sync::mpsc;

/// Short usage text listing every command
pub const HELP: &str = "Commands: view <id>, confirm <id>, delete <id>, page <n>, next, prev, help, quit";

/// One line of operator input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    /// Redraw without changing anything
    Refresh,
    /// Acknowledge an order row
    View(OrderId),
    /// Confirm an order
    Confirm(OrderId),
    /// Delete an order
    Delete(OrderId),
    /// Jump to a page, counted from 1
    Page(usize),
    /// Next page
    Next,
    /// Previous page
    Previous,
    /// Show the command list
    Help,
    /// Leave the screen
    Quit,
}

impl FromStr for WatchCommand {
    type Err = LiveError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(Self::Refresh);
        };
        let argument = words.next();
        if words.next().is_some() {
            return Err(invalid(line));
        }

        let command = match (verb.to_ascii_lowercase().as_str(), argument) {
            ("view" | "v", Some(id)) => Self::View(id.to_string()),
            ("confirm" | "c", Some(id)) => Self::Confirm(id.to_string()),
            ("delete" | "d", Some(id)) => Self::Delete(id.to_string()),
            ("page" | "p", Some(page)) => match page.parse::<usize>() {
                Ok(page) if page > 0 => Self::Page(page),
                _ => return Err(invalid(line)),
            },
            ("next" | "n", None) => Self::Next,
            ("prev" | "previous", None) => Self::Previous,
            ("help" | "h" | "?", None) => Self::Help,
            ("quit" | "q" | "exit", None) => Self::Quit,
            _ => return Err(invalid(line)),
        };
        Ok(command)
    }
}

fn invalid(line: &str) -> LiveError {
    LiveError::InvalidCommand {
        input: line.trim().to_string(),
    }
}

/// Read lines from `reader` on a dedicated thread
///
/// The thread stops at end of input or once the receiver is dropped.
#[must_use]
pub fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in reader.lines() {
            if sender.blocking_send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

/// Current page of the `watch` screen and the last status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSession {
    /// Page on screen, counted from 1
    pub page: usize,
    /// Outcome of the last command
    pub status: Option<String>,
}

impl WatchSession {
    /// Start on `page`
    #[must_use]
    pub fn new(page: usize) -> Self {
        Self {
            page: page.max(1),
            status: None,
        }
    }

    /// Run one command against the view
    ///
    /// Returns `false` when the operator asked to leave. Failures end up in
    /// [`WatchSession::status`] instead of stopping the screen.
    pub async fn apply(&mut self, view: &OrdersView, command: WatchCommand) -> bool {
        self.status = match command {
            WatchCommand::Refresh => None,
            WatchCommand::View(id) => Some(if view.mark_row_viewed(&id) {
                format!("Order {id} marked as viewed")
            } else {
                format!("Order {id} is not new")
            }),
            WatchCommand::Confirm(id) => Some(match view.confirm_order(&id).await {
                Ok(()) => format!("Order {id} confirmed"),
                Err(e) => format!("Confirm failed: {}", e.user_message()),
            }),
            WatchCommand::Delete(id) => Some(match view.delete_order(&id).await {
                Ok(()) => format!("Order {id} deleted"),
                Err(e) => format!("Delete failed: {}", e.user_message()),
            }),
            WatchCommand::Page(page) => {
                self.page = page;
                None
            }
            WatchCommand::Next => {
                self.page = self.page.saturating_add(1);
                None
            }
            WatchCommand::Previous => {
                self.page = self.page.saturating_sub(1).max(1);
                None
            }
            WatchCommand::Help => Some(HELP.to_string()),
            WatchCommand::Quit => return false,
        };
        true
    }

    /// Record an input line that did not parse
    pub fn reject(&mut self, error: &LiveError) {
        self.status = Some(format!("{error}. {HELP}"));
    }
}
