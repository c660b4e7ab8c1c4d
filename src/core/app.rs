//! # Navigation Engine
//!
//! The `App` owns the protocol driver and the page stack, and runs the
//! main event loop. Navigation is a plain stack: `push_page` opens a
//! screen on top, `pop_page` returns to the one below, `change_page`
//! swaps the top out and hands the old page back to the caller.
//!
//! Nothing renders eagerly. The loop redraws the top page only when it
//! differs from what the panel last showed, then blocks on one line read.
//! Integer lines are button presses routed to the top page; anything else
//! is panel chatter and gets logged. The loop exits when the stack
//! empties, which is the normal way to quit: pop the last page.
//!
//! `handle_line` is split out of the blocking read so dispatch is
//! testable without I/O.

use std::time::Duration;

use log::{debug, info, warn};

use crate::core::page::Page;
use crate::panel::channel::ChannelError;
use crate::panel::protocol::PanelLink;

/// Drain windows used by the run loop.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Flush window for boot-time chatter, before the first render.
    pub boot_drain: Duration,
    /// Flush window for trailing noise after a full page render.
    pub settle_drain: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            boot_drain: Duration::from_secs(5),
            settle_drain: Duration::from_millis(100),
        }
    }
}

pub struct App {
    link: PanelLink,
    stack: Vec<Page>,
    /// Identity of the page the panel currently shows. Equals the top
    /// page's id exactly when no redraw is needed.
    displayed: Option<u64>,
    next_page_id: u64,
    timing: Timing,
}

impl App {
    pub fn new(link: PanelLink, timing: Timing) -> Self {
        Self {
            link,
            stack: Vec::new(),
            displayed: None,
            next_page_id: 0,
            timing,
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The top of the stack: the page whose buttons receive events.
    pub fn current(&self) -> Option<&Page> {
        self.stack.last()
    }

    fn assign_id(&mut self, page: &mut Page) {
        self.next_page_id += 1;
        page.id = self.next_page_id;
    }

    /// Appends `page`, making it current. No immediate render; the run
    /// loop redraws lazily once it sees current differs from displayed.
    pub fn push_page(&mut self, mut page: Page) {
        self.assign_id(&mut page);
        debug!("push_page: page {} (depth {})", page.id, self.stack.len() + 1);
        self.stack.push(page);
    }

    /// Removes the top `n` pages. Popping more pages than exist clamps to
    /// an empty stack (the run loop's terminal condition) and warns.
    pub fn pop_page(&mut self, n: usize) {
        if n > self.stack.len() {
            warn!(
                "pop_page({n}) with only {} page(s) on the stack; clearing it",
                self.stack.len()
            );
        }
        let keep = self.stack.len().saturating_sub(n);
        self.stack.truncate(keep);
        debug!("pop_page: depth now {}", self.stack.len());
    }

    /// Replaces the top of the stack with `page` and returns the page it
    /// displaced, so callers can stash it and come back to it later.
    /// Returns `None` (and still pushes) if the stack was empty.
    pub fn change_page(&mut self, mut page: Page) -> Option<Page> {
        self.assign_id(&mut page);
        let replaced = self.stack.pop();
        self.stack.push(page);
        replaced
    }

    /// Updates button `i`'s image on the current page and pushes the
    /// change to the panel. Used for live feedback after a press.
    /// Out-of-range indices are logged no-ops.
    pub fn set_image(&mut self, i: usize, image: &str) -> Result<(), ChannelError> {
        let Some(page) = self.stack.last_mut() else {
            warn!("set_image({i}) with no active page");
            return Ok(());
        };
        if let Some(button) = page.button_mut(i) {
            button.set_image(image);
            self.link.set_button_image(i + 1, image)
        } else {
            warn!("set_image({i}) out of range");
            Ok(())
        }
    }

    /// Full render of the top page: freeze, clear, re-add every button in
    /// index order with its image, unfreeze, then flush trailing noise.
    fn display_current(&mut self) -> Result<(), ChannelError> {
        let Some(page) = self.stack.last() else {
            return Ok(());
        };
        debug!("rendering page {} ({} buttons)", page.id, page.buttons().len());
        self.link.freeze()?;
        self.link.clear_buttons()?;
        for (i, button) in page.buttons().iter().enumerate() {
            self.link.add_button(button.x, button.y, button.w, button.h)?;
            self.link.set_button_image(i + 1, button.image())?;
        }
        self.link.unfreeze()?;
        self.link.drain(self.timing.settle_drain)?;
        self.displayed = Some(page.id);
        Ok(())
    }

    /// Classifies one received line: integers are button presses for the
    /// current page, everything else is diagnostic panel output.
    pub fn handle_line(&mut self, line: &str) -> Result<(), ChannelError> {
        match line.trim().parse::<i64>() {
            Ok(index) => self.dispatch_button(index),
            Err(_) => {
                info!("panel: {}", line.trim_end());
                Ok(())
            }
        }
    }

    /// Routes a 1-based wire index to the current page's handler. Index
    /// zero, negative, out of range, or without a handler is a no-op.
    fn dispatch_button(&mut self, wire_index: i64) -> Result<(), ChannelError> {
        if wire_index < 1 {
            debug!("ignoring button event {wire_index}");
            return Ok(());
        }
        let index = (wire_index - 1) as usize;
        let action = self
            .stack
            .last()
            .and_then(|page| page.button(index))
            .and_then(|button| button.action.clone());
        match action {
            Some(action) => {
                debug!("button {wire_index} pressed");
                action(self, index)
            }
            None => {
                debug!("button event {wire_index} has no handler on the current page");
                Ok(())
            }
        }
    }

    /// The main event loop. Flushes boot chatter, then alternates between
    /// "redraw if the top page changed" and "block on one line read"
    /// until the stack empties. Transport errors propagate out and are
    /// fatal; there is no reconnect.
    pub fn run(&mut self) -> Result<(), ChannelError> {
        self.link.drain(self.timing.boot_drain)?;
        loop {
            let Some(top_id) = self.stack.last().map(|page| page.id) else {
                break;
            };
            if self.displayed != Some(top_id) {
                self.display_current()?;
            }
            let line = self.link.read_event()?;
            self.handle_line(&line)?;
        }
        info!("page stack empty, leaving run loop");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::core::page::{Page, action};
    use crate::test_support::test_app;

    /// A page carrying a single marker button so tests can tell pages
    /// apart after they move through the stack.
    fn marked_page(tag: &str) -> Page {
        let mut page = Page::new();
        page.add_button(1, 1, 1, 1, tag, None);
        page
    }

    fn marker(page: &Page) -> &str {
        page.button(0).unwrap().image()
    }

    #[test]
    fn test_stack_matches_plain_sequence_simulation() {
        let (mut app, _channel) = test_app();
        let mut model: Vec<&str> = Vec::new();

        app.push_page(marked_page("a"));
        model.push("a");
        app.push_page(marked_page("b"));
        model.push("b");
        assert_eq!(app.depth(), model.len());
        assert_eq!(marker(app.current().unwrap()), *model.last().unwrap());

        let replaced = app.change_page(marked_page("c")).unwrap();
        let displaced = model.pop().unwrap();
        model.push("c");
        assert_eq!(marker(&replaced), displaced);
        assert_eq!(app.depth(), model.len());
        assert_eq!(marker(app.current().unwrap()), *model.last().unwrap());

        app.push_page(marked_page("d"));
        model.push("d");
        app.pop_page(2);
        model.truncate(model.len() - 2);
        assert_eq!(app.depth(), model.len());
        assert_eq!(marker(app.current().unwrap()), *model.last().unwrap());

        app.pop_page(1);
        model.pop();
        assert!(model.is_empty());
        assert_eq!(app.depth(), 0);
        assert!(app.current().is_none());
    }

    #[test]
    fn test_pop_on_single_page_reaches_terminal_condition() {
        let (mut app, _channel) = test_app();
        app.push_page(marked_page("only"));
        app.pop_page(1);
        assert_eq!(app.depth(), 0);
        assert!(app.current().is_none());
    }

    #[test]
    fn test_pop_underflow_clamps_to_empty() {
        let (mut app, _channel) = test_app();
        app.push_page(marked_page("a"));
        app.pop_page(5);
        assert_eq!(app.depth(), 0);
    }

    #[test]
    fn test_change_page_returns_previous_top_and_keeps_depth() {
        let (mut app, _channel) = test_app();
        app.push_page(marked_page("a"));
        app.push_page(marked_page("b"));
        let replaced = app.change_page(marked_page("c")).unwrap();
        assert_eq!(marker(&replaced), "b");
        assert_eq!(app.depth(), 2);
        assert_eq!(marker(app.current().unwrap()), "c");
    }

    #[test]
    fn test_change_page_on_empty_stack_still_pushes() {
        let (mut app, _channel) = test_app();
        assert!(app.change_page(marked_page("a")).is_none());
        assert_eq!(app.depth(), 1);
    }

    #[test]
    fn test_integer_line_dispatches_matching_button_once() {
        let (mut app, _channel) = test_app();
        let presses = Rc::new(Cell::new(0));
        let counter = presses.clone();

        let mut page = Page::new();
        page.add_button(1, 1, 2, 2, "0001", None);
        page.add_button(
            1,
            3,
            2,
            2,
            "0002",
            Some(action(move |_, _| {
                counter.set(counter.get() + 1);
                Ok(())
            })),
        );
        app.push_page(page);

        app.handle_line("2").unwrap();
        assert_eq!(presses.get(), 1);
    }

    #[test]
    fn test_out_of_range_events_are_noops() {
        let (mut app, _channel) = test_app();
        let presses = Rc::new(Cell::new(0));
        let counter = presses.clone();

        let mut page = Page::new();
        page.add_button(
            1,
            1,
            2,
            2,
            "0001",
            Some(action(move |_, _| {
                counter.set(counter.get() + 1);
                Ok(())
            })),
        );
        page.add_button(1, 3, 2, 2, "0002", None);
        app.push_page(page);

        app.handle_line("5").unwrap();
        app.handle_line("0").unwrap();
        app.handle_line("-3").unwrap();
        assert_eq!(presses.get(), 0);
        assert_eq!(app.depth(), 1);
    }

    #[test]
    fn test_non_integer_line_is_diagnostic_only() {
        let (mut app, channel) = test_app();
        app.push_page(marked_page("a"));
        let before = channel.written().len();
        app.handle_line("hello").unwrap();
        assert_eq!(app.depth(), 1);
        assert_eq!(channel.written().len(), before);
    }

    #[test]
    fn test_set_image_updates_model_and_panel() {
        let (mut app, channel) = test_app();
        app.push_page(marked_page("0001"));
        app.set_image(0, "0007").unwrap();
        assert_eq!(app.current().unwrap().button(0).unwrap().image(), "0007");
        assert_eq!(channel.written().last().unwrap(), "button1 0007");
    }

    #[test]
    fn test_set_image_out_of_range_is_noop() {
        let (mut app, channel) = test_app();
        app.push_page(marked_page("0001"));
        let before = channel.written().len();
        app.set_image(4, "0007").unwrap();
        assert_eq!(channel.written().len(), before);
    }

    #[test]
    fn test_run_renders_dispatches_and_exits_on_empty_stack() {
        let (mut app, channel) = test_app();
        let mut page = Page::new();
        page.add_button(
            1,
            1,
            2,
            2,
            "0001",
            Some(action(|app, _| {
                app.pop_page(1);
                Ok(())
            })),
        );
        app.push_page(page);
        channel.push_event("1");

        app.run().unwrap();

        assert_eq!(
            channel.written(),
            vec![
                "freeze",
                "clearbuttons",
                "addbutton1122",
                "button1 0001",
                "unfreeze",
            ]
        );
        assert_eq!(channel.violations(), 0);
        assert!(channel.is_blocking());
    }

    #[test]
    fn test_run_skips_redraw_while_page_unchanged() {
        let (mut app, channel) = test_app();
        let mut page = Page::new();
        page.add_button(1, 1, 2, 2, "0001", None);
        page.add_button(
            1,
            3,
            2,
            2,
            "0002",
            Some(action(|app, _| {
                app.pop_page(1);
                Ok(())
            })),
        );
        app.push_page(page);
        channel.push_event("1");
        channel.push_event("2");

        app.run().unwrap();

        let freezes = channel.written().iter().filter(|l| *l == "freeze").count();
        assert_eq!(freezes, 1);
    }
}
