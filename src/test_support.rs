//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::core::app::{App, Timing};
use crate::panel::channel::{ChannelError, LineChannel};
use crate::panel::protocol::PanelLink;

/// A scripted in-memory stand-in for the serial line.
///
/// Every write queues one pending acknowledgement (`"ok"`), which the
/// next read returns, mirroring the panel's one-reply-per-command
/// behaviour. A write issued while an acknowledgement is still pending is
/// recorded as a half-duplex violation. Lines queued with `push_event`
/// are served to blocking reads once no acknowledgement is pending;
/// lines queued with `push_noise` are served to bounded reads (drains).
///
/// Clones share state, so tests can keep a handle for inspection after
/// moving the channel into a [`PanelLink`].
#[derive(Clone, Default)]
pub struct ScriptedChannel {
    state: Rc<RefCell<ScriptState>>,
}

#[derive(Default)]
struct ScriptState {
    written: Vec<String>,
    pending_acks: usize,
    events: VecDeque<String>,
    noise: VecDeque<String>,
    timeout: Option<Duration>,
    violations: usize,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a line served to blocking reads (a button event or
    /// diagnostic seen by the run loop).
    pub fn push_event(&self, line: &str) {
        self.state.borrow_mut().events.push_back(line.to_string());
    }

    /// Queues a line served to bounded reads (boot chatter eaten by a
    /// drain).
    pub fn push_noise(&self, line: &str) {
        self.state.borrow_mut().noise.push_back(line.to_string());
    }

    pub fn written(&self) -> Vec<String> {
        self.state.borrow().written.clone()
    }

    pub fn is_blocking(&self) -> bool {
        self.state.borrow().timeout.is_none()
    }

    pub fn noise_is_empty(&self) -> bool {
        self.state.borrow().noise.is_empty()
    }

    /// Number of writes issued while a reply was still outstanding.
    pub fn violations(&self) -> usize {
        self.state.borrow().violations
    }
}

impl LineChannel for ScriptedChannel {
    fn write_line(&mut self, line: &str) -> Result<(), ChannelError> {
        let mut state = self.state.borrow_mut();
        if state.pending_acks > 0 {
            state.violations += 1;
        }
        state.written.push(line.to_string());
        state.pending_acks += 1;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>, ChannelError> {
        let mut state = self.state.borrow_mut();
        if state.pending_acks > 0 {
            state.pending_acks -= 1;
            return Ok(Some("ok".to_string()));
        }
        if state.timeout.is_some() {
            return Ok(state.noise.pop_front());
        }
        match state.events.pop_front() {
            Some(line) => Ok(Some(line)),
            None => Err(ChannelError::Closed),
        }
    }

    fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), ChannelError> {
        self.state.borrow_mut().timeout = timeout;
        Ok(())
    }
}

/// Creates an `App` wired to a scripted channel, returning both so tests
/// can drive the app and inspect the wire.
pub fn test_app() -> (App, ScriptedChannel) {
    let channel = ScriptedChannel::new();
    let link = PanelLink::new(Box::new(channel.clone()));
    let timing = Timing {
        boot_drain: Duration::from_millis(1),
        settle_drain: Duration::from_millis(1),
    };
    (App::new(link, timing), channel)
}
