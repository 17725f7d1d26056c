//! Event queue for the modal menu loop
//!
//! Blocking-with-timeout reads from the X connection using mio, one slot of
//! look-ahead and coalescing of consecutive motion events.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::os::unix::io::AsRawFd;
use std::time::Duration;
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

pub struct EventQueue {
    pending: VecDeque<Event>,
    poll: mio::Poll,
    events: mio::Events,
}

impl EventQueue {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        let fd = conn.stream().as_raw_fd();
        let poll = mio::Poll::new().context("Failed to create mio Poll")?;
        poll.registry()
            .register(
                &mut mio::unix::SourceFd(&fd),
                mio::Token(0),
                mio::Interest::READABLE,
            )
            .context("Failed to register X11 FD with mio")?;

        Ok(Self {
            pending: VecDeque::new(),
            poll,
            events: mio::Events::with_capacity(1),
        })
    }

    /// Next event, waiting at most `timeout` for one to arrive
    pub fn next(&mut self, conn: &RustConnection, timeout: Duration) -> Result<Option<Event>> {
        self.fill(conn)?;
        if self.pending.is_empty() {
            conn.flush()?;
            match self.poll.poll(&mut self.events, Some(timeout)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e).context("X11 socket poll failed"),
            }
            self.fill(conn)?;
        }
        Ok(pop_coalesced(&mut self.pending))
    }

    /// Event that the next call to [`next`](Self::next) would return first
    pub fn peek(&self) -> Option<&Event> {
        self.pending.front()
    }

    fn fill(&mut self, conn: &RustConnection) -> Result<()> {
        while let Some(event) = conn.poll_for_event()? {
            self.pending.push_back(event);
        }
        Ok(())
    }
}

/// Pop the front event; a run of motion events for the same window
/// collapses to its last member.
fn pop_coalesced(pending: &mut VecDeque<Event>) -> Option<Event> {
    let mut event = pending.pop_front()?;
    loop {
        let window = match &event {
            Event::MotionNotify(motion) => motion.event,
            _ => break,
        };
        match pending.front() {
            Some(Event::MotionNotify(next)) if next.event == window => {}
            _ => break,
        }
        match pending.pop_front() {
            Some(next) => event = next,
            None => break,
        }
    }
    Some(event)
}
