//! Events consumed by the controller and the threads producing them.

use std::io;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self as term_event, Event as TermEvent, KeyEvent, KeyEventKind};
use log::debug;

use envy_multiplexer::process::{EventListener, SessionEvent};

/// How long the input thread waits for terminal input before checking
/// whether the controller is still listening.
const INPUT_POLL: Duration = Duration::from_millis(250);

/// Everything the controller reacts to, one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A key press.
    Key(KeyEvent),
    /// Text pasted into the terminal.
    Paste(String),
    /// Terminal resized.
    Resize,
    /// No input arrived within the poll interval.
    Tick,
    /// Notification from a process session.
    Session(SessionEvent),
}

/// Forwards session notifications into the controller's channel.
#[derive(Debug, Clone)]
pub struct EventProxy(Sender<Event>);

impl EventProxy {
    pub fn new(sender: Sender<Event>) -> Self {
        Self(sender)
    }
}

impl EventListener for EventProxy {
    fn send_event(&self, event: SessionEvent) {
        let _ = self.0.send(Event::Session(event));
    }
}

/// Start the thread reading terminal input.
///
/// The thread exits once the receiving side of `sender` is gone.
pub fn spawn_input_thread(sender: Sender<Event>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name("input".into()).spawn(move || {
        loop {
            let event = match next_input() {
                Ok(Some(TermEvent::Key(key))) if key.kind != KeyEventKind::Release => {
                    Event::Key(key)
                },
                Ok(Some(TermEvent::Paste(text))) => Event::Paste(text),
                Ok(Some(TermEvent::Resize(..))) => Event::Resize,
                Ok(Some(_)) => continue,
                Ok(None) => Event::Tick,
                Err(err) => {
                    debug!("Terminal input closed: {err}");
                    return;
                },
            };
            if sender.send(event).is_err() {
                return;
            }
        }
    })
}

/// Wait up to [`INPUT_POLL`] for the next terminal event.
fn next_input() -> io::Result<Option<TermEvent>> {
    if term_event::poll(INPUT_POLL)? { term_event::read().map(Some) } else { Ok(None) }
}
