//! A single terminal tab: output, input line and at most one process.

use std::fmt;

use log::debug;

use crate::buffer::{LineKind, OutputBuffer, OutputLine};
use crate::error::{MuxError, MuxResult};
use crate::input::InputLine;
use crate::process::{EventListener, ExitOutcome, ProcessSession, SpawnRequest};

/// Unique identifier for a pane (monotonic counter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaneId(pub u32);

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One terminal tab.
///
/// A pane is `Idle` while it has no session and `Running` while it has one;
/// [`Pane::is_running`] is derived from the session so the two never diverge.
#[derive(Debug)]
pub struct Pane {
    id: PaneId,
    name: String,
    /// Name to restore once the running command finishes.
    idle_name: Option<String>,
    output: OutputBuffer,
    /// Line the user is typing.
    pub input: InputLine,
    /// Lines scrolled up from the bottom of the output.
    pub scroll: usize,
    session: Option<ProcessSession>,
}

impl Pane {
    /// Create an idle pane with a default name.
    pub fn new(id: PaneId) -> Self {
        Self {
            id,
            name: format!("Term {id}"),
            idle_name: None,
            output: OutputBuffer::new(),
            input: InputLine::default(),
            scroll: 0,
            session: None,
        }
    }

    /// Unique pane identifier.
    pub fn id(&self) -> PaneId {
        self.id
    }

    /// Name shown in the tab list.
    pub fn display_name(&self) -> &str {
        &self.name
    }

    /// Rename the pane.
    ///
    /// While a command runs the new name is kept for after it finishes.
    pub fn rename(&mut self, name: impl Into<String>) {
        match &mut self.idle_name {
            Some(idle) => *idle = name.into(),
            None => self.name = name.into(),
        }
    }

    /// Shared handle to the pane's output.
    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    /// Append a line of output.
    pub fn push_line(&self, kind: LineKind, text: impl Into<String>) {
        self.output.append(OutputLine::new(kind, text));
    }

    /// Output joined for display.
    pub fn snapshot(&self) -> String {
        self.output.snapshot()
    }

    /// Whether a process session is attached.
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// The attached session, if any.
    pub fn session(&self) -> Option<&ProcessSession> {
        self.session.as_ref()
    }

    /// Start a command in this pane.
    ///
    /// Rejected with [`MuxError::AlreadyRunning`] while another session is
    /// attached. On failure the pane stays idle and unchanged.
    pub fn spawn<L>(&mut self, request: SpawnRequest, listener: L) -> MuxResult<()>
    where
        L: EventListener + Clone + Send + 'static,
    {
        if self.session.is_some() {
            return Err(MuxError::AlreadyRunning(self.id));
        }

        let session = ProcessSession::spawn(self.id, request, self.output.clone(), listener)?;
        let running_name = session.program().to_owned();
        self.idle_name = Some(std::mem::replace(&mut self.name, running_name));
        self.session = Some(session);
        self.scroll = 0;
        Ok(())
    }

    /// Forward bytes to the running process, if any.
    pub fn write_stdin(&self, bytes: &[u8]) {
        if let Some(session) = &self.session {
            session.write_stdin(bytes);
        }
    }

    /// Kill the running process, if any.
    pub fn terminate(&self) {
        if let Some(session) = &self.session {
            session.terminate();
        }
    }

    /// Detach the finished session and return to `Idle`.
    ///
    /// Restores the pre-run name and reports unsuccessful outcomes in the
    /// output. Returns `false` if the pane was not running.
    pub fn finish(&mut self, outcome: &ExitOutcome) -> bool {
        if self.session.take().is_none() {
            debug!("Ignoring completion for idle pane {}", self.id);
            return false;
        }
        if let Some(name) = self.idle_name.take() {
            self.name = name;
        }
        if !outcome.is_success() {
            self.push_line(LineKind::Error, outcome.to_string());
        }
        true
    }
}
