//! Child process sessions and the workers draining them.
//!
//! A [`ProcessSession`] owns one spawned command. Spawning starts four
//! background threads: a pump per output stream, which copies completed lines
//! into the pane's [`OutputBuffer`], a stdin writer, and an exit waiter, which
//! reaps the child and posts exactly one [`SessionEvent::Finished`] to the
//! listener.
//!
//! The child handle and the stdin channel live together under one mutex so a
//! kill issued by the controller can never race the waiter reaping the
//! process. Pipe writes happen on the writer thread, never under that mutex.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::buffer::{LineKind, OutputBuffer, OutputLine};
use crate::error::{MuxError, MuxResult};
use crate::pane::PaneId;

/// How often the exit waiter polls the child.
const POLL_INTERVAL: Duration = Duration::from_millis(15);

/// Variables forcing unbuffered, colorized output from common tools.
pub const FORCED_OUTPUT_VARS: [(&str, &str); 3] =
    [("PYTHONUNBUFFERED", "1"), ("FORCE_COLOR", "1"), ("CLICOLOR_FORCE", "1")];

/// Which output stream a pump drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// Child standard output.
    Stdout,
    /// Child standard error.
    Stderr,
}

impl StreamKind {
    fn line_kind(self) -> LineKind {
        match self {
            StreamKind::Stdout => LineKind::Stdout,
            StreamKind::Stderr => LineKind::Stderr,
        }
    }

    fn name(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The process exited with status zero.
    Success,
    /// The process exited with a non-zero status.
    Exited(i32),
    /// The process was terminated through [`ProcessSession::terminate`].
    Killed,
    /// The process died from a signal it was not sent by us.
    Signaled(i32),
    /// Waiting on the process failed.
    Failed(String),
}

impl ExitOutcome {
    /// Whether the process exited cleanly.
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Success)
    }

    fn from_status(status: ExitStatus, kill_requested: bool) -> Self {
        if status.success() {
            return ExitOutcome::Success;
        }
        if kill_requested {
            return ExitOutcome::Killed;
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitOutcome::Signaled(signal);
            }
        }
        ExitOutcome::Exited(status.code().unwrap_or(-1))
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Success => write!(f, "exit status 0"),
            ExitOutcome::Exited(code) => write!(f, "exit status {code}"),
            ExitOutcome::Killed => write!(f, "killed"),
            ExitOutcome::Signaled(signal) => write!(f, "terminated by signal {signal}"),
            ExitOutcome::Failed(err) => write!(f, "wait failed: {err}"),
        }
    }
}

/// Final report of a session, delivered once per successful spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Pane the session was running in.
    pub pane_id: PaneId,
    /// How the process ended.
    pub outcome: ExitOutcome,
}

/// Notifications posted by session workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// New output was appended to the pane's buffer.
    ///
    /// At most one is outstanding per buffer until the receiver calls
    /// [`OutputBuffer::take_pending`].
    Output(PaneId),
    /// The session finished.
    Finished(Completion),
}

/// Receiver of session notifications.
///
/// Implementations are called from worker threads and must not touch
/// controller state directly; they typically forward into a channel.
pub trait EventListener {
    fn send_event(&self, _event: SessionEvent) {}
}

impl EventListener for Sender<SessionEvent> {
    fn send_event(&self, event: SessionEvent) {
        let _ = self.send(event);
    }
}

/// Immutable environment snapshot handed to a child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<OsString, OsString>,
}

impl Environment {
    /// Capture the ambient environment and apply profile overrides.
    ///
    /// Overrides win over ambient variables. With `force_output` set, the
    /// [`FORCED_OUTPUT_VARS`] are added last.
    pub fn capture(overrides: &BTreeMap<String, String>, force_output: bool) -> Self {
        Self::from_base(std::env::vars_os(), overrides, force_output)
    }

    /// Build an environment from an explicit base instead of the ambient one.
    pub fn from_base<I>(base: I, overrides: &BTreeMap<String, String>, force_output: bool) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut vars: BTreeMap<OsString, OsString> = base.into_iter().collect();
        for (key, value) in overrides {
            vars.insert(key.into(), value.into());
        }
        if force_output {
            for (key, value) in FORCED_OUTPUT_VARS {
                vars.insert(key.into(), value.into());
            }
        }
        Self { vars }
    }

    /// Look up a variable.
    pub fn get(&self, key: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether no variables are set.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over all variables.
    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}

/// Everything needed to start a command.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    /// Program name or path.
    pub program: String,
    /// Arguments, not including the program.
    pub args: Vec<String>,
    /// Environment snapshot for the child.
    pub env: Environment,
    /// Working directory, or the current one when `None`.
    pub cwd: Option<PathBuf>,
    /// How long to wait for pumps to drain after the child exits.
    pub drain_timeout: Duration,
}

impl SpawnRequest {
    /// Request for `program args...` with the given environment.
    pub fn new(program: impl Into<String>, args: Vec<String>, env: Environment) -> Self {
        Self {
            program: program.into(),
            args,
            env,
            cwd: None,
            drain_timeout: Duration::from_millis(500),
        }
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set the post-exit drain timeout.
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env_clear()
            .envs(self.env.iter())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group so terminate can take down the whole tree.
            cmd.process_group(0);
        }
        cmd
    }
}

/// Child handle and stdin channel, guarded together.
///
/// Dropping `stdin` ends the writer thread, which closes the pipe.
#[derive(Debug)]
struct Control {
    child: Option<Child>,
    stdin: Option<Sender<Vec<u8>>>,
    kill_requested: bool,
}

impl Control {
    /// Reap the child if it exited, releasing both handles.
    fn poll_exit(&mut self) -> Option<ExitOutcome> {
        let child = self.child.as_mut()?;
        let outcome = match child.try_wait() {
            Ok(Some(status)) => ExitOutcome::from_status(status, self.kill_requested),
            Ok(None) => return None,
            Err(err) => ExitOutcome::Failed(err.to_string()),
        };
        self.child = None;
        self.stdin = None;
        Some(outcome)
    }
}

/// A live external command attached to a pane.
#[derive(Debug)]
pub struct ProcessSession {
    pane_id: PaneId,
    program: String,
    args: Vec<String>,
    pid: u32,
    control: Arc<Mutex<Control>>,
}

impl ProcessSession {
    /// Start `request` and attach its output to `buffer`.
    ///
    /// Fails synchronously if the program cannot be started; in that case no
    /// worker is left running and nothing is written to `buffer`.
    pub fn spawn<L>(
        pane_id: PaneId,
        request: SpawnRequest,
        buffer: OutputBuffer,
        listener: L,
    ) -> MuxResult<Self>
    where
        L: EventListener + Clone + Send + 'static,
    {
        let spawn_error =
            |source: io::Error| MuxError::Spawn { program: request.program.clone(), source };

        let mut child = request.command().spawn().map_err(spawn_error)?;
        let pid = child.id();

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                abort_child(&mut child);
                return Err(spawn_error(io::Error::other("output pipes unavailable")));
            },
        };
        let stdin = match child.stdin.take().map(|pipe| spawn_writer(pane_id, pipe)).transpose() {
            Ok(stdin) => stdin,
            Err(err) => {
                abort_child(&mut child);
                return Err(spawn_error(err));
            },
        };

        let control =
            Arc::new(Mutex::new(Control { child: Some(child), stdin, kill_requested: false }));

        let pumps = spawn_pumps(pane_id, stdout, stderr, &buffer, &listener);
        let pumps = match pumps {
            Ok(pumps) => pumps,
            Err(err) => {
                abort_control(&control);
                return Err(spawn_error(err));
            },
        };

        let waiter_control = Arc::clone(&control);
        let drain_timeout = request.drain_timeout;
        let waiter = thread::Builder::new().name(format!("pane-{pane_id}-wait")).spawn(move || {
            wait_for_exit(pane_id, waiter_control, pumps, listener, drain_timeout)
        });
        if let Err(err) = waiter {
            abort_control(&control);
            return Err(spawn_error(err));
        }

        info!("Spawned {:?} {:?} in pane {pane_id} (pid {pid})", request.program, request.args);

        Ok(Self { pane_id, program: request.program, args: request.args, pid, control })
    }

    /// Pane this session belongs to.
    pub fn pane_id(&self) -> PaneId {
        self.pane_id
    }

    /// Program that was started.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments the program was started with.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// OS process id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the child has not been reaped yet.
    pub fn is_alive(&self) -> bool {
        self.control.lock().child.is_some()
    }

    /// Queue raw bytes for the child's stdin.
    ///
    /// Never blocks on the pipe. Silently does nothing once the process is
    /// gone or its stdin closed.
    pub fn write_stdin(&self, bytes: &[u8]) {
        let mut control = self.control.lock();
        let Some(stdin) = control.stdin.as_ref() else {
            return;
        };
        if stdin.send(bytes.to_vec()).is_err() {
            debug!("stdin of pane {} closed", self.pane_id);
            control.stdin = None;
        }
    }

    /// Forcibly kill the process and its process group.
    ///
    /// A no-op once the process has been reaped. The completion notification,
    /// not this call, signals that the process is gone.
    pub fn terminate(&self) {
        let mut control = self.control.lock();
        if control.kill_requested {
            return;
        }
        let Some(child) = control.child.as_mut() else {
            return;
        };
        info!("Killing pid {} in pane {}", self.pid, self.pane_id);
        kill_tree(child);
        control.kill_requested = true;
        control.stdin = None;
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Start the thread feeding queued input into the child's stdin pipe.
fn spawn_writer(pane_id: PaneId, mut pipe: ChildStdin) -> io::Result<Sender<Vec<u8>>> {
    let (sender, receiver) = mpsc::channel::<Vec<u8>>();
    thread::Builder::new().name(format!("pane-{pane_id}-stdin")).spawn(move || {
        for bytes in receiver {
            if let Err(err) = pipe.write_all(&bytes).and_then(|()| pipe.flush()) {
                debug!("stdin of pane {pane_id} closed: {err}");
                break;
            }
        }
    })?;
    Ok(sender)
}

fn spawn_pumps<L>(
    pane_id: PaneId,
    stdout: impl Read + Send + 'static,
    stderr: impl Read + Send + 'static,
    buffer: &OutputBuffer,
    listener: &L,
) -> io::Result<Vec<JoinHandle<()>>>
where
    L: EventListener + Clone + Send + 'static,
{
    let out = spawn_pump(pane_id, StreamKind::Stdout, stdout, buffer.clone(), listener.clone())?;
    let err = spawn_pump(pane_id, StreamKind::Stderr, stderr, buffer.clone(), listener.clone())?;
    Ok(vec![out, err])
}

fn spawn_pump<R, L>(
    pane_id: PaneId,
    kind: StreamKind,
    reader: R,
    buffer: OutputBuffer,
    listener: L,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
    L: EventListener + Send + 'static,
{
    thread::Builder::new()
        .name(format!("pane-{pane_id}-{}", kind.name()))
        .spawn(move || pump(pane_id, kind, reader, &buffer, &listener))
}

/// Copy lines from `reader` into `buffer` until end of stream or an error.
///
/// A trailing line without a terminator is appended when the stream ends.
pub fn pump<R, L>(pane_id: PaneId, kind: StreamKind, reader: R, buffer: &OutputBuffer, listener: &L)
where
    R: Read,
    L: EventListener,
{
    let mut reader = BufReader::new(reader);
    let mut raw = Vec::with_capacity(256);
    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw) {
            Ok(0) => break,
            Ok(_) => {
                buffer.append(OutputLine::new(kind.line_kind(), strip_terminator(&raw)));
                if buffer.mark_pending() {
                    listener.send_event(SessionEvent::Output(pane_id));
                }
            },
            Err(err) => {
                debug!("{} of pane {pane_id} stopped: {err}", kind.name());
                break;
            },
        }
    }
}

/// Decode a raw line, dropping its `\n` or `\r\n` terminator.
fn strip_terminator(raw: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(raw).into_owned();
    while text.ends_with(['\n', '\r']) {
        text.pop();
    }
    text
}

fn wait_for_exit<L: EventListener>(
    pane_id: PaneId,
    control: Arc<Mutex<Control>>,
    pumps: Vec<JoinHandle<()>>,
    listener: L,
    drain_timeout: Duration,
) {
    let outcome = loop {
        if let Some(outcome) = control.lock().poll_exit() {
            break outcome;
        }
        thread::sleep(POLL_INTERVAL);
    };

    drain_pumps(pane_id, pumps, drain_timeout);

    info!("Pane {pane_id} finished: {outcome}");
    listener.send_event(SessionEvent::Finished(Completion { pane_id, outcome }));
}

/// Give the pumps a bounded time to append what is left in the pipes.
///
/// A pump can outlive its process when a detached grandchild keeps the pipe
/// open; such a pump is left running and the completion is posted anyway.
fn drain_pumps(pane_id: PaneId, pumps: Vec<JoinHandle<()>>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    for pump in pumps {
        while !pump.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        if pump.is_finished() {
            let _ = pump.join();
        } else {
            warn!("Output of pane {pane_id} still open after exit; detaching pump");
        }
    }
}

fn abort_control(control: &Mutex<Control>) {
    let mut control = control.lock();
    control.stdin = None;
    if let Some(mut child) = control.child.take() {
        abort_child(&mut child);
    }
}

fn abort_child(child: &mut Child) {
    kill_tree(child);
    let _ = child.wait();
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    // The child leads its own process group, see `SpawnRequest::command`.
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: plain syscall; the child has not been reaped, so its process
        // group id cannot have been recycled.
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
}

#[cfg(windows)]
fn kill_tree(child: &mut Child) {
    let _ = Command::new("taskkill")
        .args(["/F", "/T", "/PID", &child.id().to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    let _ = child.kill();
}
