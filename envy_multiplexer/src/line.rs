//! Parsing of submitted input lines into built-ins or external commands.

/// Names of all built-in commands, used for completion.
pub const BUILTIN_NAMES: [&str; 13] = [
    "help", "env", "set", "unset", "switch", "new", "open", "cd", "pwd", "exit", "quit", "clear",
    "cls",
];

/// Alias accepted for `clear`.
const CLEAR_ALIAS: &str = "cls";

/// Commands handled by the controller without spawning a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Builtin {
    /// `exit` / `quit`.
    Exit,
    /// `clear` / `cls`.
    Clear,
    /// `cd [DIR]`; `None` means the home directory.
    Cd(Option<String>),
    /// `pwd`.
    Pwd,
    /// `open`: reveal the profile folder.
    Open,
    /// `env`: list the active profile's variables.
    Env,
    /// `set KEY VALUE...`; the value is the remaining words joined by spaces.
    Set { key: String, value: String },
    /// `unset KEY`.
    Unset(String),
    /// `switch NAME`.
    Switch(String),
    /// `new NAME`.
    New(String),
    /// `help`.
    Help,
}

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// A built-in command.
    Builtin(Builtin),
    /// A built-in invoked with missing arguments; carries the usage text.
    Usage(&'static str),
    /// Anything else, run as a child process.
    External {
        /// Program to run.
        program: String,
        /// Arguments for the program.
        args: Vec<String>,
    },
}

/// Errors produced while splitting a line into words.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error: {0}")]
pub struct ParseError(String);

/// Split `input` into words and classify it.
///
/// Returns `Ok(None)` for blank input.
pub fn parse(input: &str) -> Result<Option<Invocation>, ParseError> {
    let words = shell_words::split(input).map_err(|e| ParseError(e.to_string()))?;
    let Some((cmd, args)) = words.split_first() else {
        return Ok(None);
    };

    let invocation = match cmd.as_str() {
        "exit" | "quit" => Invocation::Builtin(Builtin::Exit),
        "clear" | CLEAR_ALIAS => Invocation::Builtin(Builtin::Clear),
        "cd" => Invocation::Builtin(Builtin::Cd(args.first().cloned())),
        "pwd" => Invocation::Builtin(Builtin::Pwd),
        "open" => Invocation::Builtin(Builtin::Open),
        "env" => Invocation::Builtin(Builtin::Env),
        "help" => Invocation::Builtin(Builtin::Help),
        "set" => match args {
            [key, rest @ ..] if !rest.is_empty() => {
                Invocation::Builtin(Builtin::Set { key: key.clone(), value: rest.join(" ") })
            },
            _ => Invocation::Usage("Usage: set KEY VALUE"),
        },
        "unset" => match args.first() {
            Some(key) => Invocation::Builtin(Builtin::Unset(key.clone())),
            None => Invocation::Usage("Usage: unset KEY"),
        },
        "switch" => match args.first() {
            Some(name) => Invocation::Builtin(Builtin::Switch(name.clone())),
            None => Invocation::Usage("Usage: switch <profile>"),
        },
        "new" => match args.first() {
            Some(name) => Invocation::Builtin(Builtin::New(name.clone())),
            None => Invocation::Usage("Usage: new <name>"),
        },
        _ => Invocation::External { program: cmd.clone(), args: args.to_vec() },
    };
    Ok(Some(invocation))
}
