//! Tab completion for the command line.

use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::Path;

use envy_multiplexer::line::BUILTIN_NAMES;

/// Maximum number of candidates offered for the first word.
pub const MAX_CANDIDATES: usize = 50;

/// Minimum prefix length before `PATH` is searched.
const MIN_PATH_PREFIX: usize = 2;

/// What completion can draw on.
#[derive(Debug, Clone, Copy)]
pub struct Sources<'a> {
    /// Known profile names.
    pub profiles: &'a [String],
    /// Variables of the active profile.
    pub vars: &'a BTreeMap<String, String>,
    /// Directory relative paths are completed in.
    pub cwd: &'a Path,
}

/// Candidate cycling state, reset by any key other than Tab.
#[derive(Debug, Default)]
pub struct Completer {
    candidates: Vec<String>,
    index: usize,
}

impl Completer {
    /// Forget the current candidates.
    pub fn reset(&mut self) {
        self.candidates.clear();
        self.index = 0;
    }

    /// Next replacement for `input`, cycling through candidates on repeated
    /// calls.
    pub fn next(&mut self, input: &str, sources: &Sources<'_>) -> Option<&str> {
        if self.candidates.is_empty() {
            self.candidates = candidates(input, sources, env::var_os("PATH"));
            self.index = 0;
        } else {
            self.index = (self.index + 1) % self.candidates.len();
        }
        self.candidates.get(self.index).map(String::as_str)
    }
}

/// Complete `input`. Each candidate is the whole new input line.
pub fn candidates(input: &str, sources: &Sources<'_>, path_var: Option<OsString>) -> Vec<String> {
    let mut out = Candidates::default();
    if input.is_empty() {
        return out.0;
    }

    if !input.contains(' ') {
        for name in BUILTIN_NAMES.iter().filter(|name| name.starts_with(input)) {
            out.add(name.to_string());
        }
        if input.len() >= MIN_PATH_PREFIX {
            let lower = input.to_lowercase();
            for dir in path_var.iter().flat_map(env::split_paths) {
                for name in dir_entries(&dir, false) {
                    if name.to_lowercase().starts_with(&lower) {
                        out.add(name);
                    }
                }
                if out.0.len() >= MAX_CANDIDATES {
                    break;
                }
            }
        }
        out.0.truncate(MAX_CANDIDATES);
        return out.0;
    }

    let command = input.split_whitespace().next().unwrap_or_default();
    let last_arg = if input.ends_with(' ') {
        ""
    } else {
        input.split_whitespace().next_back().unwrap_or_default()
    };
    let prefix = &input[..input.len() - last_arg.len()];

    match command {
        "switch" => {
            for profile in sources.profiles.iter().filter(|p| p.starts_with(last_arg)) {
                out.add(format!("{prefix}{profile}"));
            }
        },
        "unset" => {
            for key in sources.vars.keys().filter(|k| k.starts_with(last_arg)) {
                out.add(format!("{prefix}{key}"));
            }
        },
        "cd" => {
            for name in dir_entries(sources.cwd, true) {
                if name.starts_with(last_arg) {
                    out.add(format!("{prefix}{name}"));
                }
            }
        },
        _ => {},
    }
    for name in dir_entries(sources.cwd, false) {
        if name.starts_with(last_arg) {
            out.add(format!("{prefix}{name}"));
        }
    }
    out.0
}

/// Ordered, de-duplicated candidate list.
#[derive(Default)]
struct Candidates(Vec<String>);

impl Candidates {
    fn add(&mut self, candidate: String) {
        if !candidate.is_empty() && !self.0.contains(&candidate) {
            self.0.push(candidate);
        }
    }
}

/// Sorted entry names of `dir`; only directories when `dirs_only` is set.
fn dir_entries(dir: &Path, dirs_only: bool) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| !dirs_only || entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn join_path(dirs: &[PathBuf]) -> Option<OsString> {
        env::join_paths(dirs).ok()
    }

    struct Fixture {
        dir: tempfile::TempDir,
        profiles: Vec<String>,
        vars: BTreeMap<String, String>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir(dir.path().join("src")).unwrap();
            fs::create_dir(dir.path().join("scripts")).unwrap();
            fs::write(dir.path().join("setup.sh"), "").unwrap();
            let mut vars = BTreeMap::new();
            vars.insert("API_URL".into(), "x".into());
            vars.insert("API_KEY".into(), "y".into());
            Self { dir, profiles: vec!["default".into(), "staging".into()], vars }
        }

        fn sources(&self) -> Sources<'_> {
            Sources { profiles: &self.profiles, vars: &self.vars, cwd: self.dir.path() }
        }
    }

    #[test]
    fn empty_input_has_no_candidates() {
        let f = Fixture::new();
        assert!(candidates("", &f.sources(), None).is_empty());
    }

    #[test]
    fn first_word_builtins() {
        let f = Fixture::new();
        assert_eq!(candidates("s", &f.sources(), None), ["set", "switch"]);
        assert_eq!(candidates("cl", &f.sources(), None), ["clear", "cls"]);
    }

    #[test]
    fn first_word_searches_path_case_insensitively() {
        let f = Fixture::new();
        let bin = tempfile::tempdir().unwrap();
        fs::write(bin.path().join("Swiftc"), "").unwrap();
        fs::write(bin.path().join("other"), "").unwrap();
        let path = join_path(&[bin.path().to_path_buf()]);

        assert_eq!(candidates("sw", &f.sources(), path.clone()), ["switch", "Swiftc"]);
        // A single character never searches PATH.
        assert_eq!(candidates("o", &f.sources(), path), ["open"]);
    }

    #[test]
    fn path_candidates_are_capped() {
        let f = Fixture::new();
        let bin = tempfile::tempdir().unwrap();
        for i in 0..80 {
            fs::write(bin.path().join(format!("tool{i:02}")), "").unwrap();
        }
        let path = join_path(&[bin.path().to_path_buf()]);
        assert_eq!(candidates("to", &f.sources(), path).len(), MAX_CANDIDATES);
    }

    #[test]
    fn switch_completes_profiles() {
        let f = Fixture::new();
        assert_eq!(candidates("switch st", &f.sources(), None), ["switch staging"]);
    }

    #[test]
    fn unset_completes_variables() {
        let f = Fixture::new();
        assert_eq!(candidates("unset API_", &f.sources(), None), ["unset API_KEY", "unset API_URL"]);
    }

    #[test]
    fn cd_prefers_directories_then_entries() {
        let f = Fixture::new();
        assert_eq!(
            candidates("cd s", &f.sources(), None),
            ["cd scripts", "cd src", "cd setup.sh"]
        );
    }

    #[test]
    fn trailing_space_lists_everything() {
        let f = Fixture::new();
        assert_eq!(
            candidates("cat ", &f.sources(), None),
            ["cat scripts", "cat setup.sh", "cat src"]
        );
    }

    #[test]
    fn completer_cycles_until_reset() {
        let f = Fixture::new();
        let mut completer = Completer::default();
        assert_eq!(completer.next("switch ", &f.sources()), Some("switch default"));
        assert_eq!(completer.next("switch default", &f.sources()), Some("switch staging"));
        assert_eq!(completer.next("switch staging", &f.sources()), Some("switch scripts"));
        completer.reset();
        assert_eq!(completer.next("switch st", &f.sources()), Some("switch staging"));
    }
}
