//! Small helpers that talk to the host system.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};

use log::debug;

/// Current git branch of `dir`, if it is inside a repository.
pub fn git_branch(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .current_dir(dir)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|err| debug!("git unavailable: {err}"))
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let branch = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    (!branch.is_empty()).then_some(branch)
}

/// Open `dir` in the platform file manager without waiting for it.
pub fn open_folder(dir: &Path) -> io::Result<()> {
    let opener = if cfg!(windows) {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    Command::new(opener)
        .arg(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(drop)
}

/// Resolve a `cd` argument against `cwd`.
///
/// No argument means the home directory; a leading `~` is expanded.
pub fn resolve_dir(cwd: &Path, arg: Option<&str>, home: Option<&Path>) -> PathBuf {
    let target = match arg {
        None | Some("~") => return home.map_or_else(|| cwd.to_path_buf(), Path::to_path_buf),
        Some(arg) => match (arg.strip_prefix("~/"), home) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(arg),
        },
    };
    normalize(&cwd.join(target))
}

/// Collapse `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            },
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn resolve_relative_and_parent() {
        let cwd = Path::new("/work/project");
        assert_eq!(resolve_dir(cwd, Some("src"), None), PathBuf::from("/work/project/src"));
        assert_eq!(resolve_dir(cwd, Some(".."), None), PathBuf::from("/work"));
        assert_eq!(resolve_dir(cwd, Some("./a/../b"), None), PathBuf::from("/work/project/b"));
        assert_eq!(resolve_dir(cwd, Some("/etc"), None), PathBuf::from("/etc"));
    }

    #[test]
    #[cfg(unix)]
    fn resolve_home() {
        let cwd = Path::new("/work");
        let home = Path::new("/home/me");
        assert_eq!(resolve_dir(cwd, None, Some(home)), home);
        assert_eq!(resolve_dir(cwd, Some("~"), Some(home)), home);
        assert_eq!(resolve_dir(cwd, Some("~/src"), Some(home)), PathBuf::from("/home/me/src"));
        assert_eq!(resolve_dir(cwd, None, None), cwd);
    }

    #[test]
    fn git_branch_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(git_branch(dir.path()), None);
    }
}
