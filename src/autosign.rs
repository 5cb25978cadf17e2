//! Autosign policy engine: boolean short-circuit, executable script, or
//! whitelist file of exact names and glob patterns.

use std::env;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::settings::AutosignPolicy;

/// Decides whether `subject`'s CSR should be auto-signed.
///
/// `csr_pem` is handed to a script's stdin verbatim if the policy resolves
/// to a script; this function never needs to re-read it afterwards, but
/// the caller's copy must remain usable for signing regardless of the
/// outcome here (see the admission controller's re-readable CSR source).
pub fn should_autosign(
    policy: &AutosignPolicy,
    subject: &str,
    csr_pem: &[u8],
    load_path: &[String],
) -> bool {
    match policy {
        AutosignPolicy::Boolean(b) => *b,
        AutosignPolicy::Path(path) => {
            if !path.exists() {
                log::debug!(
                    "autosign path '{}' does not exist, not signing '{subject}'",
                    path.display()
                );
                return false;
            }
            if is_executable(path) {
                run_script(path, subject, csr_pem, load_path)
            } else {
                match fs::read_to_string(path) {
                    Ok(contents) => whitelist_matches(&contents, subject),
                    Err(e) => {
                        log::error!("failed to read autosign whitelist '{}': {e}", path.display());
                        false
                    }
                }
            }
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

fn run_script(script: &Path, subject: &str, csr_pem: &[u8], load_path: &[String]) -> bool {
    log::debug!("invoking autosign script '{}' for '{subject}'", script.display());

    let mut rubylib_parts: Vec<String> = Vec::new();
    if let Ok(existing) = env::var("RUBYLIB") {
        if !existing.is_empty() {
            rubylib_parts.push(existing);
        }
    }
    for entry in load_path {
        match fs::canonicalize(entry) {
            Ok(abs) => rubylib_parts.push(abs.display().to_string()),
            Err(_) => rubylib_parts.push(entry.clone()),
        }
    }
    let rubylib = env::join_paths(rubylib_parts.iter().map(String::as_str))
        .map(|os| os.to_string_lossy().into_owned())
        .unwrap_or_default();

    let child = Command::new(script)
        .arg(subject)
        .env("RUBYLIB", &rubylib)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match child {
        Ok(c) => c,
        Err(e) => {
            log::error!("failed to launch autosign script '{}': {e}", script.display());
            return false;
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(csr_pem) {
            log::warn!("failed writing CSR to autosign script stdin: {e}");
        }
    }

    match child.wait_with_output() {
        Ok(output) => {
            log::debug!(
                "autosign script '{}' stdout: {}",
                script.display(),
                String::from_utf8_lossy(&output.stdout)
            );
            log::debug!(
                "autosign script '{}' stderr: {}",
                script.display(),
                String::from_utf8_lossy(&output.stderr)
            );
            output.status.success()
        }
        Err(e) => {
            log::error!("autosign script '{}' failed: {e}", script.display());
            false
        }
    }
}

/// Applies whitelist matching to `contents`, line by line.
pub fn whitelist_matches(contents: &str, subject: &str) -> bool {
    contents.lines().any(|line| {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            return false;
        }
        if line.contains('#') || line.contains(' ') {
            log::error!("rejecting malformed autosign whitelist line: '{line}'");
            return false;
        }
        if line == "*" {
            return true;
        }
        if let Some(glob) = line.strip_prefix('*') {
            glob_matches_suffix(glob, subject)
        } else {
            line == subject
        }
    })
}

/// `glob_matches("*.foo.bar", "agent.foo.bar")`-style matching: lowercase
/// both, split on `.`, reverse, drop the glob's final (wildcard) label,
/// and require the reversed subject to start with what remains.
pub fn glob_matches(glob: &str, subject: &str) -> bool {
    let glob = glob.strip_prefix('*').unwrap_or(glob);
    glob_matches_suffix(glob, subject)
}

fn glob_matches_suffix(glob_suffix: &str, subject: &str) -> bool {
    let glob_lower = glob_suffix.to_lowercase();
    let subject_lower = subject.to_lowercase();

    let mut glob_labels: Vec<&str> = glob_lower.split('.').collect();
    // `glob_suffix` is everything after the leading `*`; a pattern like
    // `*.foo.bar` yields labels [".foo.bar"] split as ["", "foo", "bar"].
    // Drop the leading empty label produced by the leading '.'.
    if glob_labels.first() == Some(&"") {
        glob_labels.remove(0);
    }
    glob_labels.reverse();

    let mut subject_labels: Vec<&str> = subject_lower.split('.').collect();
    subject_labels.reverse();

    if glob_labels.len() > subject_labels.len() {
        return false;
    }
    subject_labels
        .iter()
        .take(glob_labels.len())
        .eq(glob_labels.iter())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_examples_from_spec() {
        assert!(glob_matches("*.foo.bar", "agent.foo.bar"));
        assert!(glob_matches("*.foo.bar", "x.y.foo.bar"));
        assert!(glob_matches("*.baz", "baz"));
        assert!(glob_matches("*.QUX", "0.1.qux"));
        assert!(!glob_matches("*.foo.bar", "foo.baz"));
    }

    #[test]
    fn whitelist_exact_and_wildcard_lines() {
        let list = "# comment\n*.example.com\nexact.host\n";
        assert!(whitelist_matches(list, "a.example.com"));
        assert!(whitelist_matches(list, "exact.host"));
        assert!(!whitelist_matches(list, "other.net"));
    }

    #[test]
    fn whitelist_rejects_lines_with_space_or_hash() {
        let list = "exact host\nexact#host\nexact.host\n";
        assert!(whitelist_matches(list, "exact.host"));
        assert!(!whitelist_matches(list, "exact host"));
        assert!(!whitelist_matches(list, "exact#host"));
    }

    #[test]
    fn whitelist_star_alone_matches_everything() {
        assert!(whitelist_matches("*\n", "anything.at.all"));
    }

    #[test]
    fn boolean_policy_short_circuits() {
        assert!(should_autosign(
            &AutosignPolicy::Boolean(true),
            "agent1",
            b"",
            &[]
        ));
        assert!(!should_autosign(
            &AutosignPolicy::Boolean(false),
            "agent1",
            b"",
            &[]
        ));
    }

    #[test]
    fn missing_path_policy_does_not_sign() {
        let policy = AutosignPolicy::Path("/nonexistent/autosign.conf".into());
        assert!(!should_autosign(&policy, "agent1", b"", &[]));
    }

    #[cfg(unix)]
    #[test]
    fn executable_script_exit_code_decides() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("autosign.sh");
        fs::write(
            &script,
            "#!/bin/sh\ncase \"$1\" in ok-*) exit 0;; *) exit 1;; esac\n",
        )
        .unwrap();
        let mut perms = fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script, perms).unwrap();

        let policy = AutosignPolicy::Path(script);
        assert!(should_autosign(&policy, "ok-node", b"csr-bytes", &[]));
        assert!(!should_autosign(&policy, "bad-node", b"csr-bytes", &[]));
    }
}
