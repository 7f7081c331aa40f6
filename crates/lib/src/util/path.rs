//! Path helpers for paths that live inside the worker, not on the host.

/// Join `path` under `root`, treating `path` as rooted at `root` even when it is absolute.
///
/// Empty and `.` components are dropped; `..` never escapes `root`.
pub fn join_rooted(root: &str, path: &str) -> String {
  let mut parts: Vec<&str> = root.split('/').filter(|p| !p.is_empty() && *p != ".").collect();
  let floor = parts.len();

  for component in path.split('/') {
    match component {
      "" | "." => {}
      ".." => {
        if parts.len() > floor {
          parts.pop();
        }
      }
      c => parts.push(c),
    }
  }

  format!("/{}", parts.join("/"))
}
