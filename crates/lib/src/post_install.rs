//! Post-install symlinks.
//!
//! Turns a [`PostInstall`] declaration into the `sh` script run against the
//! staged root after packages are installed. Entries are emitted sorted by
//! source path, so the same declaration always yields the same script.

use crate::spec::PostInstall;
use crate::util::path::join_rooted;
use crate::util::shell::{QuoteError, quote};

/// One `ln -s` statement per declared symlink.
///
/// The link is created at the declared path rooted under `staging`; the
/// source is written as declared.
pub fn symlink_statements(post: &PostInstall, staging: &str) -> Result<Vec<String>, QuoteError> {
  post
    .symlinks
    .iter()
    .map(|(src, tgt)| {
      let link = join_rooted(staging, &tgt.path);
      Ok(format!("ln -s {} {}", quote(src)?, quote(&link)?))
    })
    .collect()
}

/// The complete symlink script, or `None` when there is nothing to link.
pub fn symlink_script(post: Option<&PostInstall>, staging: &str) -> Result<Option<String>, QuoteError> {
  let Some(post) = post.filter(|p| !p.is_empty()) else {
    return Ok(None);
  };

  let mut lines = vec!["set -ex".to_string(), format!("cd {}", quote(staging)?)];
  lines.extend(symlink_statements(post, staging)?);
  lines.push(String::new());
  Ok(Some(lines.join("\n")))
}
