//! Environment propagation for remote-spawned processes
//!
//! Processes started through the control daemon do not inherit the
//! follower's environment, so the follower appends it to a shared
//! `key=value` file the daemon's login path reads.

use std::path::Path;

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use toporank_types::Result;
use tracing::{debug, warn};

/// Append `vars` to `path` as `key=value` lines, returning how many were
/// written. Entries that cannot be represented on one line are skipped.
pub async fn propagate_environment<I, K, V>(path: &Path, vars: I) -> Result<usize>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut buffer = String::new();
    let mut written = 0;
    for (key, value) in vars {
        let (key, value) = (key.as_ref(), value.as_ref());
        if key.is_empty() || key.contains(['=', '\n']) || value.contains('\n') {
            warn!(key, "Skipping environment variable that does not fit on one line");
            continue;
        }
        buffer.push_str(key);
        buffer.push('=');
        buffer.push_str(value);
        buffer.push('\n');
        written += 1;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(buffer.as_bytes()).await?;
    file.flush().await?;

    debug!(path = %path.display(), count = written, "Propagated environment");
    Ok(written)
}
