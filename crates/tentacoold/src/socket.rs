//! Unix socket ownership and permissions

use anyhow::{Context, Result};
use nix::unistd::{Gid, Group, Uid, User, chown};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::info;

/// Resolve the owner and group to set on the socket
///
/// Without a group the owner's primary group is used. A group may be a
/// name or a numeric gid.
pub fn resolve_ownership(
    owner: Option<&str>,
    group: Option<&str>,
) -> Result<(Option<Uid>, Option<Gid>)> {
    let user = match owner {
        Some(name) => Some(
            User::from_name(name)
                .with_context(|| format!("failed to look up user '{}'", name))?
                .with_context(|| format!("no such user '{}'", name))?,
        ),
        None => None,
    };

    let gid = match group {
        Some(group) => Some(resolve_group(group)?),
        None => user.as_ref().map(|user| user.gid),
    };

    Ok((user.map(|user| user.uid), gid))
}

fn resolve_group(group: &str) -> Result<Gid> {
    if let Ok(gid) = group.parse::<u32>() {
        return Ok(Gid::from_raw(gid));
    }
    let group_entry = Group::from_name(group)
        .with_context(|| format!("failed to look up group '{}'", group))?
        .with_context(|| format!("no such group '{}'", group))?;
    Ok(group_entry.gid)
}

/// Apply ownership and mode to the socket at `path`
pub fn secure(path: &Path, owner: Option<&str>, group: Option<&str>, mode: u32) -> Result<()> {
    let (uid, gid) = resolve_ownership(owner, group)?;
    if uid.is_some() || gid.is_some() {
        chown(path, uid, gid)
            .with_context(|| format!("failed to chown socket {}", path.display()))?;
    }

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("failed to chmod socket {}", path.display()))?;

    info!(
        "Socket {} secured (uid={:?} gid={:?} mode={:o})",
        path.display(),
        uid.map(Uid::as_raw),
        gid.map(Gid::as_raw),
        mode
    );
    Ok(())
}
