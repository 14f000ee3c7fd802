use crate::error::{Error, Result};
use crate::types::{ToolVersion, VersionPolicy, VersionTriple};

/// Check a reported tool version against `policy`.
///
/// A tool that is not installed fails with [`Error::NotInstalled`] whatever
/// numbers it reports. Otherwise the version is compared lexicographically,
/// on `major.minor.patch` when `policy.gate_patch` is set and on
/// `major.minor` otherwise, and fails with [`Error::UnsupportedVersion`]
/// when it is below the minimum.
pub fn check(tool: &ToolVersion, policy: &VersionPolicy) -> Result<()> {
    if !tool.installed {
        return Err(Error::NotInstalled);
    }
    if gated(tool.version, policy) < gated(policy.minimum, policy) {
        return Err(Error::unsupported_version(tool.version, policy.minimum));
    }
    Ok(())
}

fn gated(version: VersionTriple, policy: &VersionPolicy) -> VersionTriple {
    if policy.gate_patch {
        version
    } else {
        VersionTriple::new(version.major, version.minor, 0)
    }
}
