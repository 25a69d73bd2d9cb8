// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ceph release versions.
//!
//! Versions are compared component-wise (`major`, `minor`, `extra`, `build`). Three textual
//! forms are understood:
//!
//! - status form `20.2.1-5` as recorded in `.status.cephx.*.keyCephVersion`
//! - daemon form `ceph version 20.2.1 (<sha>) tentacle (stable)` as reported by `ceph versions`
//! - image tag form `quay.io/ceph/ceph:v20.2.1` or `...:v20.2.1-20250101`

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors raised while parsing a Ceph version string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Version string does not have the expected shape
    #[error("failed to parse ceph version {input:?}: {reason}")]
    Malformed {
        /// The string that was parsed
        input: String,
        /// What was wrong with it
        reason: String,
    },

    /// `ceph versions` output contained no mon daemons
    #[error("no mon versions reported by the cluster")]
    NoMonVersions,
}

/// A Ceph release version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CephVersion {
    pub major: u32,
    pub minor: u32,
    pub extra: u32,
    pub build: u32,
}

/// First release whose daemons support cephx key rotation.
pub const KEY_ROTATION_MIN_VERSION: CephVersion = CephVersion::new(20, 2, 0, 0);

impl CephVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32, extra: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            extra,
            build,
        }
    }

    /// Parses the status form `MAJOR.MINOR.EXTRA-BUILD`. All four parts are required.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::Malformed`] if any part is missing or not a number.
    pub fn parse_status(input: &str) -> Result<Self, VersionError> {
        let malformed = |reason: &str| VersionError::Malformed {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (release, build) = input
            .split_once('-')
            .ok_or_else(|| malformed("missing build suffix"))?;
        let parts: Vec<&str> = release.split('.').collect();
        if parts.len() != 3 {
            return Err(malformed("expected MAJOR.MINOR.EXTRA"));
        }

        let num = |s: &str| s.parse::<u32>().map_err(|_| malformed("non-numeric component"));
        Ok(Self::new(num(parts[0])?, num(parts[1])?, num(parts[2])?, num(build)?))
    }

    /// Parses the daemon form reported by `ceph version` / `ceph versions`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::Malformed`] if no `X.Y.Z` token follows `ceph version`.
    pub fn parse_daemon(input: &str) -> Result<Self, VersionError> {
        let token = input
            .trim()
            .strip_prefix("ceph version ")
            .and_then(|rest| rest.split_whitespace().next())
            .ok_or_else(|| VersionError::Malformed {
                input: input.to_string(),
                reason: "expected 'ceph version X.Y.Z'".to_string(),
            })?;
        Self::parse_release(token, input)
    }

    /// Parses the tag of a container image reference (`repo/ceph:v20.2.1-20250101`).
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::Malformed`] if the image has no tag or the tag does not start
    /// with a release number.
    pub fn parse_image(image: &str) -> Result<Self, VersionError> {
        let without_digest = image.split('@').next().unwrap_or(image);
        let tag = without_digest
            .rsplit_once(':')
            .map(|(_, tag)| tag)
            .filter(|tag| !tag.contains('/'))
            .ok_or_else(|| VersionError::Malformed {
                input: image.to_string(),
                reason: "image has no tag".to_string(),
            })?;
        let tag = tag.strip_prefix('v').unwrap_or(tag);
        let release = tag.split('-').next().unwrap_or(tag);
        Self::parse_release(release, image)
    }

    fn parse_release(token: &str, input: &str) -> Result<Self, VersionError> {
        let malformed = |reason: &str| VersionError::Malformed {
            input: input.to_string(),
            reason: reason.to_string(),
        };
        let (release, build) = match token.split_once('-') {
            Some((release, build)) => (release, build.parse::<u32>().unwrap_or(0)),
            None => (token, 0),
        };
        let parts: Vec<&str> = release.split('.').collect();
        if parts.len() != 3 {
            return Err(malformed("expected MAJOR.MINOR.EXTRA"));
        }
        let num = |s: &str| s.parse::<u32>().map_err(|_| malformed("non-numeric component"));
        Ok(Self::new(num(parts[0])?, num(parts[1])?, num(parts[2])?, build))
    }

    /// Returns `true` if `self >= other` ignoring the build number.
    #[must_use]
    pub fn is_at_least(&self, other: &CephVersion) -> bool {
        (self.major, self.minor, self.extra) >= (other.major, other.minor, other.extra)
    }

    /// Returns `true` if daemons of this release can rotate their cephx keys.
    #[must_use]
    pub fn supports_key_rotation(&self) -> bool {
        self.is_at_least(&KEY_ROTATION_MIN_VERSION)
    }
}

impl fmt::Display for CephVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}-{}",
            self.major, self.minor, self.extra, self.build
        )
    }
}

#[derive(Debug, Deserialize)]
struct DaemonVersions {
    #[serde(default)]
    mon: BTreeMap<String, u32>,
}

/// Returns the least up-to-date version among the mons in `ceph versions` JSON output.
///
/// # Errors
///
/// Returns an error if the JSON cannot be parsed, no mon is listed, or a version string
/// is malformed.
pub fn least_mon_version(versions_json: &str) -> anyhow::Result<CephVersion> {
    let versions: DaemonVersions = serde_json::from_str(versions_json)?;
    let mut least: Option<CephVersion> = None;
    for raw in versions.mon.keys() {
        let parsed = CephVersion::parse_daemon(raw)?;
        least = Some(match least {
            Some(current) if current <= parsed => current,
            _ => parsed,
        });
    }
    least.ok_or_else(|| VersionError::NoMonVersions.into())
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod version_tests;
