// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `context.rs`

#[cfg(test)]
mod tests {
    use crate::constants::DEFAULT_NVMEOF_IMAGE;
    use crate::context::*;
    use std::time::Duration;

    #[test]
    fn test_failure_tracker_counts_per_key() {
        let tracker = FailureTracker::default();
        assert_eq!(tracker.count("CephRBDMirror/ns/a"), 0);
        assert_eq!(tracker.record("CephRBDMirror/ns/a"), 1);
        assert_eq!(tracker.record("CephRBDMirror/ns/a"), 2);
        assert_eq!(tracker.record("CephRBDMirror/ns/b"), 1);
        assert_eq!(tracker.count("CephRBDMirror/ns/a"), 2);
    }

    #[test]
    fn test_failure_tracker_reset() {
        let tracker = FailureTracker::default();
        tracker.record("key");
        tracker.record("key");
        tracker.reset("key");
        assert_eq!(tracker.count("key"), 0);
        assert_eq!(tracker.record("key"), 1);
    }

    #[test]
    fn test_failure_tracker_clones_share_counts() {
        let tracker = FailureTracker::default();
        let clone = tracker.clone();
        clone.record("key");
        assert_eq!(tracker.count("key"), 1);
    }

    #[test]
    fn test_default_settings() {
        let settings = OperatorSettings::default();
        assert_eq!(settings.nvmeof_default_image, DEFAULT_NVMEOF_IMAGE);
        assert_eq!(settings.ceph_command_timeout, Duration::from_secs(15));
        assert!(settings.watch_namespace.is_none());
    }
}
