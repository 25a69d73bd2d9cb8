// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `controller.rs`

#[cfg(test)]
mod tests {
    use crate::controller::*;
    use crate::crd::{CephRBDMirror, RBDMirroringSpec};
    use crate::errors::Requeue;
    use kube::runtime::controller::Action;
    use std::time::Duration;

    #[test]
    fn test_failure_key() {
        let mut mirror = CephRBDMirror::new("mirror", RBDMirroringSpec::default());
        mirror.metadata.namespace = Some("rook-ceph".to_string());
        assert_eq!(failure_key(&mirror), "CephRBDMirror/rook-ceph/mirror");
    }

    #[test]
    fn test_validation_is_not_requeued() {
        assert_eq!(requeue_action(Requeue::Never, 4), Action::await_change());
    }

    #[test]
    fn test_precondition_uses_fixed_delay() {
        assert_eq!(
            requeue_action(Requeue::After(Duration::from_secs(10)), 7),
            Action::requeue(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_backoff_grows_with_failures() {
        assert_eq!(
            requeue_action(Requeue::Backoff, 1),
            Action::requeue(Duration::from_secs(5))
        );
        assert_eq!(
            requeue_action(Requeue::Backoff, 3),
            Action::requeue(Duration::from_secs(20))
        );
        assert_eq!(
            requeue_action(Requeue::Backoff, 30),
            Action::requeue(Duration::from_secs(300))
        );
    }

    #[test]
    fn test_panic_message_from_str_and_string() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let code = 42;
        let payload = std::panic::catch_unwind(|| panic!("failed with {code}")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "failed with 42");
    }

    #[test]
    fn test_panic_message_unknown_payload() {
        let payload = std::panic::catch_unwind(|| std::panic::panic_any(7_u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
