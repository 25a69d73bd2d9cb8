// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `nvmeof/mod.rs`

#[cfg(test)]
mod tests {
    use crate::crd::CephNVMeOFGatewaySpec;
    use crate::errors::{ReconcileError, Requeue};
    use crate::reconcilers::nvmeof::*;

    fn spec(instances: i32, pool: &str, group: &str) -> CephNVMeOFGatewaySpec {
        CephNVMeOFGatewaySpec {
            instances,
            pool: pool.to_string(),
            group: group.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_accepts_complete_spec() {
        assert!(validate(&spec(1, "nvmeof", "group-a")).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_instances() {
        let err = validate(&spec(0, "nvmeof", "group-a")).unwrap_err();
        assert!(matches!(err, ReconcileError::Validation { .. }));
        assert_eq!(
            err.to_string(),
            "invalid configuration: at least one gateway instance is required"
        );
        assert_eq!(err.requeue(), Requeue::Never);
    }

    #[test]
    fn test_validate_rejects_missing_group_then_pool() {
        let err = validate(&spec(1, "", "")).unwrap_err();
        assert!(err.to_string().contains("gateway group name is required"));
        let err = validate(&spec(1, "", "group-a")).unwrap_err();
        assert!(err.to_string().contains("pool name is required"));
    }
}
