// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::exec::*;
    use crate::testing::FakeExecutor;
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Deserialize)]
    struct Quorum {
        quorum_names: Vec<String>,
    }

    fn failed(code: i32) -> CommandError {
        CommandError::Failed {
            command: "ceph auth get-or-create-key".into(),
            code: Some(code),
            stderr: String::new(),
        }
    }

    #[test]
    fn test_errno_predicates() {
        assert!(failed(17).is_exists());
        assert!(!failed(17).is_not_found());
        assert!(failed(2).is_not_found());
        assert_eq!(failed(5).errno(), Some(5));

        let timeout = CommandError::Timeout {
            command: "ceph status".into(),
            secs: 15,
        };
        assert_eq!(timeout.errno(), None);
        assert!(!timeout.is_exists());
    }

    #[test]
    fn test_connection_args_point_at_cluster_dir() {
        let cli = CliExecutor::new("/var/lib/rook", Duration::from_secs(15));
        assert_eq!(
            cli.connection_args("rook-ceph"),
            vec![
                "--cluster=rook-ceph",
                "--conf=/var/lib/rook/rook-ceph/rook-ceph.config",
                "--name=client.admin",
                "--keyring=/var/lib/rook/rook-ceph/client.admin.keyring",
                "--connect-timeout=15",
            ]
        );
    }

    #[tokio::test]
    async fn test_run_json_tolerates_unknown_fields() {
        let fake = FakeExecutor::new();
        fake.respond(
            "ceph quorum_status",
            r#"{"election_epoch": 3, "quorum_names": ["a", "b"], "extra": {}}"#,
        );
        let quorum: Quorum = run_json(&fake, "ns", "ceph", &args(&["quorum_status"]))
            .await
            .unwrap();
        assert_eq!(quorum.quorum_names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_run_json_reports_malformed_output() {
        let fake = FakeExecutor::new();
        fake.respond("ceph quorum_status", "not json");
        let err = run_json::<Quorum>(&fake, "ns", "ceph", &args(&["quorum_status"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Json { .. }));
    }

    #[tokio::test]
    async fn test_cli_spawn_failure_for_missing_binary() {
        let cli = CliExecutor::new("/nonexistent", Duration::from_secs(1));
        let err = cli
            .run("ns", "definitely-not-a-ceph-binary", &args(&["status"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }

    #[test]
    fn test_secret_arguments_are_redacted_in_command_line() {
        let line = crate::exec::describe(
            "radosgw-admin",
            &args(&["key", "create", "--access-key=AK", "--secret-key=SK"]),
        );
        assert_eq!(
            line,
            "radosgw-admin key create --access-key=*** --secret-key=***"
        );
    }
}
