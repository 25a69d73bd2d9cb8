// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::config::cluster_secret::MonEndpoint;
    use crate::exec::CliExecutor;
    use crate::reconcilers::cluster::ClusterInfo;
    use crate::reconcilers::cluster_config::*;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;

    const FSID: &str = "b3c1f0de-5f4b-4a0c-9f2e-1a2b3c4d5e6f";

    fn mons() -> Vec<MonEndpoint> {
        vec![
            MonEndpoint {
                name: "a".into(),
                ip: "10.0.0.1".into(),
                port: 6789,
            },
            MonEndpoint {
                name: "b".into(),
                ip: "10.0.0.2".into(),
                port: 6790,
            },
        ]
    }

    fn info(secret: &str) -> ClusterInfo {
        ClusterInfo {
            fsid: FSID.into(),
            admin_secret: secret.into(),
        }
    }

    #[test]
    fn test_render_config() {
        assert_eq!(
            render_config(FSID, &mons()),
            format!(
                "[global]\nfsid = {FSID}\nmon_host = [v2:10.0.0.1:3300,v1:10.0.0.1:6789],v1:10.0.0.2:6790\nmon_initial_members = a,b\n"
            )
        );
    }

    #[tokio::test]
    async fn test_write_connection_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = CliExecutor::new(dir.path(), Duration::from_secs(15));

        assert!(write_connection_files(&paths, "rook-ceph", &info("AQAadmin=="), &mons())
            .await
            .unwrap());

        let config = std::fs::read_to_string(paths.config_path("rook-ceph")).unwrap();
        assert!(config.contains(&format!("fsid = {FSID}")));
        let keyring_path = paths.keyring_path("rook-ceph");
        let keyring = std::fs::read_to_string(&keyring_path).unwrap();
        assert!(keyring.contains("key = AQAadmin=="));
        let mode = std::fs::metadata(&keyring_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(keyring_path.starts_with(dir.path().join("rook-ceph")));
    }

    #[tokio::test]
    async fn test_write_connection_files_only_reports_changes() {
        let dir = tempfile::tempdir().unwrap();
        let paths = CliExecutor::new(dir.path(), Duration::from_secs(15));

        write_connection_files(&paths, "rook-ceph", &info("AQAone=="), &mons())
            .await
            .unwrap();
        assert!(!write_connection_files(&paths, "rook-ceph", &info("AQAone=="), &mons())
            .await
            .unwrap());
        assert!(write_connection_files(&paths, "rook-ceph", &info("AQAtwo=="), &mons())
            .await
            .unwrap());
        let keyring = std::fs::read_to_string(paths.keyring_path("rook-ceph")).unwrap();
        assert!(keyring.contains("AQAtwo=="));
    }

    #[tokio::test]
    async fn test_remove_connection_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = CliExecutor::new(dir.path(), Duration::from_secs(15));

        // nothing written yet
        remove_connection_files(&paths, "rook-ceph").await.unwrap();

        write_connection_files(&paths, "rook-ceph", &info("AQAone=="), &mons())
            .await
            .unwrap();
        remove_connection_files(&paths, "rook-ceph").await.unwrap();
        assert!(!paths.cluster_dir("rook-ceph").exists());
    }
}
