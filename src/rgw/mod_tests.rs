// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::exec::CommandError;
    use crate::rgw::*;
    use crate::testing::FakeExecutor;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USER_JSON: &str = r#"{"user_id":"app","display_name":"app","keys":[{"access_key":"AK","secret_key":"SK"}]}"#;

    fn admin(fake: &Arc<FakeExecutor>) -> CliRgwAdmin {
        CliRgwAdmin::new(fake.clone())
    }

    fn store() -> StoreRef {
        StoreRef::new("rook-ceph", "my-store")
    }

    #[tokio::test]
    async fn test_every_call_is_scoped_to_the_store() {
        let fake = Arc::new(FakeExecutor::new());
        fake.respond("radosgw-admin user info", USER_JSON);
        admin(&fake).get_user(&store(), "app").await.unwrap();

        assert_eq!(
            fake.calls(),
            vec![
                "radosgw-admin user info --uid=app --rgw-realm=my-store \
                 --rgw-zonegroup=my-store --rgw-zone=my-store"
                    .to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_user_is_none() {
        let fake = Arc::new(FakeExecutor::new());
        fake.fail("radosgw-admin user info", 2);
        assert!(admin(&fake).get_user(&store(), "app").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_other_failures_propagate() {
        let fake = Arc::new(FakeExecutor::new());
        fake.fail("radosgw-admin user info", 5);
        assert!(admin(&fake).get_user(&store(), "app").await.is_err());
    }

    #[tokio::test]
    async fn test_create_existing_user_returns_live_user() {
        let fake = Arc::new(FakeExecutor::new());
        fake.fail("radosgw-admin user create", 17)
            .respond("radosgw-admin user info", USER_JSON);
        let params = UserParams {
            uid: "app".into(),
            display_name: "app".into(),
            op_mask: Some("read".into()),
            max_buckets: Some(5),
        };
        let user = admin(&fake).create_user(&store(), &params).await.unwrap();
        assert_eq!(user.keys, vec![S3Key::new("AK", "SK")]);

        let create = &fake.calls_matching("radosgw-admin user create")[0];
        assert!(create.contains("--display-name=app"));
        assert!(create.contains("--op-mask=read"));
        assert!(create.contains("--max-buckets=5"));
    }

    #[tokio::test]
    async fn test_remove_missing_key_is_success() {
        let fake = Arc::new(FakeExecutor::new());
        fake.fail("radosgw-admin key rm", 2);
        admin(&fake)
            .remove_key(&store(), "app", "AK")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_generated_key_uses_gen_flags() {
        let fake = Arc::new(FakeExecutor::new());
        fake.respond("radosgw-admin key create", USER_JSON);
        admin(&fake).create_key(&store(), "app", None).await.unwrap();
        let call = &fake.calls()[0];
        assert!(call.contains("--gen-access-key --gen-secret"));
        assert!(!call.contains("--access-key="));
    }

    #[tokio::test]
    async fn test_empty_caps_run_nothing() {
        let fake = Arc::new(FakeExecutor::new());
        admin(&fake).add_caps(&store(), "app", &[]).await.unwrap();
        admin(&fake).remove_caps(&store(), "app", &[]).await.unwrap();
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_quota_is_set_then_enabled() {
        let fake = Arc::new(FakeExecutor::new());
        let quota = QuotaParams {
            max_size: Some(1024),
            max_objects: None,
        };
        admin(&fake).set_quota(&store(), "app", &quota).await.unwrap();
        let calls = fake.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("radosgw-admin quota set --quota-scope=user --uid=app --max-size=1024"));
        assert!(calls[1].starts_with("radosgw-admin quota enable"));
    }

    const ADMIN_OPS_JSON: &str = r#"{"user_id":"rgw-admin-ops-user","keys":[{"access_key":"OPS","secret_key":"OPSSECRET"}]}"#;

    const CREATE_TOPIC_RESPONSE: &str = "<CreateTopicResponse xmlns=\"https://sns.amazonaws.com/doc/2010-03-31/\">\
        <CreateTopicResult><TopicArn>arn:aws:sns:my-store::t</TopicArn></CreateTopicResult>\
        </CreateTopicResponse>";

    fn topic_params() -> TopicParams {
        TopicParams {
            name: "t".into(),
            attributes: BTreeMap::from([("push-endpoint".to_string(), "http://h".to_string())]),
        }
    }

    #[tokio::test]
    async fn test_put_topic_posts_create_topic_to_store_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("content-type", sns::FORM_CONTENT_TYPE))
            .and(header_exists("date"))
            .and(body_string_contains("Action=CreateTopic"))
            .and(body_string_contains("Name=t"))
            .and(body_string_contains("Attributes.entry.1.key=push-endpoint"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CREATE_TOPIC_RESPONSE))
            .expect(1)
            .mount(&server)
            .await;

        let fake = Arc::new(FakeExecutor::new());
        fake.respond("radosgw-admin user create --uid=rgw-admin-ops-user", ADMIN_OPS_JSON);
        let store = store().with_endpoint(&server.uri());

        let arn = admin(&fake).put_topic(&store, &topic_params()).await.unwrap();
        assert_eq!(arn, "arn:aws:sns:my-store::t");

        let requests = server.received_requests().await.unwrap();
        let authorization = requests[0].headers.get("authorization").unwrap().to_str().unwrap();
        assert!(authorization.starts_with("AWS OPS:"));
        assert!(fake
            .calls_matching("radosgw-admin user create --uid=rgw-admin-ops-user")[0]
            .contains("--caps=buckets=*;users=*;usage=read;metadata=read;zone=read"));
        assert!(fake.calls_matching("radosgw-admin topic").is_empty());
    }

    #[tokio::test]
    async fn test_put_topic_reuses_existing_admin_ops_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CREATE_TOPIC_RESPONSE))
            .mount(&server)
            .await;

        let fake = Arc::new(FakeExecutor::new());
        fake.fail("radosgw-admin user create", 17);
        fake.respond("radosgw-admin user info --uid=rgw-admin-ops-user", ADMIN_OPS_JSON);
        let store = store().with_endpoint(&server.uri());

        let arn = admin(&fake).put_topic(&store, &topic_params()).await.unwrap();
        assert_eq!(arn, "arn:aws:sns:my-store::t");
    }

    #[tokio::test]
    async fn test_put_topic_surfaces_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("<Error><Code>AccessDenied</Code></Error>"))
            .mount(&server)
            .await;

        let fake = Arc::new(FakeExecutor::new());
        fake.respond("radosgw-admin user create", ADMIN_OPS_JSON);
        let store = store().with_endpoint(&server.uri());

        let err = admin(&fake).put_topic(&store, &topic_params()).await.unwrap_err();
        assert!(matches!(err, CommandError::Http { status: Some(403), .. }));
    }

    #[tokio::test]
    async fn test_put_topic_without_endpoint_fails() {
        let fake = Arc::new(FakeExecutor::new());
        let err = admin(&fake).put_topic(&store(), &topic_params()).await.unwrap_err();
        assert!(matches!(err, CommandError::Http { status: None, .. }));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_topic_is_success() {
        let fake = Arc::new(FakeExecutor::new());
        fake.fail("radosgw-admin topic rm", 2);
        admin(&fake).delete_topic(&store(), "t").await.unwrap();
    }
}
