//! End-to-end delivery tests
//!
//! A real `Notifier` with the HTTP transport, pointed at a WireMock server.
//! Most sends run on tokio's blocking pool; one calls the synchronous
//! `notify` straight from a spawned task, the way a request hook would.

use std::fmt;

use honeybadger_core::{context, ConfigOverrides, Configuration, Context, ErrorSource, Notifier};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug)]
struct ValueError(&'static str);

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for ValueError {}

#[derive(Debug)]
struct AttributeError(&'static str);

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for AttributeError {}

fn notifier_for(server: &MockServer, overrides: ConfigOverrides) -> Notifier {
    let base = Configuration::default().resolve(&ConfigOverrides {
        endpoint: Some(server.uri()),
        timeout_secs: Some(5),
        ..Default::default()
    });
    Notifier::new(base.resolve(&overrides))
}

async fn mount_accepting(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/notices/"))
        .and(header("X-API-Key", "aaa"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"error": {"token": token}})))
        .mount(server)
        .await;
}

async fn bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_forced_report_posts_one_notice() {
    let server = MockServer::start().await;
    mount_accepting(&server, "f3c1d6a0").await;

    let notifier = notifier_for(
        &server,
        ConfigOverrides {
            api_key: Some("aaa".to_string()),
            force_report_data: Some(true),
            ..Default::default()
        },
    );

    let id = tokio::task::spawn_blocking(move || {
        let ctx: Context = serde_json::from_value(json!({"foo": "bar"})).unwrap();
        notifier.notify(ErrorSource::explicit("Exception", "Test message."), ctx)
    })
    .await
    .unwrap();

    assert_eq!(id.as_deref(), Some("f3c1d6a0"));

    let bodies = bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["request"]["context"], json!({"foo": "bar"}));
    assert_eq!(bodies[0]["error"]["class"], "Exception");
    assert_eq!(bodies[0]["error"]["message"], "Test message.");
    assert!(bodies[0].get("api_key").is_none());
}

#[tokio::test]
async fn test_development_environment_never_hits_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let notifier = notifier_for(
        &server,
        ConfigOverrides {
            api_key: Some("aaa".to_string()),
            ..Default::default()
        },
    );

    let id = tokio::task::spawn_blocking(move || {
        notifier.notify(ErrorSource::explicit("Exception", "Test message."), Context::new())
    })
    .await
    .unwrap();

    assert_eq!(id, None);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_excluded_exceptions_skip_delivery() {
    let server = MockServer::start().await;
    mount_accepting(&server, "t").await;

    let notifier = notifier_for(
        &server,
        ConfigOverrides {
            api_key: Some("aaa".to_string()),
            force_report_data: Some(true),
            excluded_exceptions: Some(vec!["ValueError".to_string()]),
            ..Default::default()
        },
    );

    tokio::task::spawn_blocking(move || {
        assert_eq!(notifier.notify_error(&ValueError("x")), None);
        notifier.notify_error(&AttributeError("y"));
    })
    .await
    .unwrap();

    let bodies = bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["error"]["class"], "AttributeError");
    assert_eq!(bodies[0]["error"]["message"], "y");
}

#[tokio::test]
async fn test_store_and_call_site_context_are_merged() {
    let server = MockServer::start().await;
    mount_accepting(&server, "t").await;

    let notifier = notifier_for(
        &server,
        ConfigOverrides {
            api_key: Some("aaa".to_string()),
            environment: Some("production".to_string()),
            ..Default::default()
        },
    );

    tokio::task::spawn_blocking(move || {
        context::clear();
        context::set([("foo", "bar")]);
        let ctx: Context = serde_json::from_value(json!({"bar": "foo"})).unwrap();
        notifier.notify(ErrorSource::explicit("Exception", "Test."), ctx);
        context::clear();
    })
    .await
    .unwrap();

    let bodies = bodies(&server).await;
    assert_eq!(
        bodies[0]["request"]["context"],
        json!({"foo": "bar", "bar": "foo"})
    );
}

#[tokio::test]
async fn test_server_error_is_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = notifier_for(
        &server,
        ConfigOverrides {
            api_key: Some("aaa".to_string()),
            force_report_data: Some(true),
            ..Default::default()
        },
    );

    // exactly one attempt, no retry
    let id = tokio::task::spawn_blocking(move || {
        notifier.notify(ErrorSource::message("x"), Context::new())
    })
    .await
    .unwrap();

    assert_eq!(id, None);
}

#[tokio::test]
async fn test_notify_async_delivers_from_runtime() {
    let server = MockServer::start().await;
    mount_accepting(&server, "async-token").await;

    let notifier = notifier_for(
        &server,
        ConfigOverrides {
            api_key: Some("aaa".to_string()),
            force_report_data: Some(true),
            ..Default::default()
        },
    );

    let id = context::scope(async {
        context::set([("job", "import")]);
        notifier
            .notify_async(ErrorSource::message("async failure"), Context::new())
            .await
    })
    .await;

    assert_eq!(id.as_deref(), Some("async-token"));
    let bodies = bodies(&server).await;
    assert_eq!(bodies[0]["request"]["context"], json!({"job": "import"}));

    // the blocking client was created on the blocking pool; drop it there too
    tokio::task::spawn_blocking(move || drop(notifier)).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sync_notify_from_async_task_delivers() {
    let server = MockServer::start().await;
    mount_accepting(&server, "from-task").await;

    let notifier = notifier_for(
        &server,
        ConfigOverrides {
            api_key: Some("aaa".to_string()),
            force_report_data: Some(true),
            ..Default::default()
        },
    );

    let handler = notifier.clone();
    let id = tokio::spawn(async move {
        context::scope(async move {
            context::set([("route", "/checkout")]);
            handler.notify(ErrorSource::explicit("Exception", "x"), Context::new())
        })
        .await
    })
    .await
    .unwrap();

    assert_eq!(id.as_deref(), Some("from-task"));
    let bodies = bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["error"]["class"], "Exception");
    assert_eq!(bodies[0]["request"]["context"], json!({"route": "/checkout"}));

    tokio::task::spawn_blocking(move || drop(notifier)).await.unwrap();
}
