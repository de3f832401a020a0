use std::path::PathBuf;

use broom_core::{BROOM_CONFIG_FILE_NAME, DIALOG_TOKEN_PARAM};
use broom_server::{
    build_broom_router, build_server_state, BroomServerConfig, ROUTE_COMMAND, ROUTE_HEALTH,
};
use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

const CHANNEL_ID: &str = "c1";
const OWNER_ID: &str = "u1";
const OTHER_ID: &str = "u2";
const COMMAND_TOKEN: &str = "cmd-token";
const DIALOG_SECRET: &str = "dialog-secret";

struct BroomHarness {
    base_url: String,
    http: reqwest::Client,
    _config_dir: TempDir,
}

impl BroomHarness {
    async fn start(server: &MockServer, config_json: Option<&str>) -> Self {
        let config_dir = tempfile::tempdir().expect("tempdir");
        let config_path: PathBuf = config_dir.path().join(BROOM_CONFIG_FILE_NAME);
        if let Some(raw) = config_json {
            std::fs::write(&config_path, raw).expect("write broom config");
        }
        let config = BroomServerConfig {
            bind: "127.0.0.1:0".to_string(),
            public_url: "https://broom.example.com".to_string(),
            api_base: server.base_url(),
            access_token: "bot-token".to_string(),
            command_token: Some(COMMAND_TOKEN.to_string()),
            dialog_secret: DIALOG_SECRET.to_string(),
            config_path,
            request_timeout_ms: 5_000,
        };
        config.validate().expect("valid server config");
        let state = build_server_state(&config).expect("server state");

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, build_broom_router(state)).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            http: reqwest::Client::new(),
            _config_dir: config_dir,
        }
    }

    async fn command(&self, text: &str) -> Value {
        let response = self
            .http
            .post(format!("{}{ROUTE_COMMAND}", self.base_url))
            .form(&[
                ("channel_id", CHANNEL_ID),
                ("user_id", OWNER_ID),
                ("trigger_id", "trig-1"),
                ("command", "/broom"),
                ("text", text),
                ("token", COMMAND_TOKEN),
            ])
            .send()
            .await
            .expect("command request");
        assert_eq!(response.status().as_u16(), 200);
        response.json::<Value>().await.expect("command response json")
    }

    async fn dialog(&self, route: &str, token: Option<&str>, body: Value) -> u16 {
        let mut request = self.http.post(format!("{}{route}", self.base_url));
        if let Some(token) = token {
            request = request.query(&[(DIALOG_TOKEN_PARAM, token)]);
        }
        request
            .json(&body)
            .send()
            .await
            .expect("dialog request")
            .status()
            .as_u16()
    }
}

fn mock_channel(server: &MockServer, total_msg_count: i64) {
    server.mock(|when, then| {
        when.method(GET).path(format!("/api/v4/channels/{CHANNEL_ID}"));
        then.status(200).json_body(json!({
            "id": CHANNEL_ID,
            "team_id": "t1",
            "total_msg_count": total_msg_count
        }));
    });
}

fn mock_permissions(server: &MockServer, permissions: Value) {
    server.mock(|when, then| {
        when.method(GET).path(format!("/api/v4/users/{OWNER_ID}"));
        then.status(200)
            .json_body(json!({ "id": OWNER_ID, "username": "alice", "roles": "system_user" }));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("/api/v4/teams/t1/members/{OWNER_ID}"));
        then.status(200).json_body(json!({ "roles": "team_user" }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("/api/v4/channels/{CHANNEL_ID}/members/{OWNER_ID}"));
        then.status(200).json_body(json!({ "roles": "channel_user" }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/api/v4/roles/names");
        then.status(200)
            .json_body(json!([{ "name": "channel_user", "permissions": permissions }]));
    });
}

/// Newest first, as the platform lists them.
fn mock_latest_posts<'a>(server: &'a MockServer, per_page: u32, posts: &[(&str, &str)]) -> Mock<'a> {
    let order = posts.iter().map(|(id, _)| *id).collect::<Vec<_>>();
    let entries = posts
        .iter()
        .enumerate()
        .map(|(index, (id, author))| {
            (
                id.to_string(),
                json!({
                    "id": id,
                    "channel_id": CHANNEL_ID,
                    "user_id": author,
                    "create_at": 1_000 - index as i64,
                }),
            )
        })
        .collect::<serde_json::Map<String, Value>>();
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("/api/v4/channels/{CHANNEL_ID}/posts"))
            .query_param("per_page", per_page.to_string());
        then.status(200)
            .json_body(json!({ "order": order, "posts": entries }));
    })
}

fn mock_deletes<'a>(server: &'a MockServer, post_ids: &[&str]) -> Vec<Mock<'a>> {
    post_ids
        .iter()
        .map(|post_id| {
            server.mock(|when, then| {
                when.method(DELETE).path(format!("/api/v4/posts/{post_id}"));
                then.status(200).json_body(json!({ "status": "OK" }));
            })
        })
        .collect()
}

fn mock_any_delete(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(DELETE).path_includes("/api/v4/posts/");
        then.status(200).json_body(json!({ "status": "OK" }));
    })
}

fn mock_any_ephemeral(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(POST).path("/api/v4/posts/ephemeral");
        then.status(201).json_body(json!({ "id": "e1" }));
    })
}

fn total_calls(mocks: &[Mock<'_>]) -> usize {
    mocks.iter().map(Mock::calls).sum()
}

const NEVER_CONFIRM: &str = r#"{"schema_version": 1, "confirmationPolicy": "never"}"#;

#[tokio::test]
async fn integration_health_route_reports_ready() {
    let server = MockServer::start_async().await;
    let harness = BroomHarness::start(&server, None).await;

    let body = harness
        .http
        .get(format!("{}{ROUTE_HEALTH}", harness.base_url))
        .send()
        .await
        .expect("health request")
        .json::<Value>()
        .await
        .expect("health json");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn integration_scenario_a_last_five_owned_posts_are_deleted() {
    let server = MockServer::start_async().await;
    mock_channel(&server, 10);
    mock_permissions(&server, json!(["delete_post"]));
    let listing = mock_latest_posts(
        &server,
        5,
        &[
            ("p10", OWNER_ID),
            ("p9", OWNER_ID),
            ("p8", OWNER_ID),
            ("p7", OWNER_ID),
            ("p6", OWNER_ID),
        ],
    );
    let deletes = mock_deletes(&server, &["p10", "p9", "p8", "p7", "p6"]);
    let report = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v4/posts/ephemeral")
            .body_includes("Successfully deleted 5 posts");
        then.status(201).json_body(json!({ "id": "e1" }));
    });
    let harness = BroomHarness::start(&server, Some(NEVER_CONFIRM)).await;

    let body = harness.command("last 5").await;
    assert_eq!(body, json!({}));
    listing.assert();
    assert_eq!(total_calls(&deletes), 5);
    report.assert();
}

#[tokio::test]
async fn integration_scenario_b_only_own_post_is_deleted() {
    let server = MockServer::start_async().await;
    mock_channel(&server, 10);
    mock_permissions(&server, json!(["delete_post"]));
    mock_latest_posts(
        &server,
        3,
        &[("p3", OWNER_ID), ("p2", OTHER_ID), ("p1", OTHER_ID)],
    );
    let own_delete = mock_deletes(&server, &["p3"]);
    let other_deletes = mock_deletes(&server, &["p2", "p1"]);
    let report = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v4/posts/ephemeral")
            .body_includes("2 posts not deleted because you are not allowed to do so")
            .body_includes("Successfully deleted 1 post\"");
        then.status(201).json_body(json!({ "id": "e1" }));
    });
    let harness = BroomHarness::start(&server, Some(NEVER_CONFIRM)).await;

    harness.command("last 3").await;
    assert_eq!(total_calls(&own_delete), 1);
    assert_eq!(total_calls(&other_deletes), 0);
    report.assert();
}

#[tokio::test]
async fn integration_scenario_c_count_above_channel_total_is_rejected() {
    let server = MockServer::start_async().await;
    mock_channel(&server, 10);
    let deletes = mock_any_delete(&server);
    let ephemeral = mock_any_ephemeral(&server);
    let harness = BroomHarness::start(&server, Some(NEVER_CONFIRM)).await;

    let body = harness.command("last 20").await;
    assert_eq!(body["response_type"], "ephemeral");
    assert_eq!(
        body["text"],
        "Cannot delete more posts than exist in this channel"
    );
    assert_eq!(deletes.calls(), 0);
    assert_eq!(ephemeral.calls(), 0);
}

#[tokio::test]
async fn integration_scenario_d_cancelled_dialog_does_nothing() {
    let server = MockServer::start_async().await;
    let deletes = mock_any_delete(&server);
    let ephemeral = mock_any_ephemeral(&server);
    let harness = BroomHarness::start(&server, None).await;

    let status = harness
        .dialog(
            "/dialog/delete-last",
            Some(DIALOG_SECRET),
            json!({
                "channel_id": CHANNEL_ID,
                "user_id": OWNER_ID,
                "state": "5",
                "cancelled": true
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(deletes.calls(), 0);
    assert_eq!(ephemeral.calls(), 0);
}

#[tokio::test]
async fn integration_confirmation_dialog_round_trip_deletes_on_submit() {
    let server = MockServer::start_async().await;
    mock_channel(&server, 4);
    mock_permissions(&server, json!(["delete_post"]));
    let dialog = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v4/actions/dialogs/open")
            .body_includes("https://broom.example.com/dialog/delete-last?token=dialog-secret")
            .body_includes("\"state\":\"2\"");
        then.status(200).json_body(json!({}));
    });
    mock_latest_posts(&server, 2, &[("p4", OWNER_ID), ("p3", OWNER_ID)]);
    let deletes = mock_deletes(&server, &["p4", "p3"]);
    let report = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v4/posts/ephemeral")
            .body_includes("Successfully deleted 2 posts");
        then.status(201).json_body(json!({ "id": "e1" }));
    });
    let harness = BroomHarness::start(&server, None).await;

    let body = harness.command("last 2").await;
    assert_eq!(body, json!({}));
    dialog.assert();
    assert_eq!(total_calls(&deletes), 0);

    let status = harness
        .dialog(
            "/dialog/delete-last",
            Some(DIALOG_SECRET),
            json!({
                "channel_id": CHANNEL_ID,
                "user_id": OWNER_ID,
                "state": "2",
                "submission": { "deletePinnedPosts": false },
                "cancelled": false
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(total_calls(&deletes), 2);
    report.assert();
}

#[tokio::test]
async fn regression_command_with_foreign_token_is_rejected() {
    let server = MockServer::start_async().await;
    let harness = BroomHarness::start(&server, None).await;

    let response = harness
        .http
        .post(format!("{}{ROUTE_COMMAND}", harness.base_url))
        .form(&[
            ("channel_id", CHANNEL_ID),
            ("user_id", OWNER_ID),
            ("command", "/broom"),
            ("text", "help"),
            ("token", "other-token"),
        ])
        .send()
        .await
        .expect("command request");
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn regression_forged_dialog_submission_deletes_nothing() {
    let server = MockServer::start_async().await;
    mock_channel(&server, 10);
    mock_permissions(&server, json!(["delete_post", "delete_others_posts"]));
    let listing = mock_latest_posts(&server, 2, &[("p2", OTHER_ID), ("p1", OTHER_ID)]);
    let deletes = mock_any_delete(&server);
    let harness = BroomHarness::start(&server, None).await;

    let forged = json!({
        "channel_id": CHANNEL_ID,
        "user_id": OWNER_ID,
        "state": "2",
        "submission": { "deletePinnedPosts": true }
    });
    for token in [None, Some("guess")] {
        let status = harness
            .dialog("/dialog/delete-last", token, forged.clone())
            .await;
        assert_eq!(status, 401);
    }
    assert_eq!(listing.calls(), 0);
    assert_eq!(deletes.calls(), 0);
}
