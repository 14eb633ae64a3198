use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use youtrack_link::app::{self, TicketStatus};
use youtrack_link::cli::Args;
use youtrack_link::Error;

fn args(github: &MockServer, youtrack: &MockServer) -> Args {
    Args {
        github_token: Some("gh-token".into()),
        github_api_url: Some(github.uri()),
        yt_url: Some(youtrack.uri()),
        yt_token: Some("yt-token".into()),
        yt_project_id: Some("PROJ".into()),
        yt_column_field: Some("State".into()),
        yt_column_triggers: Some("Open,In Progress".into()),
        yt_column_target: Some("In Review".into()),
        yt_label_fields: Some("Type".into()),
        yt_label_prefix: Some("yt-".into()),
        repository: Some("acme/widgets".into()),
        pr_number: Some(5),
        actor: Some("octocat".into()),
        ..Args::default()
    }
}

async fn mount_issue(youtrack: &MockServer, id: &str, state: &str, kind: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/issues/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "2-1" })))
        .mount(youtrack)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/issues/{}/fields", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "State", "id": "92-1", "value": { "name": state } },
            { "name": "Type", "id": "92-2", "value": { "name": kind } },
            { "name": "Story points", "id": "92-3", "value": 3 }
        ])))
        .mount(youtrack)
        .await;
}

#[tokio::test]
async fn test_full_run() {
    let github = MockServer::start().await;
    let youtrack = MockServer::start().await;
    let yt = youtrack.uri();

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/pulls/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 5,
            "body": "Closes PROJ-1. Related: PROJ-2, PROJ-404"
        })))
        .mount(&github)
        .await;

    mount_issue(&youtrack, "PROJ-1", "Open", "Bug").await;
    mount_issue(&youtrack, "PROJ-2", "Done", "Feature").await;
    Mock::given(method("GET"))
        .and(path("/api/issues/PROJ-404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&youtrack)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/issues/PROJ-404/fields"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&youtrack)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/issues/PROJ-1/comments"))
        .and(body_json(json!({
            "text": "New PR [#5](https://github.com/acme/widgets/pull/5) opened at \
                     [acme/widgets](https://github.com/acme/widgets) by octocat.",
            "usesMarkdown": true
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&youtrack)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/issues/PROJ-1/fields/92-1"))
        .and(body_json(json!({ "value": { "name": "In Review" } })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&youtrack)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/repos/acme/widgets/pulls/5"))
        .and(body_json(json!({
            "body": format!("Closes [PROJ-1]({}/issue/PROJ-1). Related: PROJ-2, PROJ-404", yt)
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&github)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/widgets/issues/5/comments"))
        .and(body_json(json!({
            "body": format!(
                "Moved YouTrack issue [PROJ-1]({}/issue/PROJ-1) from *Open* to *In Review*",
                yt
            )
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&github)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/widgets/issues/5/labels"))
        .and(body_json(json!({ "labels": ["yt-type/bug"] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&github)
        .await;

    let result = app::run(args(&github, &youtrack)).await.unwrap();

    let statuses: Vec<_> = result.reports.iter().map(|r| r.status.clone()).collect();
    assert_eq!(
        statuses,
        vec![
            TicketStatus::Moved {
                from_state: "Open".into()
            },
            TicketStatus::NotTriggered,
            TicketStatus::NotFound,
        ]
    );
    assert_eq!(result.labels, vec!["yt-type/bug"]);
}

#[tokio::test]
async fn test_rejected_transition_fails_the_run() {
    let github = MockServer::start().await;
    let youtrack = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/pulls/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "body": "PROJ-1" })))
        .mount(&github)
        .await;
    mount_issue(&youtrack, "PROJ-1", "In Progress", "Bug").await;
    Mock::given(method("POST"))
        .and(path("/api/issues/PROJ-1/comments"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&youtrack)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/issues/PROJ-1/fields/92-1"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&youtrack)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&github)
        .await;

    let err = app::run(args(&github, &youtrack)).await.unwrap_err();

    match err {
        Error::Steps(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].subject, "PROJ-1");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_body_succeeds_without_side_effects() {
    let github = MockServer::start().await;
    let youtrack = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/pulls/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "body": null })))
        .mount(&github)
        .await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&youtrack)
        .await;

    let result = app::run(args(&github, &youtrack)).await.unwrap();
    assert!(result.tickets.is_empty());
}
