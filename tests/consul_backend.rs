//! Leader election against a mocked Consul agent.

#![cfg(feature = "consul")]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use tenure::prelude::*;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY_PATH: &str = "/v1/kv/service/scheduler/leader";

async fn mount_session(server: &MockServer, id: &str) {
    Mock::given(method("PUT"))
        .and(path("/v1/session/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ID": id })))
        .mount(server)
        .await;
}

fn election_for(server: &MockServer) -> LeaderElection {
    let consul = ConsulClient::new(ConsulConfig::new(server.uri())).unwrap();
    LeaderElection::new(Arc::new(consul))
}

#[tokio::test]
async fn test_consul_election_won() {
    let server = MockServer::start().await;
    mount_session(&server, "sess-1").await;

    Mock::given(method("PUT"))
        .and(path(KEY_PATH))
        .and(query_param("acquire", "sess-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(true))
        .expect(1)
        .mount(&server)
        .await;

    let leader = election_for(&server)
        .elect_new_leader("scheduler", "node-1")
        .await
        .unwrap();

    assert_eq!(leader, Some("node-1".to_string()));
}

#[tokio::test]
async fn test_consul_election_lost_reports_holder() {
    let server = MockServer::start().await;
    mount_session(&server, "sess-2").await;

    Mock::given(method("PUT"))
        .and(path(KEY_PATH))
        .and(query_param("acquire", "sess-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(false))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/v1/session/destroy/sess-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(true))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(KEY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "Key": "service/scheduler/leader",
            "Value": STANDARD.encode("node-1"),
            "Session": "sess-1",
            "LockIndex": 1
        }])))
        .mount(&server)
        .await;

    let leader = election_for(&server)
        .elect_new_leader("scheduler", "node-2")
        .await
        .unwrap();

    assert_eq!(leader, Some("node-1".to_string()));
}

#[tokio::test]
async fn test_consul_release_targets_current_holder() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(KEY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "Key": "service/scheduler/leader",
            "Value": STANDARD.encode("node-1"),
            "Session": "sess-1",
            "LockIndex": 1
        }])))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(KEY_PATH))
        .and(query_param("release", "sess-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(true))
        .expect(1)
        .mount(&server)
        .await;

    assert!(election_for(&server).release_leadership("scheduler").await.unwrap());
}

#[tokio::test]
async fn test_consul_stale_key_has_no_leader() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(KEY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "Key": "service/scheduler/leader",
            "Value": STANDARD.encode("node-1"),
            "LockIndex": 1
        }])))
        .mount(&server)
        .await;

    let election = election_for(&server);
    assert_eq!(election.get_leader_info("scheduler").await.unwrap(), None);
    assert!(election.release_leadership("scheduler").await.unwrap());
}

#[tokio::test]
async fn test_consul_unreachable_propagates() {
    // Nothing listens on port 1.
    let consul = ConsulClient::new(ConsulConfig::new("http://127.0.0.1:1")).unwrap();
    let election = LeaderElection::new(Arc::new(consul));

    let err = election
        .elect_new_leader("scheduler", "node-1")
        .await
        .unwrap_err();

    assert!(matches!(err, ElectionError::Store(_)));
}
