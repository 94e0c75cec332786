//! Http tally service and remote catalog sources against a mock http server.

mod common;

use common::{TEST_IDENTITY, offline_config};
use gallery::{
    prelude::*,
    test_util::{sample_manifest, sample_suggestions},
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

const KEY: &str = "test-key";

fn tally_config(server: &MockServer) -> TallyConfig {
    TallyConfig::new(server.uri(), KEY).expect("url and key")
}

fn service(server: &MockServer) -> HttpTallyService {
    HttpTallyService::new(reqwest::Client::builder(), &tally_config(server), 0).expect("client")
}

#[tokio::test]
#[test_log::test]
async fn test_fetch_tallies_sends_auth_headers() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/vote_tallies"))
        .and(header("apikey", KEY))
        .and(header("authorization", format!("Bearer {KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"suggestion_id": 3, "upvotes": 2, "downvotes": 1, "score": 1},
            {"suggestion_id": "4", "upvotes": null, "downvotes": null, "score": null}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = service(&server).fetch_tallies().await?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].tally(), VoteTally::new(2, 1));
    assert_eq!(rows[1].tally(), VoteTally::default());
    Ok(())
}

#[tokio::test]
#[test_log::test]
async fn test_vote_writes() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/votes"))
        .and(body_json(json!({"suggestion_id": "3", "fingerprint": TEST_IDENTITY, "vote": 1})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/votes"))
        .and(query_param("suggestion_id", "eq.3"))
        .and(query_param("fingerprint", format!("eq.{TEST_IDENTITY}").as_str()))
        .and(body_json(json!({"vote": -1})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/votes"))
        .and(query_param("suggestion_id", "eq.3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = service(&server);
    let identity = Identity::from(TEST_IDENTITY);
    let id = SuggestionId::from("3");
    service.insert_vote(&id, &identity, Vote::Up).await?;
    service.update_vote(&id, &identity, Vote::Down).await?;
    service.delete_vote(&id, &identity).await?;

    let metrics = service.metrics();
    assert_eq!(metrics.total_requests, 3);
    assert_eq!(metrics.successful_responses, 3);
    Ok(())
}

#[tokio::test]
#[test_log::test]
async fn test_write_error_is_api_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/votes"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = service(&server)
        .insert_vote(&SuggestionId::from("3"), &Identity::from("x"), Vote::Up)
        .await
        .expect_err("conflict");
    assert!(matches!(err, GalleryError::ApiError { code: 409, .. }));
    assert!(!err.is_unreachable());
    Ok(())
}

#[tokio::test]
#[test_log::test]
async fn test_gallery_with_remote_sources() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/manifest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sample_manifest()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/suggestions.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sample_suggestions()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/vote_tallies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"suggestion_id": 1, "upvotes": 7, "downvotes": 2, "score": 5}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/votes"))
        .and(query_param("fingerprint", format!("eq.{TEST_IDENTITY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"suggestion_id": 1, "vote": 1}
        ])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let config = offline_config(dir.path())
        .catalog_source(Source::from(format!("{}/data/manifest.json", server.uri()).as_str()))
        .suggestion_source(Source::from(format!("{}/data/suggestions.json", server.uri()).as_str()))
        .tally(Some(tally_config(&server)));
    let gallery = Gallery::open(config).await?;

    assert_eq!(gallery.catalog().cards().len(), 7);
    assert_eq!(gallery.catalog().suggestions().len(), 5);
    assert!(gallery.voting_enabled());
    let id = SuggestionId::from("1");
    assert_eq!(gallery.reconciler().score(&id), 5);
    assert_eq!(gallery.reconciler().vote_of(&id), Some(Vote::Up));
    assert!(gallery.diagnostics().is_empty());
    assert_eq!(gallery.http_metrics().total_requests, 4);
    Ok(())
}

#[tokio::test]
#[test_log::test]
async fn test_failed_source_loads_empty() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/manifest.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir()?;
    let config = offline_config(dir.path())
        .catalog_source(Source::from(format!("{}/data/manifest.json", server.uri()).as_str()));
    let gallery = Gallery::open(config).await?;

    assert!(gallery.catalog().cards().is_empty());
    assert!(gallery.catalog().card_state().is_failed());
    assert!(gallery.diagnostics().has(DiagnosticKind::LoadFailure));
    // suggestions are independent of the card manifest
    assert_eq!(gallery.catalog().suggestions().len(), 5);

    let result = gallery.cards(&CardView::default());
    assert_eq!(
        ResultState::of(gallery.catalog().card_state(), &result),
        ResultState::LoadFailed
    );
    Ok(())
}
