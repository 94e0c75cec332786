//! Remote tally service
//!
//! Votes live in a PostgREST-style service with two tables:
//!
//! - tallies: `suggestion_id, upvotes, downvotes, score` (read-only aggregate)
//! - votes: `suggestion_id, fingerprint, vote` with at most one row per
//!   (suggestion, fingerprint)
//!
//! [`TallyService`] is the seam the [`Reconciler`](crate::votes::Reconciler) talks to;
//! [`HttpTallyService`] is the http implementation.
//!
use std::{future::Future, sync::Arc};

use reqwest::ClientBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Result,
    client::TallyConfig,
    config::REST_PREFIX,
    http_client::{HttpClient, HttpMetricsSnapshot},
    identity::Identity,
    suggestions::SuggestionId,
    votes::{Vote, VoteTally},
};

/// Row of the tallies table. Missing counts read as zero.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TallyRow {
    pub suggestion_id: SuggestionId,
    #[serde(default)]
    pub upvotes: Option<u64>,
    #[serde(default)]
    pub downvotes: Option<u64>,
    #[serde(default)]
    pub score: Option<i64>,
}

impl TallyRow {
    pub fn tally(&self) -> VoteTally {
        let upvotes = self.upvotes.unwrap_or_default();
        let downvotes = self.downvotes.unwrap_or_default();
        VoteTally {
            upvotes,
            downvotes,
            score: self
                .score
                .unwrap_or_else(|| VoteTally::new(upvotes, downvotes).score),
        }
    }
}

/// This identity's row in the votes table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VoteRow {
    pub suggestion_id: SuggestionId,
    pub vote: Vote,
}

#[derive(Serialize)]
struct NewVote<'a> {
    suggestion_id: &'a SuggestionId,
    fingerprint: &'a str,
    vote: Vote,
}

#[derive(Serialize)]
struct VoteChange {
    vote: Vote,
}

/// Operations on the remote tally service.
pub trait TallyService: Send + Sync {
    /// All tally rows
    fn fetch_tallies(&self) -> impl Future<Output = Result<Vec<TallyRow>>> + Send;

    /// Every vote cast by `identity`
    fn fetch_votes(&self, identity: &Identity) -> impl Future<Output = Result<Vec<VoteRow>>> + Send;

    fn insert_vote(
        &self,
        id: &SuggestionId,
        identity: &Identity,
        vote: Vote,
    ) -> impl Future<Output = Result<()>> + Send;

    fn update_vote(
        &self,
        id: &SuggestionId,
        identity: &Identity,
        vote: Vote,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_vote(
        &self,
        id: &SuggestionId,
        identity: &Identity,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Tally service over http
#[derive(Debug, Clone)]
pub struct HttpTallyService {
    client: Arc<HttpClient>,
    tallies_path: String,
    votes_path: String,
}

impl HttpTallyService {
    pub fn new(builder: ClientBuilder, config: &TallyConfig, max_retries: u32) -> Result<Self> {
        let client = HttpClient::new(
            builder,
            config.url.clone(),
            Some(config.api_key.clone()),
            max_retries,
        )?;
        Ok(Self::from_http(client, config))
    }

    /// Tally service sharing the connection pool of `client`
    pub fn with_client(client: reqwest::Client, config: &TallyConfig, max_retries: u32) -> Self {
        let client = HttpClient::from_client(
            client,
            config.url.clone(),
            Some(config.api_key.clone()),
            max_retries,
        );
        Self::from_http(client, config)
    }

    fn from_http(client: HttpClient, config: &TallyConfig) -> Self {
        debug!(url = %config.url, tallies = %config.tallies_table, votes = %config.votes_table, "tally service configured");
        Self {
            client: Arc::new(client),
            tallies_path: format!("{REST_PREFIX}/{}", config.tallies_table),
            votes_path: format!("{REST_PREFIX}/{}", config.votes_table),
        }
    }

    pub fn metrics(&self) -> HttpMetricsSnapshot {
        self.client.metrics_snapshot()
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn vote_filter(id: &SuggestionId, identity: &Identity) -> Vec<(String, String)> {
    vec![
        ("suggestion_id".to_string(), eq(id)),
        ("fingerprint".to_string(), eq(identity)),
    ]
}

impl TallyService for HttpTallyService {
    async fn fetch_tallies(&self) -> Result<Vec<TallyRow>> {
        self.client
            .get_request(&self.tallies_path, vec![("select".into(), "*".into())])
            .await
    }

    async fn fetch_votes(&self, identity: &Identity) -> Result<Vec<VoteRow>> {
        self.client
            .get_request(
                &self.votes_path,
                vec![
                    ("select".into(), "suggestion_id,vote".into()),
                    ("fingerprint".into(), eq(identity)),
                ],
            )
            .await
    }

    async fn insert_vote(&self, id: &SuggestionId, identity: &Identity, vote: Vote) -> Result<()> {
        let row = NewVote {
            suggestion_id: id,
            fingerprint: identity.as_str(),
            vote,
        };
        self.client.post_request(&self.votes_path, &row).await
    }

    async fn update_vote(&self, id: &SuggestionId, identity: &Identity, vote: Vote) -> Result<()> {
        self.client
            .patch_request(
                &self.votes_path,
                &VoteChange { vote },
                vote_filter(id, identity),
            )
            .await
    }

    async fn delete_vote(&self, id: &SuggestionId, identity: &Identity) -> Result<()> {
        self.client
            .delete_request(&self.votes_path, vote_filter(id, identity))
            .await
    }
}
