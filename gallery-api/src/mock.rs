//! In-memory tally service for tests and offline demos.
//!
//! Writes update the stored tallies the way the remote service's aggregate does,
//! so a refresh after a cast returns consistent numbers.
use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use crate::{
    Result,
    error::GalleryError,
    identity::Identity,
    suggestions::SuggestionId,
    tally::{TallyRow, TallyService, VoteRow},
    votes::{Vote, VoteTally},
};

#[derive(Debug, Default)]
struct MockState {
    tallies: HashMap<SuggestionId, VoteTally>,
    votes: HashMap<(SuggestionId, Identity), Vote>,
    fail_reads: bool,
    fail_writes: bool,
    unreachable: bool,
    calls: Vec<String>,
}

/// Tally service backed by a shared in-memory table. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockTallyService {
    state: Arc<Mutex<MockState>>,
}

impl MockTallyService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_tally(&self, id: SuggestionId, tally: VoteTally) {
        self.state.lock().tallies.insert(id, tally);
    }

    pub fn seed_vote(&self, id: SuggestionId, identity: Identity, vote: Vote) {
        self.state.lock().votes.insert((id, identity), vote);
    }

    /// Writes fail with an api error
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Reads fail with an api error
    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    /// Every call fails as if the network were down
    pub fn unreachable(&self, unreachable: bool) {
        self.state.lock().unreachable = unreachable;
    }

    /// Calls made so far, e.g. `insert 7 up`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn stored_tally(&self, id: &SuggestionId) -> Option<VoteTally> {
        self.state.lock().tallies.get(id).copied()
    }

    fn check(&self, call: String, write: bool) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(call.clone());
        if state.unreachable {
            return Err(GalleryError::TooManyRetries { n: 1 });
        }
        if (write && state.fail_writes) || (!write && state.fail_reads) {
            return Err(GalleryError::ApiError {
                code: 503,
                method: if write { "POST" } else { "GET" }.to_string(),
                url: format!("mock://{call}"),
                message: "mock failure".to_string(),
            });
        }
        Ok(())
    }

    fn adjust(state: &mut MockState, id: &SuggestionId, removed: Option<Vote>, added: Option<Vote>) {
        let current = state.tallies.get(id).copied().unwrap_or_default();
        let (mut up, mut down) = (current.upvotes, current.downvotes);
        match removed {
            Some(Vote::Up) => up = up.saturating_sub(1),
            Some(Vote::Down) => down = down.saturating_sub(1),
            None => {}
        }
        match added {
            Some(Vote::Up) => up += 1,
            Some(Vote::Down) => down += 1,
            None => {}
        }
        state.tallies.insert(id.clone(), VoteTally::new(up, down));
    }
}

impl TallyService for MockTallyService {
    async fn fetch_tallies(&self) -> Result<Vec<TallyRow>> {
        self.check("fetch tallies".to_string(), false)?;
        let state = self.state.lock();
        Ok(state
            .tallies
            .iter()
            .map(|(id, tally)| TallyRow {
                suggestion_id: id.clone(),
                upvotes: Some(tally.upvotes),
                downvotes: Some(tally.downvotes),
                score: Some(tally.score),
            })
            .collect())
    }

    async fn fetch_votes(&self, identity: &Identity) -> Result<Vec<VoteRow>> {
        self.check(format!("fetch votes {identity}"), false)?;
        let state = self.state.lock();
        Ok(state
            .votes
            .iter()
            .filter(|((_, voter), _)| voter == identity)
            .map(|((id, _), vote)| VoteRow {
                suggestion_id: id.clone(),
                vote: *vote,
            })
            .collect())
    }

    async fn insert_vote(&self, id: &SuggestionId, identity: &Identity, vote: Vote) -> Result<()> {
        self.check(format!("insert {id} {vote}"), true)?;
        let mut state = self.state.lock();
        let key = (id.clone(), identity.clone());
        if state.votes.contains_key(&key) {
            return Err(GalleryError::ApiError {
                code: 409,
                method: "POST".to_string(),
                url: format!("mock://votes/{id}"),
                message: "duplicate vote".to_string(),
            });
        }
        state.votes.insert(key, vote);
        Self::adjust(&mut state, id, None, Some(vote));
        Ok(())
    }

    async fn update_vote(&self, id: &SuggestionId, identity: &Identity, vote: Vote) -> Result<()> {
        self.check(format!("update {id} {vote}"), true)?;
        let mut state = self.state.lock();
        let previous = state.votes.insert((id.clone(), identity.clone()), vote);
        Self::adjust(&mut state, id, previous, Some(vote));
        Ok(())
    }

    async fn delete_vote(&self, id: &SuggestionId, identity: &Identity) -> Result<()> {
        self.check(format!("delete {id}"), true)?;
        let mut state = self.state.lock();
        let previous = state.votes.remove(&(id.clone(), identity.clone()));
        if previous.is_some() {
            Self::adjust(&mut state, id, previous, None);
        }
        Ok(())
    }
}
