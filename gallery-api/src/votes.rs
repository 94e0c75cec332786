//! Votes: tallies, personal votes, and the reconciler
//!
//! [`apply_vote`] is the pure transition for one cast: given the cached tally, the
//! identity's existing vote, and the new vote, it returns the new tally, the new
//! personal vote, and which remote operation to issue.
//!
//! | existing | cast | result           | remote op |
//! |----------|------|------------------|-----------|
//! | none     | v    | add v            | insert    |
//! | v        | v    | retract v        | delete    |
//! | -v       | v    | flip to v        | update    |
//!
//! [`Reconciler`] applies transitions to the local cache before the remote write
//! is awaited. A failed write leaves the local change in place and is recorded as
//! a `VoteSyncFailure` diagnostic.
//!
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    Result,
    error::{DiagnosticKind, Diagnostics, GalleryError},
    identity::Identity,
    suggestions::SuggestionId,
    tally::{TallyRow, TallyService, VoteRow},
};

/// Cached tallies by suggestion
pub type Tallies = HashMap<SuggestionId, VoteTally>;

/// An up or down vote. Stored remotely as `1` / `-1`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(try_from = "i8", into = "i8")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Vote {
    #[strum(to_string = "up", serialize = "+1", serialize = "1")]
    Up,
    #[strum(to_string = "down", serialize = "-1")]
    Down,
}

impl Vote {
    pub fn sign(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}

impl TryFrom<i8> for Vote {
    type Error = String;

    fn try_from(value: i8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Up),
            -1 => Ok(Self::Down),
            other => Err(format!("invalid vote value {other}")),
        }
    }
}

impl From<Vote> for i8 {
    fn from(vote: Vote) -> Self {
        match vote {
            Vote::Up => 1,
            Vote::Down => -1,
        }
    }
}

/// Aggregate counts for one suggestion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub upvotes: u64,
    pub downvotes: u64,
    pub score: i64,
}

impl VoteTally {
    #[allow(clippy::cast_possible_wrap)]
    pub fn new(upvotes: u64, downvotes: u64) -> Self {
        Self {
            upvotes,
            downvotes,
            score: upvotes as i64 - downvotes as i64,
        }
    }

    #[must_use]
    fn add(self, vote: Vote) -> Self {
        match vote {
            Vote::Up => Self {
                upvotes: self.upvotes + 1,
                score: self.score + 1,
                ..self
            },
            Vote::Down => Self {
                downvotes: self.downvotes + 1,
                score: self.score - 1,
                ..self
            },
        }
    }

    #[must_use]
    fn retract(self, vote: Vote) -> Self {
        match vote {
            Vote::Up => Self {
                upvotes: self.upvotes.saturating_sub(1),
                score: self.score - 1,
                ..self
            },
            Vote::Down => Self {
                downvotes: self.downvotes.saturating_sub(1),
                score: self.score + 1,
                ..self
            },
        }
    }

    #[must_use]
    fn flip_to(self, vote: Vote) -> Self {
        self.retract(opposite(vote)).add(vote)
    }
}

fn opposite(vote: Vote) -> Vote {
    match vote {
        Vote::Up => Vote::Down,
        Vote::Down => Vote::Up,
    }
}

/// Remote write implied by a cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(tag = "op", content = "vote", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RemoteOp {
    Insert(Vote),
    Update(Vote),
    Delete,
}

/// Result of applying one cast to cached state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteTransition {
    /// New tally. None only if there was no cached tally and the cast removed or flipped a vote.
    pub tally: Option<VoteTally>,
    /// New personal vote
    pub personal: Option<Vote>,
    pub op: RemoteOp,
}

/// Pure vote transition. A missing tally is initialized only when a vote is created;
/// removing or flipping a vote without a cached tally leaves the tally absent.
pub fn apply_vote(tally: Option<VoteTally>, existing: Option<Vote>, vote: Vote) -> VoteTransition {
    match existing {
        Some(previous) if previous == vote => VoteTransition {
            tally: tally.map(|t| t.retract(vote)),
            personal: None,
            op: RemoteOp::Delete,
        },
        Some(_) => VoteTransition {
            tally: tally.map(|t| t.flip_to(vote)),
            personal: Some(vote),
            op: RemoteOp::Update(vote),
        },
        None => VoteTransition {
            tally: Some(tally.unwrap_or_default().add(vote)),
            personal: Some(vote),
            op: RemoteOp::Insert(vote),
        },
    }
}

/// Whether the remote write for a cast succeeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    Failed { message: String },
    /// voting unavailable; nothing was changed
    Disabled,
}

/// Outcome of a cast, as seen by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteOutcome {
    pub id: SuggestionId,
    pub tally: Option<VoteTally>,
    pub personal: Option<Vote>,
    pub score: i64,
    pub sync: SyncStatus,
}

#[derive(Debug, Default)]
struct VoteState {
    tallies: Tallies,
    mine: HashMap<SuggestionId, Vote>,
}

/// Keeps cached tallies and personal votes consistent with casts and the remote service.
#[derive(Debug)]
pub struct Reconciler<S> {
    service: Option<S>,
    identity: Identity,
    enabled: AtomicBool,
    state: Mutex<VoteState>,
    diagnostics: Arc<Diagnostics>,
}

impl<S: TallyService> Reconciler<S> {
    /// Creates a reconciler. With no service, voting is disabled.
    pub fn new(service: Option<S>, identity: Identity, diagnostics: Arc<Diagnostics>) -> Self {
        let enabled = service.is_some();
        if !enabled {
            info!("tally service not configured; voting disabled");
            diagnostics.record(
                DiagnosticKind::RemoteVotingUnavailable,
                "tally service not configured",
            );
        }
        Self {
            service,
            identity,
            enabled: AtomicBool::new(enabled),
            state: Mutex::new(VoteState::default()),
            diagnostics,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn service(&self) -> Option<&S> {
        self.service.as_ref()
    }

    fn active_service(&self) -> Result<&S> {
        match &self.service {
            Some(service) if self.is_enabled() => Ok(service),
            _ => Err(GalleryError::VotingUnavailable),
        }
    }

    /// Initial load. If the service is unreachable, voting is disabled for the session.
    pub async fn startup(&self) {
        let Ok(service) = self.active_service() else {
            return;
        };
        let (tallies, mine) = futures::join!(
            service.fetch_tallies(),
            service.fetch_votes(&self.identity)
        );
        if let Err(e) = &tallies
            && e.is_unreachable()
        {
            warn!(error = %e, "tally service unreachable; voting disabled");
            self.enabled.store(false, Ordering::Relaxed);
            self.diagnostics.record(
                DiagnosticKind::RemoteVotingUnavailable,
                format!("tally service unreachable: {e}"),
            );
            return;
        }
        self.store_tallies(tallies);
        self.store_votes(mine);
    }

    /// Replaces cached tallies. On failure the previous tallies are kept.
    pub async fn refresh_tallies(&self) -> bool {
        let Ok(service) = self.active_service() else {
            return false;
        };
        self.store_tallies(service.fetch_tallies().await)
    }

    /// Replaces cached personal votes. On failure the previous votes are kept.
    pub async fn refresh_my_votes(&self) -> bool {
        let Ok(service) = self.active_service() else {
            return false;
        };
        self.store_votes(service.fetch_votes(&self.identity).await)
    }

    fn store_tallies(&self, fetched: Result<Vec<TallyRow>>) -> bool {
        match fetched {
            Ok(rows) => {
                let tallies: Tallies = rows
                    .into_iter()
                    .map(|row| (row.suggestion_id.clone(), row.tally()))
                    .collect();
                debug!(count = tallies.len(), "tallies refreshed");
                self.state.lock().tallies = tallies;
                true
            }
            Err(e) => {
                warn!(error = %e, "tally refresh failed");
                self.diagnostics.record(
                    DiagnosticKind::TallyRefreshFailure,
                    format!("tallies: {e}"),
                );
                false
            }
        }
    }

    fn store_votes(&self, fetched: Result<Vec<VoteRow>>) -> bool {
        match fetched {
            Ok(rows) => {
                let mine: HashMap<SuggestionId, Vote> = rows
                    .into_iter()
                    .map(|row| (row.suggestion_id, row.vote))
                    .collect();
                debug!(count = mine.len(), "personal votes refreshed");
                self.state.lock().mine = mine;
                true
            }
            Err(e) => {
                warn!(error = %e, "personal vote refresh failed");
                self.diagnostics.record(
                    DiagnosticKind::TallyRefreshFailure,
                    format!("personal votes: {e}"),
                );
                false
            }
        }
    }

    /// Casts a vote: applies it locally, then issues the remote write.
    /// Casting the same vote twice removes it; casting the opposite vote flips it.
    pub async fn cast_vote(&self, id: &SuggestionId, vote: Vote) -> VoteOutcome {
        let service = match self.active_service() {
            Ok(service) => service,
            Err(_) => {
                debug!(%id, "vote ignored; voting disabled");
                return self.outcome(id, SyncStatus::Disabled);
            }
        };

        // local update first; the lock is released before the remote await
        let transition = {
            let mut state = self.state.lock();
            let transition = apply_vote(
                state.tallies.get(id).copied(),
                state.mine.get(id).copied(),
                vote,
            );
            if let Some(tally) = transition.tally {
                state.tallies.insert(id.clone(), tally);
            }
            match transition.personal {
                Some(personal) => state.mine.insert(id.clone(), personal),
                None => state.mine.remove(id),
            };
            transition
        };
        debug!(%id, op = %transition.op, "vote applied locally");

        let written = match transition.op {
            RemoteOp::Insert(vote) => service.insert_vote(id, &self.identity, vote).await,
            RemoteOp::Update(vote) => service.update_vote(id, &self.identity, vote).await,
            RemoteOp::Delete => service.delete_vote(id, &self.identity).await,
        };
        let sync = match written {
            Ok(()) => SyncStatus::Synced,
            Err(e) => {
                warn!(%id, op = %transition.op, error = %e, "vote sync failed");
                self.diagnostics.record(
                    DiagnosticKind::VoteSyncFailure,
                    format!("{} {id}: {e}", transition.op),
                );
                SyncStatus::Failed {
                    message: e.to_string(),
                }
            }
        };
        self.outcome(id, sync)
    }

    fn outcome(&self, id: &SuggestionId, sync: SyncStatus) -> VoteOutcome {
        let state = self.state.lock();
        let tally = state.tallies.get(id).copied();
        VoteOutcome {
            id: id.clone(),
            tally,
            personal: state.mine.get(id).copied(),
            score: tally.map_or(0, |t| t.score),
            sync,
        }
    }

    /// Score for a suggestion; 0 if unknown
    pub fn score(&self, id: &SuggestionId) -> i64 {
        self.state.lock().tallies.get(id).map_or(0, |t| t.score)
    }

    pub fn tally(&self, id: &SuggestionId) -> Option<VoteTally> {
        self.state.lock().tallies.get(id).copied()
    }

    /// This identity's vote on a suggestion
    pub fn vote_of(&self, id: &SuggestionId) -> Option<Vote> {
        self.state.lock().mine.get(id).copied()
    }

    /// Copy of all cached tallies
    pub fn tallies(&self) -> Tallies {
        self.state.lock().tallies.clone()
    }
}
