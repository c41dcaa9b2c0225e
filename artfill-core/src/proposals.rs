//! Pending change proposals and the approval workflow.
//!
//! At most one live proposal exists per (item, slot) key: re-resolving a
//! key whose proposal is still undecided merges the newer candidate into
//! the existing record instead of stacking duplicates. Terminal
//! proposals are removed from the store once archived into history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use artfill_model::{
    ArtworkCandidate, ArtworkRef, ChangeProposal, ProposalId,
    ProposalStatus, ResolutionKey,
};

use crate::error::{EngineError, Result};
use crate::storage::StateStore;

pub const PROPOSALS_FILE: &str = "proposals.json";

#[derive(Debug)]
pub struct ProposalStore {
    proposals: DashMap<ResolutionKey, ChangeProposal>,
    store: Arc<dyn StateStore>,
}

impl ProposalStore {
    pub async fn load(store: Arc<dyn StateStore>) -> Result<Self> {
        let proposals = DashMap::new();
        if let Some(bytes) = store.load(PROPOSALS_FILE).await? {
            match serde_json::from_slice::<Vec<ChangeProposal>>(&bytes) {
                Ok(loaded) => {
                    for proposal in loaded {
                        if proposal.status.is_terminal() {
                            continue;
                        }
                        proposals.insert(proposal.key.clone(), proposal);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        %err,
                        "proposal file unreadable; starting empty"
                    );
                }
            }
        }
        Ok(Self { proposals, store })
    }

    /// Create a pending proposal for the key, or fold a newer candidate
    /// into the one already waiting. Returns the proposal's id.
    pub fn upsert(
        &self,
        key: ResolutionKey,
        item_title: &str,
        previous: ArtworkRef,
        candidate: ArtworkCandidate,
        now: DateTime<Utc>,
    ) -> ProposalId {
        match self.proposals.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let proposal = occupied.get_mut();
                proposal.status = ProposalStatus::Pending;
                proposal.decided_at = None;
                proposal.merge_candidate(candidate, previous);
                proposal.id
            }
            Entry::Vacant(vacant) => {
                let proposal = ChangeProposal::new(
                    key, item_title, previous, candidate, now,
                );
                let id = proposal.id;
                vacant.insert(proposal);
                id
            }
        }
    }

    /// Pending proposals, oldest first.
    pub fn pending(&self) -> Vec<ChangeProposal> {
        let mut pending: Vec<ChangeProposal> = self
            .proposals
            .iter()
            .filter(|entry| entry.status == ProposalStatus::Pending)
            .map(|entry| entry.value().clone())
            .collect();
        pending.sort_by_key(|proposal| proposal.created_at);
        pending
    }

    /// Decided-but-unapplied proposals (approved or declined).
    pub fn decided(&self) -> Vec<ChangeProposal> {
        let mut decided: Vec<ChangeProposal> = self
            .proposals
            .iter()
            .filter(|entry| {
                matches!(
                    entry.status,
                    ProposalStatus::Approved | ProposalStatus::Declined
                )
            })
            .map(|entry| entry.value().clone())
            .collect();
        decided.sort_by_key(|proposal| proposal.created_at);
        decided
    }

    pub fn get(&self, id: ProposalId) -> Option<ChangeProposal> {
        self.proposals
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.value().clone())
    }

    /// Approve or decline a proposal. Re-deciding an already decided but
    /// not yet applied proposal is allowed; deciding a terminal one is
    /// not possible since terminal proposals leave the store.
    pub fn decide(
        &self,
        id: ProposalId,
        approve: bool,
        now: DateTime<Utc>,
    ) -> Result<ChangeProposal> {
        for mut entry in self.proposals.iter_mut() {
            if entry.id == id {
                entry.status = if approve {
                    ProposalStatus::Approved
                } else {
                    ProposalStatus::Declined
                };
                entry.decided_at = Some(now);
                return Ok(entry.value().clone());
            }
        }
        Err(EngineError::UnknownProposal(id))
    }

    pub fn remove(&self, key: &ResolutionKey) -> Option<ChangeProposal> {
        self.proposals.remove(key).map(|(_, proposal)| proposal)
    }

    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    pub async fn persist(&self) -> Result<()> {
        let mut proposals: Vec<ChangeProposal> = self
            .proposals
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        proposals.sort_by_key(|proposal| proposal.created_at);
        let bytes = serde_json::to_vec_pretty(&proposals)?;
        self.store.save(PROPOSALS_FILE, &bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use artfill_model::ArtworkSlot;

    fn candidate(url: &str) -> ArtworkCandidate {
        ArtworkCandidate {
            provider: "tmdb".to_string(),
            url: url.to_string(),
            width: 1000,
            height: 1500,
            language: Some("en".to_string()),
            vote: None,
        }
    }

    fn key(id: &str) -> ResolutionKey {
        ResolutionKey::new(id.into(), ArtworkSlot::Poster)
    }

    async fn empty_store() -> ProposalStore {
        ProposalStore::load(Arc::new(MemoryStore::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn upsert_merges_into_existing_pending_proposal() {
        let store = empty_store().await;
        let now = Utc::now();
        let first = store.upsert(
            key("m1"),
            "Movie One",
            ArtworkRef::default(),
            candidate("https://img/a.jpg"),
            now,
        );
        let second = store.upsert(
            key("m1"),
            "Movie One",
            ArtworkRef::default(),
            candidate("https://img/b.jpg"),
            now,
        );

        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        let pending = store.pending();
        assert_eq!(pending[0].candidate.url, "https://img/b.jpg");
    }

    #[tokio::test]
    async fn decide_moves_proposal_out_of_pending() {
        let store = empty_store().await;
        let now = Utc::now();
        let id = store.upsert(
            key("m1"),
            "Movie One",
            ArtworkRef::default(),
            candidate("https://img/a.jpg"),
            now,
        );

        let decided = store.decide(id, true, now).unwrap();
        assert_eq!(decided.status, ProposalStatus::Approved);
        assert!(store.pending().is_empty());
        assert_eq!(store.decided().len(), 1);
    }

    #[tokio::test]
    async fn deciding_unknown_proposal_fails() {
        let store = empty_store().await;
        let missing = ProposalId::new();
        let err = store.decide(missing, true, Utc::now()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownProposal(_)));
    }

    #[tokio::test]
    async fn resolving_again_resets_a_declined_proposal() {
        let store = empty_store().await;
        let now = Utc::now();
        let id = store.upsert(
            key("m1"),
            "Movie One",
            ArtworkRef::default(),
            candidate("https://img/a.jpg"),
            now,
        );
        store.decide(id, false, now).unwrap();

        store.upsert(
            key("m1"),
            "Movie One",
            ArtworkRef::default(),
            candidate("https://img/c.jpg"),
            now,
        );
        let pending = store.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].candidate.url, "https://img/c.jpg");
    }

    #[tokio::test]
    async fn persist_and_reload_keeps_pending_proposals() {
        let backing = Arc::new(MemoryStore::new());
        let store = ProposalStore::load(backing.clone()).await.unwrap();
        store.upsert(
            key("m1"),
            "Movie One",
            ArtworkRef::default(),
            candidate("https://img/a.jpg"),
            Utc::now(),
        );
        store.persist().await.unwrap();

        let reloaded = ProposalStore::load(backing).await.unwrap();
        assert_eq!(reloaded.pending().len(), 1);
    }
}
