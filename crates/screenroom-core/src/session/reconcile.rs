//! Identity reconciliation between the stored session and the signed-in
//! account.
//!
//! `evaluate` is pure and branches on the auth identity first, so the two
//! actions are mutually exclusive by construction: a signed-in user can
//! only ever be offered `Sync`, a signed-out one only `Demote`.

use tracing::{info, warn};

use crate::events::Event;
use crate::remote::HttpInterviewClient;

use super::state::SessionState;
use super::store::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Trial session while signed in: push it to the directory and re-home
    /// it under the account's candidate record.
    Sync,
    /// Account-owned session while signed out: re-home it under a fresh
    /// trial identity.
    Demote,
}

pub struct ModeReconciler;

impl ModeReconciler {
    /// Compare the session's identity against the presence of a signed-in
    /// account. `None` when they already agree, when there is no session
    /// identity to disagree about, or when the interview is past the point
    /// of being picked back up.
    pub fn evaluate(state: &SessionState, identity_present: bool) -> Option<ReconcileAction> {
        if !state.is_resumable() {
            return None;
        }
        let id = state.candidate_id.as_ref()?;
        if identity_present {
            id.is_trial().then_some(ReconcileAction::Sync)
        } else {
            (!id.is_trial()).then_some(ReconcileAction::Demote)
        }
    }

    /// Apply `Sync`: upload the session under the account and adopt the
    /// issued candidate id. The client must carry the account's bearer
    /// token. Best-effort: on failure the session is left exactly as it
    /// was and the caller proceeds with local state.
    pub async fn sync_to_account(
        store: &SessionStore,
        client: &HttpInterviewClient,
    ) -> Option<Event> {
        let epoch = store.epoch();
        let state = store.snapshot();
        match client.sync_session(&state).await {
            Ok(issued) => {
                if store.epoch() != epoch {
                    return None;
                }
                let event = store.link_account(issued);
                if event.is_some() {
                    info!("session linked to account candidate record");
                }
                event
            }
            Err(err) => {
                warn!(error = %err, "session sync failed, continuing with local state");
                None
            }
        }
    }

    /// Apply `Demote`. History is untouched; only the identity changes.
    pub fn demote(store: &SessionStore) -> Option<Event> {
        store.revert_to_trial()
    }
}
