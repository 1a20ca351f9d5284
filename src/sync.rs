//! Sync coordinator: the only owner of the committed user list.
//!
//! Every mutation of the list follows a successful call to the remote
//! store. Failures leave the list exactly as it was; there is no retry.

use crate::form::{FormMode, FormState};
use crate::store::UserStore;
use crate::user::User;
use anyhow::{anyhow, Result};

/// Result of the initial load
#[derive(Debug, Default, Clone)]
pub struct LoadReport {
    pub loaded: usize,
    /// Ids that appeared more than once in the store response
    pub duplicates: Vec<String>,
}

/// Result of submitting the open form
#[derive(Debug)]
pub enum SubmitOutcome {
    Created(User),
    Updated(User),
    /// The draft did not pass validation; nothing was sent
    Invalid(Vec<String>),
    /// The store call failed or its answer could not be committed
    Failed(anyhow::Error),
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created(_) | Self::Updated(_))
    }
}

/// Result of a delete request
#[derive(Debug)]
pub enum RemoveOutcome {
    Removed(User),
    /// The operator said no at the confirmation prompt
    Declined,
    NotFound,
    Failed(anyhow::Error),
}

pub struct SyncCoordinator {
    store: Box<dyn UserStore>,
    users: Vec<User>,
}

impl SyncCoordinator {
    pub fn new(store: Box<dyn UserStore>) -> Self {
        Self {
            store,
            users: Vec::new(),
        }
    }

    /// Committed list snapshot, in store order
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Look up a manageable user by id
    pub fn find(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id && u.is_manageable())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.users.iter().position(|u| u.id == id)
    }

    /// Fetch the full list once and adopt it.
    /// On error the committed list is left untouched.
    pub fn load_all(&mut self) -> Result<LoadReport> {
        let fetched = self.store.list()?;
        let mut report = LoadReport::default();

        for user in fetched {
            if self.position(&user.id).is_some() {
                report.duplicates.push(user.id);
                continue;
            }
            self.users.push(user);
            report.loaded += 1;
        }

        Ok(report)
    }

    /// Send the open draft to the store and reconcile the answer.
    /// The form is closed only when the change was committed.
    pub fn submit(&mut self, form: &mut FormState) -> Result<SubmitOutcome> {
        let (draft, mode) = match (form.draft(), form.mode()) {
            (Some(draft), Some(mode)) => (draft, mode),
            _ => return Err(anyhow!("No open form. Use /new or /edit <id>")),
        };

        if let Err(errors) = draft.validate(mode) {
            return Ok(SubmitOutcome::Invalid(errors));
        }

        let outcome = match mode {
            FormMode::Editing => self.commit_update(draft.to_user()),
            FormMode::Creating => {
                let payload = draft.to_create_payload();
                match self.store.create(&payload) {
                    Ok(created) => self.commit_create(created),
                    Err(e) => SubmitOutcome::Failed(e),
                }
            }
        };

        if outcome.is_success() {
            form.discard();
        }
        Ok(outcome)
    }

    fn commit_update(&mut self, payload: User) -> SubmitOutcome {
        let Some(index) = self.position(&payload.id) else {
            return SubmitOutcome::Failed(anyhow!(
                "User {} is not in the committed list",
                payload.id
            ));
        };

        let updated = match self.store.update(&payload) {
            Ok(Some(returned)) => returned,
            Ok(None) => payload,
            Err(e) => return SubmitOutcome::Failed(e),
        };

        if updated.id != self.users[index].id {
            return SubmitOutcome::Failed(anyhow!(
                "Store answered the update of {} with user {}",
                self.users[index].id,
                updated.id
            ));
        }

        self.users[index] = updated.clone();
        SubmitOutcome::Updated(updated)
    }

    fn commit_create(&mut self, created: User) -> SubmitOutcome {
        if self.position(&created.id).is_some() {
            return SubmitOutcome::Failed(anyhow!(
                "Store returned id {} which is already in the committed list",
                created.id
            ));
        }
        self.users.push(created.clone());
        SubmitOutcome::Created(created)
    }

    /// Delete a manageable user after `confirm` approves it.
    /// The record is only dropped once the store confirms the delete.
    pub fn remove<F>(&mut self, id: &str, confirm: F) -> RemoveOutcome
    where
        F: FnOnce(&User) -> bool,
    {
        let Some(user) = self.find(id) else {
            return RemoveOutcome::NotFound;
        };

        if !confirm(user) {
            return RemoveOutcome::Declined;
        }

        if let Err(e) = self.store.delete(id) {
            return RemoveOutcome::Failed(e);
        }

        match self.position(id) {
            Some(index) => RemoveOutcome::Removed(self.users.remove(index)),
            None => RemoveOutcome::NotFound,
        }
    }
}
