use tracing::{debug, info, warn};

use crate::api::ApplicationApi;
use crate::models::{ApplicationDraft, ApplicationId, ApplicationRecord, StatusFilter};
use crate::notify::Notifier;
use crate::session::CurrentUser;

/// Result of a controller operation. Failures have already been reported
/// through the notifier by the time this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Failed,
    /// Nothing was sent: no user is logged in, or there was nothing pending.
    Inactive,
}

const LOAD_FAILED: &str = "Failed to load applications";
const SUBMIT_FAILED: &str = "Failed to submit application";
const DELETE_FAILED: &str = "Failed to delete application";

/// Holds the current user's applications and the form / delete-dialog slots.
///
/// Every operation runs its request to completion while holding `&mut self`,
/// so a response can never land after the user has moved on to another action.
pub struct ApplicationController<A, N> {
    api: A,
    notifier: N,
    user: Option<CurrentUser>,
    records: Vec<ApplicationRecord>,
    filter: StatusFilter,
    form_open: bool,
    edit_target: Option<ApplicationRecord>,
    pending_delete: Option<ApplicationId>,
}

impl<A: ApplicationApi, N: Notifier> ApplicationController<A, N> {
    pub fn new(api: A, notifier: N) -> Self {
        Self {
            api,
            notifier,
            user: None,
            records: Vec::new(),
            filter: StatusFilter::All,
            form_open: false,
            edit_target: None,
            pending_delete: None,
        }
    }

    // --- Session ---

    /// Host hook for login/logout. A new or different user triggers a refresh;
    /// logging out drops everything held for the previous user.
    pub fn set_user(&mut self, user: Option<CurrentUser>) -> Outcome {
        if user == self.user {
            return Outcome::Inactive;
        }
        self.records.clear();
        self.form_open = false;
        self.edit_target = None;
        self.pending_delete = None;
        self.user = user;

        if let Some(user) = &self.user {
            debug!(user = %user.name, "user changed");
        } else {
            debug!("logged out");
            return Outcome::Inactive;
        }
        self.refresh()
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.user.is_some()
    }

    // --- Sync ---

    pub fn refresh(&mut self) -> Outcome {
        if !self.is_active() {
            return Outcome::Inactive;
        }
        match self.api.list() {
            Ok(records) => {
                debug!(count = records.len(), "loaded applications");
                self.records = records;
                Outcome::Applied
            }
            Err(e) => {
                warn!(error = %e, "refresh failed");
                self.notifier.failure(LOAD_FAILED);
                Outcome::Failed
            }
        }
    }

    // --- Form ---

    // Form and delete slots only fill while a user is logged in.
    pub fn open_compose(&mut self) {
        if !self.is_active() {
            return;
        }
        self.edit_target = None;
        self.form_open = true;
    }

    pub fn begin_edit(&mut self, record: ApplicationRecord) {
        if !self.is_active() {
            return;
        }
        self.edit_target = Some(record);
        self.form_open = true;
    }

    pub fn cancel_form(&mut self) {
        self.form_open = false;
        self.edit_target = None;
    }

    pub fn is_form_open(&self) -> bool {
        self.form_open
    }

    pub fn edit_target(&self) -> Option<&ApplicationRecord> {
        self.edit_target.as_ref()
    }

    /// Updates the edit target if one is set, otherwise creates a new record.
    pub fn submit(&mut self, draft: &ApplicationDraft) -> Outcome {
        if !self.is_active() {
            return Outcome::Inactive;
        }

        let (result, done) = match &self.edit_target {
            Some(target) => (self.api.update(&target.id, draft), "Application updated"),
            None => (self.api.create(draft), "Application added"),
        };

        match result {
            Ok(()) => {
                info!(company = %draft.company, "{}", done);
                self.notifier.success(done);
                self.form_open = false;
                self.edit_target = None;
                self.refresh();
                Outcome::Applied
            }
            Err(e) => {
                warn!(error = %e, "submit failed");
                self.notifier.failure(SUBMIT_FAILED);
                Outcome::Failed
            }
        }
    }

    // --- Delete ---

    /// First phase of a delete: remembers the id, sends nothing.
    pub fn request_delete(&mut self, id: ApplicationId) {
        if !self.is_active() {
            return;
        }
        self.pending_delete = Some(id);
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub fn pending_delete(&self) -> Option<&ApplicationId> {
        self.pending_delete.as_ref()
    }

    pub fn confirm_delete(&mut self) -> Outcome {
        // The dialog closes either way.
        let Some(id) = self.pending_delete.take() else {
            return Outcome::Inactive;
        };
        if !self.is_active() {
            return Outcome::Inactive;
        }

        match self.api.delete(&id) {
            Ok(()) => {
                info!(%id, "application deleted");
                self.notifier.success("Application deleted");
                self.refresh();
                Outcome::Applied
            }
            Err(e) => {
                warn!(error = %e, %id, "delete failed");
                self.notifier.failure(DELETE_FAILED);
                Outcome::Failed
            }
        }
    }

    // --- View ---

    pub fn records(&self) -> &[ApplicationRecord] {
        &self.records
    }

    pub fn find(&self, id: &ApplicationId) -> Option<&ApplicationRecord> {
        self.records.iter().find(|r| r.id == *id)
    }

    pub fn filter(&self) -> &StatusFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
    }

    /// Records matching `filter`, in stored order.
    pub fn filtered_view(&self, filter: &StatusFilter) -> Vec<&ApplicationRecord> {
        self.records.iter().filter(|r| filter.matches(r)).collect()
    }

    /// Records matching the active filter.
    pub fn visible(&self) -> Vec<&ApplicationRecord> {
        self.filtered_view(&self.filter)
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }
}
