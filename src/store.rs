//! Per-entity state container.
//!
//! Each entity (the request list, one relationship, ...) owns a single
//! [`EntityState`] and every change goes through [`EntityState::reduce`]. Mutations
//! are never applied optimistically: success only marks the entity stale so the
//! caller re-fetches, failure leaves the snapshot exactly as it was.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Submit,
    Accept,
    Decline,
    AcceptOffer,
    Withdraw,
    InviteCoSupervisor,
    RespondInvitation,
    ApproveInvitation,
    UploadDocument,
    ScheduleMeeting,
    RequestUnbind,
    RespondUnbind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum StoreAction<T> {
    FetchStarted,
    FetchSucceeded(T),
    FetchFailed(String),
    MutationStarted(ActionKind),
    MutationSucceeded { kind: ActionKind, message: String },
    MutationFailed { kind: ActionKind, message: String },
}

#[derive(Debug, Clone)]
pub struct EntityState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub in_flight: Option<ActionKind>,
    /// Set after a successful mutation until the next fetch lands.
    pub stale: bool,
    toasts: Vec<Toast>,
}

impl<T> Default for EntityState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            in_flight: None,
            stale: false,
            toasts: Vec::new(),
        }
    }
}

impl<T> EntityState<T> {
    pub fn reduce(&mut self, action: StoreAction<T>) {
        match action {
            StoreAction::FetchStarted => {
                self.loading = true;
            }
            StoreAction::FetchSucceeded(data) => {
                self.data = Some(data);
                self.loading = false;
                self.error = None;
                self.stale = false;
            }
            StoreAction::FetchFailed(message) => {
                self.loading = false;
                self.error = Some(message.clone());
                self.toasts.push(Toast::error(message));
            }
            StoreAction::MutationStarted(kind) => {
                self.in_flight = Some(kind);
            }
            StoreAction::MutationSucceeded { kind, message } => {
                if self.in_flight == Some(kind) {
                    self.in_flight = None;
                }
                self.stale = true;
                self.toasts.push(Toast::success(message));
            }
            StoreAction::MutationFailed { kind, message } => {
                if self.in_flight == Some(kind) {
                    self.in_flight = None;
                }
                self.toasts.push(Toast::error(message));
            }
        }
    }

    /// While a mutation is running every action on this entity is disabled.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn needs_refresh(&self) -> bool {
        self.stale && !self.loading
    }

    pub fn drain_toasts(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_cycle() {
        let mut s: EntityState<Vec<u32>> = EntityState::default();
        s.reduce(StoreAction::FetchStarted);
        assert!(s.loading);
        s.reduce(StoreAction::FetchSucceeded(vec![1, 2]));
        assert_eq!(s.data, Some(vec![1, 2]));
        assert!(!s.loading);
        assert!(s.drain_toasts().is_empty());
    }

    #[test]
    fn failed_refetch_keeps_previous_snapshot() {
        let mut s = EntityState::default();
        s.reduce(StoreAction::FetchSucceeded("v1"));
        s.reduce(StoreAction::FetchStarted);
        s.reduce(StoreAction::FetchFailed("Network down".into()));
        assert_eq!(s.data, Some("v1"));
        assert_eq!(s.error.as_deref(), Some("Network down"));
        assert_eq!(s.drain_toasts(), vec![Toast::error("Network down")]);
    }

    #[test]
    fn failed_mutation_leaves_state_unchanged() {
        let mut s = EntityState::default();
        s.reduce(StoreAction::FetchSucceeded("pending"));
        s.reduce(StoreAction::MutationStarted(ActionKind::Accept));
        assert!(s.is_busy());
        s.reduce(StoreAction::MutationFailed {
            kind: ActionKind::Accept,
            message: "This request has already been decided.".into(),
        });
        assert_eq!(s.data, Some("pending"));
        assert!(!s.is_busy());
        assert!(!s.needs_refresh());
        assert_eq!(
            s.drain_toasts(),
            vec![Toast::error("This request has already been decided.")]
        );
    }

    #[test]
    fn successful_mutation_marks_stale_until_refetch() {
        let mut s = EntityState::default();
        s.reduce(StoreAction::FetchSucceeded("pending"));
        s.reduce(StoreAction::MutationStarted(ActionKind::Decline));
        s.reduce(StoreAction::MutationSucceeded {
            kind: ActionKind::Decline,
            message: "Request declined.".into(),
        });
        // No optimistic change.
        assert_eq!(s.data, Some("pending"));
        assert!(s.needs_refresh());

        s.reduce(StoreAction::FetchStarted);
        assert!(!s.needs_refresh());
        s.reduce(StoreAction::FetchSucceeded("rejected"));
        assert_eq!(s.data, Some("rejected"));
        assert!(!s.stale);
        assert_eq!(s.drain_toasts(), vec![Toast::success("Request declined.")]);
    }
}
