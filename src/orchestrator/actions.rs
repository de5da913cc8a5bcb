//! User actions against the backend.
//!
//! Each action is one POST. The outcome is logged, turned into a toast and tells
//! the caller which entity to re-fetch; nothing is changed locally beforehand.

use crate::api::{
    log_error, Ack, ApiClient, ApiError, CoSupervisorInvite, NewMeeting, NewRequest, Rejection,
};
use crate::model::ViewerRole;
use crate::store::{ActionKind, StoreAction, Toast, ToastLevel};
use std::future::Future;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum Mutation {
    Submit(NewRequest),
    Accept { request: u64 },
    Decline { request: u64, rejection: Rejection },
    AcceptOffer { request: u64 },
    Withdraw { request: u64 },
    InviteCoSupervisor { relationship: u64, invite: CoSupervisorInvite },
    RespondInvitation { invitation: u64, accept: bool },
    ApproveInvitation { invitation: u64, approve: bool },
    UploadDocument { relationship: u64, path: PathBuf, folder: Option<String> },
    ScheduleMeeting { relationship: u64, meeting: NewMeeting },
    RequestUnbind { relationship: u64, reason: String },
    RespondUnbind { unbind: u64, approve: bool },
}

/// What has to be re-fetched after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Requests,
    Request(u64),
    Relationships,
    Relationship(u64),
}

impl Mutation {
    pub fn kind(&self) -> ActionKind {
        match self {
            Mutation::Submit(_) => ActionKind::Submit,
            Mutation::Accept { .. } => ActionKind::Accept,
            Mutation::Decline { .. } => ActionKind::Decline,
            Mutation::AcceptOffer { .. } => ActionKind::AcceptOffer,
            Mutation::Withdraw { .. } => ActionKind::Withdraw,
            Mutation::InviteCoSupervisor { .. } => ActionKind::InviteCoSupervisor,
            Mutation::RespondInvitation { .. } => ActionKind::RespondInvitation,
            Mutation::ApproveInvitation { .. } => ActionKind::ApproveInvitation,
            Mutation::UploadDocument { .. } => ActionKind::UploadDocument,
            Mutation::ScheduleMeeting { .. } => ActionKind::ScheduleMeeting,
            Mutation::RequestUnbind { .. } => ActionKind::RequestUnbind,
            Mutation::RespondUnbind { .. } => ActionKind::RespondUnbind,
        }
    }

    pub fn target(&self) -> Target {
        match self {
            Mutation::Submit(_) => Target::Requests,
            Mutation::Accept { request }
            | Mutation::Decline { request, .. }
            | Mutation::AcceptOffer { request }
            | Mutation::Withdraw { request } => Target::Request(*request),
            Mutation::InviteCoSupervisor { relationship, .. }
            | Mutation::UploadDocument { relationship, .. }
            | Mutation::ScheduleMeeting { relationship, .. }
            | Mutation::RequestUnbind { relationship, .. } => Target::Relationship(*relationship),
            Mutation::RespondInvitation { .. }
            | Mutation::ApproveInvitation { .. }
            | Mutation::RespondUnbind { .. } => Target::Relationships,
        }
    }

    /// Used when the server acknowledges without a message of its own.
    fn default_success_message(&self) -> &'static str {
        match self {
            Mutation::Submit(_) => "Proposal submitted.",
            Mutation::Accept { .. } => "Request accepted.",
            Mutation::Decline { .. } => "Request declined.",
            Mutation::AcceptOffer { .. } => "Offer accepted.",
            Mutation::Withdraw { .. } => "Request withdrawn.",
            Mutation::InviteCoSupervisor { .. } => "Co-supervisor invited.",
            Mutation::RespondInvitation { accept: true, .. } => "Invitation accepted.",
            Mutation::RespondInvitation { accept: false, .. } => "Invitation declined.",
            Mutation::ApproveInvitation { approve: true, .. } => "Co-supervisor approved.",
            Mutation::ApproveInvitation { approve: false, .. } => "Co-supervisor rejected.",
            Mutation::UploadDocument { .. } => "Document uploaded.",
            Mutation::ScheduleMeeting { .. } => "Meeting scheduled.",
            Mutation::RequestUnbind { .. } => "Unbind request sent.",
            Mutation::RespondUnbind { approve: true, .. } => "Unbind approved.",
            Mutation::RespondUnbind { approve: false, .. } => "Unbind rejected.",
        }
    }

    fn context(&self) -> &'static str {
        match self.kind() {
            ActionKind::Submit => "submit request",
            ActionKind::Accept => "accept request",
            ActionKind::Decline => "decline request",
            ActionKind::AcceptOffer => "accept offer",
            ActionKind::Withdraw => "withdraw request",
            ActionKind::InviteCoSupervisor => "invite co-supervisor",
            ActionKind::RespondInvitation => "respond to invitation",
            ActionKind::ApproveInvitation => "approve invitation",
            ActionKind::UploadDocument => "upload document",
            ActionKind::ScheduleMeeting => "schedule meeting",
            ActionKind::RequestUnbind => "request unbind",
            ActionKind::RespondUnbind => "respond to unbind",
        }
    }
}

async fn perform(client: &ApiClient, role: ViewerRole, m: &Mutation) -> Result<Ack, ApiError> {
    match m {
        Mutation::Submit(req) => client.submit_request(req).await,
        Mutation::Accept { request } | Mutation::AcceptOffer { request } => {
            client.accept_request(*request).await
        }
        Mutation::Decline { request, rejection } => {
            client.reject_request(*request, rejection).await
        }
        Mutation::Withdraw { request } => client.cancel_request(*request).await,
        Mutation::InviteCoSupervisor {
            relationship,
            invite,
        } => client.invite_cosupervisor(*relationship, invite).await,
        Mutation::RespondInvitation { invitation, accept } => {
            client.respond_invitation(*invitation, *accept).await
        }
        Mutation::ApproveInvitation {
            invitation,
            approve,
        } => client.approve_invitation(*invitation, *approve).await,
        Mutation::UploadDocument {
            relationship,
            path,
            folder,
        } => {
            client
                .upload_document(*relationship, path, folder.as_deref())
                .await
        }
        Mutation::ScheduleMeeting {
            relationship,
            meeting,
        } => client.schedule_meeting(*relationship, meeting).await,
        Mutation::RequestUnbind {
            relationship,
            reason,
        } => client.request_unbind(*relationship, reason).await,
        Mutation::RespondUnbind { unbind, approve } => {
            client.respond_unbind(*unbind, role, *approve).await
        }
    }
}

#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub kind: ActionKind,
    pub target: Target,
    pub toast: Toast,
}

impl MutationOutcome {
    pub fn succeeded(&self) -> bool {
        self.toast.level == ToastLevel::Success
    }

    pub fn store_action<T>(&self) -> StoreAction<T> {
        let message = self.toast.message.clone();
        if self.succeeded() {
            StoreAction::MutationSucceeded {
                kind: self.kind,
                message,
            }
        } else {
            StoreAction::MutationFailed {
                kind: self.kind,
                message,
            }
        }
    }
}

/// Run one mutation. Failures are logged here and never propagate further.
pub async fn run_mutation(client: &ApiClient, role: ViewerRole, m: &Mutation) -> MutationOutcome {
    let toast = match perform(client, role, m).await {
        Ok(ack) => {
            tracing::info!(action = m.context(), "done");
            Toast::success(
                ack.message
                    .filter(|msg| !msg.trim().is_empty())
                    .unwrap_or_else(|| m.default_success_message().to_string()),
            )
        }
        Err(e) => {
            log_error(m.context(), &e);
            Toast::error(e.toast_message())
        }
    };
    MutationOutcome {
        kind: m.kind(),
        target: m.target(),
        toast,
    }
}

/// Await a read, logging any failure and reducing it to its toast text.
pub async fn fetch<T>(
    context: &str,
    fut: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, String> {
    fut.await.map_err(|e| {
        log_error(context, &e);
        e.toast_message()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&Settings {
            base_url: server.uri(),
            token: None,
            role: ViewerRole::Student,
            user_id: None,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn success_uses_server_message_or_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/supervision/requests/4/accept"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "message": "Welcome aboard!" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/supervision/requests/4/cancel"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
            .mount(&server)
            .await;

        let c = client(&server);
        let out =
            run_mutation(&c, ViewerRole::Student, &Mutation::AcceptOffer { request: 4 }).await;
        assert!(out.succeeded());
        assert_eq!(out.toast.message, "Welcome aboard!");
        assert_eq!(out.target, Target::Request(4));

        let out = run_mutation(&c, ViewerRole::Student, &Mutation::Withdraw { request: 4 }).await;
        assert_eq!(out.toast, Toast::success("Request withdrawn."));
        assert_eq!(out.kind, ActionKind::Withdraw);
    }

    #[tokio::test]
    async fn failure_becomes_error_toast_and_failed_action() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/supervision/unbind-requests/2/supervisor/approve"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({ "message": "Already resolved." })),
            )
            .mount(&server)
            .await;

        let out = run_mutation(
            &client(&server),
            ViewerRole::Supervisor,
            &Mutation::RespondUnbind { unbind: 2, approve: true },
        )
        .await;
        assert_eq!(out.toast, Toast::error("Already resolved."));
        assert!(matches!(
            out.store_action::<()>(),
            StoreAction::MutationFailed { kind: ActionKind::RespondUnbind, .. }
        ));
    }

    #[tokio::test]
    async fn missing_upload_file_never_hits_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let out = run_mutation(
            &client(&server),
            ViewerRole::Student,
            &Mutation::UploadDocument {
                relationship: 1,
                path: PathBuf::from("/definitely/not/here.pdf"),
                folder: None,
            },
        )
        .await;
        assert_eq!(out.toast.level, ToastLevel::Error);
        assert!(out.toast.message.contains("/definitely/not/here.pdf"));
    }

    #[test]
    fn targets() {
        assert_eq!(
            Mutation::RequestUnbind { relationship: 3, reason: "moving".into() }.target(),
            Target::Relationship(3)
        );
        assert_eq!(
            Mutation::RespondInvitation { invitation: 1, accept: true }.target(),
            Target::Relationships
        );
    }
}
