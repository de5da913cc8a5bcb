//! Request/relationship lifecycle view-model.
//!
//! Pure mapping from a backend snapshot and the viewer's role to what the UI should
//! show: a status badge, the enabled actions, the visible tabs and the card state.
//! Nothing here performs a transition; the backend status is authoritative.

use crate::model::{
    CoSupervisorInvitation, InvitationStatus, RelationshipRole, RelationshipStatus, RequestStatus,
    SupervisionRelationship, SupervisionRequest, ViewerRole,
};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeColor {
    Amber,
    Indigo,
    Emerald,
    Rose,
    Slate,
}

impl BadgeColor {
    /// Utility class pair used by the web front-end for this color.
    pub fn class(self) -> &'static str {
        match self {
            BadgeColor::Amber => "bg-amber-100 text-amber-800",
            BadgeColor::Indigo => "bg-indigo-100 text-indigo-800",
            BadgeColor::Emerald => "bg-emerald-100 text-emerald-800",
            BadgeColor::Rose => "bg-rose-100 text-rose-800",
            BadgeColor::Slate => "bg-slate-100 text-slate-700",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub label: String,
    pub color: BadgeColor,
}

impl Badge {
    fn new(label: impl Into<String>, color: BadgeColor) -> Self {
        Self {
            label: label.into(),
            color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Accept,
    Decline,
    AcceptOffer,
    Chat,
    ScheduleMeeting,
    JoinMeeting,
    UploadDocument,
    RequestUnbind,
    InviteCoSupervisor,
}

impl Action {
    /// Chat never changes server state and is the only action that survives a pending unbind.
    pub fn is_mutating(self) -> bool {
        !matches!(self, Action::Chat)
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::Accept => "Accept",
            Action::Decline => "Decline",
            Action::AcceptOffer => "Accept offer",
            Action::Chat => "Chat",
            Action::ScheduleMeeting => "Schedule meeting",
            Action::JoinMeeting => "Join meeting",
            Action::UploadDocument => "Upload document",
            Action::RequestUnbind => "Request unbind",
            Action::InviteCoSupervisor => "Invite co-supervisor",
        }
    }
}

pub type ActionSet = BTreeSet<Action>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tab {
    Proposal,
    Attachments,
    Recommendations,
    Overview,
    Meetings,
    Documents,
    Milestones,
    Research,
}

impl Tab {
    pub fn title(self) -> &'static str {
        match self {
            Tab::Proposal => "Proposal",
            Tab::Attachments => "Attachments",
            Tab::Recommendations => "Recommendations",
            Tab::Overview => "Overview",
            Tab::Meetings => "Meetings",
            Tab::Documents => "Documents",
            Tab::Milestones => "Milestones",
            Tab::Research => "Research",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    /// The viewer owes a decision.
    Actionable,
    /// Waiting on the other party.
    Waiting,
    Active,
    /// An unbind request freezes the relationship until it is resolved.
    Locked,
    Closed,
}

/// Status shown to the user. `PendingUnbind` is synthesized client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Request(RequestStatus),
    Relationship(RelationshipStatus),
    PendingUnbind,
}

impl DisplayStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DisplayStatus::Request(s) => s.as_str(),
            DisplayStatus::Relationship(s) => s.as_str(),
            DisplayStatus::PendingUnbind => "pending_unbind",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendedBadge {
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestView {
    pub status: DisplayStatus,
    pub badge: Badge,
    /// Decision actions only; chat is reported separately.
    pub actions: ActionSet,
    pub chat_enabled: bool,
    /// Student may withdraw while the request is still open.
    pub can_withdraw: bool,
    pub tabs: Vec<Tab>,
    pub card: CardState,
    pub recommended: Option<RecommendedBadge>,
}

/// Shown to the party that did not open the unbind request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnbindPanel {
    pub unbind_id: u64,
    pub can_respond: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipView {
    pub status: DisplayStatus,
    pub badge: Badge,
    pub actions: ActionSet,
    pub tabs: Vec<Tab>,
    pub card: CardState,
    pub read_only: bool,
    pub unbind: Option<UnbindPanel>,
}

impl RelationshipView {
    pub fn chat_enabled(&self) -> bool {
        self.actions.contains(&Action::Chat)
    }

    pub fn mutating_actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.actions.iter().copied().filter(|a| a.is_mutating())
    }
}

fn humanize(raw: &str) -> String {
    let words: Vec<String> = raw
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        "Unknown".to_string()
    } else {
        words.join(" ")
    }
}

pub fn request_badge(status: &RequestStatus) -> Badge {
    match status {
        RequestStatus::Pending => Badge::new("Pending", BadgeColor::Amber),
        RequestStatus::PendingStudentAcceptance => {
            Badge::new("Awaiting Student", BadgeColor::Indigo)
        }
        RequestStatus::Accepted => Badge::new("Accepted", BadgeColor::Emerald),
        RequestStatus::Rejected => Badge::new("Rejected", BadgeColor::Rose),
        RequestStatus::Cancelled => Badge::new("Cancelled", BadgeColor::Slate),
        RequestStatus::AutoCancelled => Badge::new("Auto Cancelled", BadgeColor::Slate),
        RequestStatus::Unknown(raw) => Badge::new(humanize(raw), BadgeColor::Slate),
    }
}

pub fn display_badge(status: &DisplayStatus) -> Badge {
    match status {
        DisplayStatus::Request(s) => request_badge(s),
        DisplayStatus::Relationship(RelationshipStatus::Active) => {
            Badge::new("Active", BadgeColor::Emerald)
        }
        DisplayStatus::Relationship(RelationshipStatus::Terminated) => {
            Badge::new("Terminated", BadgeColor::Slate)
        }
        DisplayStatus::Relationship(RelationshipStatus::Unknown(raw)) => {
            Badge::new(humanize(raw), BadgeColor::Slate)
        }
        DisplayStatus::PendingUnbind => Badge::new("Pending Unbind", BadgeColor::Amber),
    }
}

/// Decision actions for a request status and viewer.
pub fn decision_actions(status: &RequestStatus, role: ViewerRole) -> ActionSet {
    match (status, role) {
        (RequestStatus::Pending, ViewerRole::Supervisor) => {
            [Action::Accept, Action::Decline].into()
        }
        (RequestStatus::PendingStudentAcceptance, ViewerRole::Student) => {
            [Action::AcceptOffer].into()
        }
        _ => ActionSet::new(),
    }
}

pub fn request_view(request: &SupervisionRequest, role: ViewerRole) -> RequestView {
    let status = &request.status;
    let actions = decision_actions(status, role);
    let open = matches!(
        status,
        RequestStatus::Pending | RequestStatus::PendingStudentAcceptance
    );

    let recommended = (matches!(status, RequestStatus::Rejected)
        && !request.recommended_supervisors.is_empty())
    .then(|| RecommendedBadge {
        count: request.recommended_supervisors.len(),
    });

    let mut tabs = vec![Tab::Proposal, Tab::Attachments];
    if recommended.is_some() {
        tabs.push(Tab::Recommendations);
    }

    let card = if !actions.is_empty() {
        CardState::Actionable
    } else {
        match status {
            RequestStatus::Accepted => CardState::Active,
            RequestStatus::Rejected | RequestStatus::Cancelled | RequestStatus::AutoCancelled => {
                CardState::Closed
            }
            _ => CardState::Waiting,
        }
    };

    RequestView {
        badge: request_badge(status),
        status: DisplayStatus::Request(status.clone()),
        actions,
        chat_enabled: true,
        can_withdraw: open && role == ViewerRole::Student,
        tabs,
        card,
        recommended,
    }
}

/// The displayed status, with an open unbind request taking precedence.
pub fn relationship_display_status(rel: &SupervisionRelationship) -> DisplayStatus {
    if rel.active_unbind_request.is_some() {
        DisplayStatus::PendingUnbind
    } else {
        DisplayStatus::Relationship(rel.status.clone())
    }
}

pub fn relationship_view(rel: &SupervisionRelationship, role: ViewerRole) -> RelationshipView {
    let status = relationship_display_status(rel);
    let mut actions = ActionSet::new();

    let (tabs, card, read_only) = match &status {
        DisplayStatus::Relationship(RelationshipStatus::Terminated) => (
            vec![Tab::Overview, Tab::Documents, Tab::Milestones],
            CardState::Closed,
            true,
        ),
        DisplayStatus::PendingUnbind => {
            actions.insert(Action::Chat);
            (active_tabs(), CardState::Locked, false)
        }
        DisplayStatus::Relationship(RelationshipStatus::Active) => {
            actions.extend([
                Action::Chat,
                Action::JoinMeeting,
                Action::UploadDocument,
                Action::RequestUnbind,
            ]);
            if role == ViewerRole::Supervisor {
                actions.insert(Action::ScheduleMeeting);
                if rel.role == RelationshipRole::Main {
                    actions.insert(Action::InviteCoSupervisor);
                }
            }
            (active_tabs(), CardState::Active, false)
        }
        // Unknown relationship status: show it, allow talking, change nothing.
        _ => {
            actions.insert(Action::Chat);
            (vec![Tab::Overview], CardState::Waiting, false)
        }
    };

    let unbind = rel.active_unbind_request.as_ref().map(|u| UnbindPanel {
        unbind_id: u.id,
        can_respond: u.initiated_by.is_some_and(|by| by != role),
    });

    RelationshipView {
        badge: display_badge(&status),
        status,
        actions,
        tabs,
        card,
        read_only,
        unbind,
    }
}

fn active_tabs() -> Vec<Tab> {
    vec![
        Tab::Overview,
        Tab::Meetings,
        Tab::Documents,
        Tab::Milestones,
        Tab::Research,
    ]
}

/// Scheduling is a supervisor privilege on a live relationship.
pub fn can_schedule(rel: Option<&SupervisionRelationship>, role: ViewerRole) -> bool {
    rel.map(|r| relationship_view(r, role).actions.contains(&Action::ScheduleMeeting))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationAction {
    Accept,
    Decline,
    Approve,
    Reject,
}

/// Actions on one co-supervisor invitation. Invitations never lock each other.
pub fn invitation_actions(
    inv: &CoSupervisorInvitation,
    viewer_id: Option<u64>,
) -> Vec<InvitationAction> {
    let Some(viewer) = viewer_id else {
        return Vec::new();
    };
    match inv.status {
        InvitationStatus::Pending if inv.invitee_id == Some(viewer) => {
            vec![InvitationAction::Accept, InvitationAction::Decline]
        }
        InvitationStatus::Accepted if inv.approver_id == Some(viewer) => {
            vec![InvitationAction::Approve, InvitationAction::Reject]
        }
        _ => Vec::new(),
    }
}

pub fn invitation_badge(status: &InvitationStatus) -> Badge {
    match status {
        InvitationStatus::Pending => Badge::new("Invited", BadgeColor::Amber),
        InvitationStatus::Accepted => Badge::new("Awaiting Approval", BadgeColor::Indigo),
        InvitationStatus::Approved => Badge::new("Approved", BadgeColor::Emerald),
        InvitationStatus::Declined => Badge::new("Declined", BadgeColor::Rose),
        InvitationStatus::Rejected => Badge::new("Rejected", BadgeColor::Rose),
        InvitationStatus::Cancelled => Badge::new("Cancelled", BadgeColor::Slate),
        InvitationStatus::Unknown(raw) => Badge::new(humanize(raw), BadgeColor::Slate),
    }
}

/// Stable sort that moves cancelled and auto-cancelled requests to the end.
pub fn sort_for_display(requests: &mut [SupervisionRequest]) {
    requests.sort_by_key(|r| r.status.is_cancelled());
}
