use crate::api::normalize;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a backend status enum that keeps unrecognised values verbatim.
///
/// The backend owns the status taxonomy; anything we do not know about is carried
/// through as `Unknown(raw)` so it can still be displayed and round-tripped.
macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Unknown(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $wire,)+
                    Self::Unknown(raw) => raw.as_str(),
                }
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                match raw.trim().to_ascii_lowercase().as_str() {
                    $($wire => Self::$variant,)+
                    _ => Self::Unknown(raw),
                }
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self::from(raw.to_string())
            }
        }

        impl From<$name> for String {
            fn from(s: $name) -> Self {
                s.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

status_enum!(
    /// Lifecycle status of a supervision request.
    RequestStatus {
        Pending => "pending",
        PendingStudentAcceptance => "pending_student_acceptance",
        Accepted => "accepted",
        Rejected => "rejected",
        Cancelled => "cancelled",
        AutoCancelled => "auto_cancelled",
    }
);

status_enum!(
    /// Lifecycle status of a supervision relationship as stored by the backend.
    RelationshipStatus {
        Active => "active",
        Terminated => "terminated",
    }
);

status_enum!(
    /// Status of a co-supervisor invitation.
    ///
    /// `accepted` means the invitee said yes and the approver still has to sign off.
    InvitationStatus {
        Pending => "pending",
        Accepted => "accepted",
        Approved => "approved",
        Declined => "declined",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
);

impl RequestStatus {
    /// Cancelled requests sink to the bottom of list views.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RequestStatus::Cancelled | RequestStatus::AutoCancelled)
    }
}

/// Who is looking at the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewerRole {
    Student,
    Supervisor,
}

impl ViewerRole {
    /// Path segment used by role-specific endpoints.
    pub fn as_path_segment(self) -> &'static str {
        match self {
            ViewerRole::Student => "student",
            ViewerRole::Supervisor => "supervisor",
        }
    }
}

impl fmt::Display for ViewerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path_segment())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipRole {
    #[default]
    Main,
    Co,
}

/// Canonical reference to a person (supervisor or student).
///
/// Built by [`normalize::party`] from whatever shape the backend happened to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRef {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl PartyRef {
    pub fn display_name(&self) -> String {
        match (&self.name, self.id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("#{id}"),
            (None, None) => "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: u64,
    #[serde(alias = "original_name", alias = "file_name")]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub scheduled_for: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub meeting_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisionRequest {
    pub id: u64,
    pub status: RequestStatus,
    #[serde(default)]
    pub proposal_title: Option<String>,
    #[serde(default)]
    pub motivation: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub decision_at: Option<String>,
    #[serde(default, alias = "supervisor", deserialize_with = "normalize::party_opt")]
    pub academician: Option<PartyRef>,
    #[serde(default, deserialize_with = "normalize::party_opt")]
    pub student: Option<PartyRef>,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub attachments: Vec<Attachment>,
    #[serde(default, deserialize_with = "normalize::null_as_default")]
    pub meetings: Vec<Meeting>,
    #[serde(default, deserialize_with = "normalize::party_list")]
    pub recommended_supervisors: Vec<PartyRef>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// Which side opened an unbind request.
pub type UnbindInitiator = ViewerRole;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnbindRequest {
    pub id: u64,
    #[serde(default, deserialize_with = "normalize::viewer_role_opt")]
    pub initiated_by: Option<UnbindInitiator>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisionRelationship {
    pub id: u64,
    #[serde(default)]
    pub role: RelationshipRole,
    pub status: RelationshipStatus,
    #[serde(default)]
    pub accepted_at: Option<String>,
    #[serde(default)]
    pub terminated_at: Option<String>,
    #[serde(default)]
    pub cohort: Option<String>,
    #[serde(default)]
    pub meeting_cadence: Option<String>,
    #[serde(default, alias = "supervisor", deserialize_with = "normalize::party_opt")]
    pub academician: Option<PartyRef>,
    #[serde(default, deserialize_with = "normalize::party_opt")]
    pub student: Option<PartyRef>,
    #[serde(default, alias = "activeUnbindRequest")]
    pub active_unbind_request: Option<UnbindRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoSupervisorInvitation {
    pub id: u64,
    #[serde(default)]
    pub relationship_id: Option<u64>,
    pub status: InvitationStatus,
    #[serde(default, alias = "cosupervisor", deserialize_with = "normalize::party_opt")]
    pub invitee: Option<PartyRef>,
    #[serde(default)]
    pub invitee_id: Option<u64>,
    #[serde(default)]
    pub approver_id: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: u64,
    #[serde(alias = "original_name")]
    pub name: String,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default, deserialize_with = "normalize::party_opt")]
    pub uploaded_by: Option<PartyRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchItem {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A relationship together with the collections loaded after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipBundle {
    pub relationship: SupervisionRelationship,
    pub documents: Vec<Document>,
    pub milestones: Vec<Milestone>,
    pub meetings: Vec<Meeting>,
}

/// Standard `{ "data": ... }` response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_status_survives_round_trip() {
        let status: RequestStatus = serde_json::from_value(json!("on_hold")).unwrap();
        assert_eq!(status, RequestStatus::Unknown("on_hold".into()));
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("on_hold"));
    }

    #[test]
    fn rejected_request_with_id_recommendations_gets_badge() {
        let req: SupervisionRequest = serde_json::from_value(json!({
            "id": 1,
            "status": "rejected",
            "recommended_supervisors": [8, "9"]
        }))
        .unwrap();
        assert_eq!(req.recommended_supervisors.len(), 2);
        let view = crate::lifecycle::request_view(&req, ViewerRole::Student);
        assert_eq!(view.recommended.map(|r| r.count), Some(2));
    }

    #[test]
    fn odd_unbind_initiator_does_not_break_the_list() {
        let rels: Vec<SupervisionRelationship> = serde_json::from_value(json!([
            { "id": 1, "status": "active",
              "active_unbind_request": { "id": 5, "initiated_by": "Supervisor" } },
            { "id": 2, "status": "active",
              "active_unbind_request": { "id": 6, "initiated_by": "academician" } },
            { "id": 3, "status": "active",
              "active_unbind_request": { "id": 7, "initiated_by": "postgraduate" } },
            { "id": 4, "status": "active",
              "active_unbind_request": { "id": 8, "initiated_by": "registrar" } }
        ]))
        .unwrap();
        let by: Vec<Option<ViewerRole>> = rels
            .iter()
            .map(|r| r.active_unbind_request.as_ref().and_then(|u| u.initiated_by))
            .collect();
        assert_eq!(
            by,
            vec![
                Some(ViewerRole::Supervisor),
                Some(ViewerRole::Supervisor),
                Some(ViewerRole::Student),
                None
            ]
        );
    }

    #[test]
    fn known_status_is_case_insensitive() {
        let status: RequestStatus = serde_json::from_value(json!("Auto_Cancelled")).unwrap();
        assert_eq!(status, RequestStatus::AutoCancelled);
        assert!(status.is_cancelled());
    }

    #[test]
    fn request_deserializes_with_nested_party_shapes() {
        let req: SupervisionRequest = serde_json::from_value(json!({
            "id": 12,
            "status": "rejected",
            "proposal_title": "Graph learning for proteins",
            "academician": {
                "user": { "full_name": "Dr. Lim", "academician": { "academician_id": "77" } }
            },
            "student": { "postgraduate_id": 5, "name": "Aina" },
            "attachments": null,
            "recommended_supervisors": [{ "academician_id": 3, "full_name": "Dr. Tan" }, null]
        }))
        .unwrap();

        let academician = req.academician.unwrap();
        assert_eq!(academician.id, Some(77));
        assert_eq!(academician.name.as_deref(), Some("Dr. Lim"));
        assert_eq!(req.student.unwrap().id, Some(5));
        assert!(req.attachments.is_empty());
        assert_eq!(req.recommended_supervisors.len(), 1);
    }

    #[test]
    fn relationship_accepts_camel_case_unbind_key() {
        let rel: SupervisionRelationship = serde_json::from_value(json!({
            "id": 1,
            "role": "co",
            "status": "active",
            "activeUnbindRequest": { "id": 9, "initiated_by": "student" }
        }))
        .unwrap();
        assert_eq!(rel.role, RelationshipRole::Co);
        let unbind = rel.active_unbind_request.unwrap();
        assert_eq!(unbind.id, 9);
        assert_eq!(unbind.initiated_by, Some(ViewerRole::Student));
    }
}
