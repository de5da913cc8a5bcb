//! Text rendering for CLI output.
//!
//! Formats entities and their lifecycle views as human-readable lines.

use crate::lifecycle::{self, Action, ActionSet};
use crate::model::{
    CoSupervisorInvitation, Document, Meeting, Milestone, PartyRef, RelationshipBundle,
    ResearchItem, SupervisionRelationship, SupervisionRequest, ViewerRole,
};
use crate::source::SupervisorCandidate;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Render an RFC 3339 timestamp as `YYYY-MM-DD HH:MM UTC`; anything else is shown as-is.
pub(crate) fn format_timestamp(raw: &str) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute] UTC");
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .and_then(|t| t.to_offset(UtcOffset::UTC).format(fmt).ok())
        .unwrap_or_else(|| raw.to_string())
}

fn opt_time(raw: Option<&str>) -> String {
    raw.map(format_timestamp).unwrap_or_else(|| "-".into())
}

fn party(p: Option<&PartyRef>) -> String {
    p.map(PartyRef::display_name).unwrap_or_else(|| "-".into())
}

pub(crate) fn action_list(actions: &ActionSet) -> String {
    if actions.is_empty() {
        return "none".into();
    }
    actions
        .iter()
        .map(|a| a.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}

/// One line per request, in display order.
pub(crate) fn request_list_lines(
    requests: &[SupervisionRequest],
    role: ViewerRole,
) -> Vec<String> {
    if requests.is_empty() {
        return vec!["No supervision requests.".into()];
    }
    requests
        .iter()
        .map(|r| {
            let view = lifecycle::request_view(r, role);
            let counterpart = match role {
                ViewerRole::Student => party(r.academician.as_ref()),
                ViewerRole::Supervisor => party(r.student.as_ref()),
            };
            let mut line = format!(
                "#{:<5} {:<18} {:<40} {}",
                r.id,
                format!("[{}]", view.badge.label),
                truncate(r.proposal_title.as_deref().unwrap_or("(untitled)"), 40),
                counterpart
            );
            if !view.actions.is_empty() {
                line.push_str(&format!("  -> {}", action_list(&view.actions)));
            }
            if let Some(rec) = view.recommended {
                line.push_str(&format!("  ({} recommended)", rec.count));
            }
            line
        })
        .collect()
}

pub(crate) fn request_detail_lines(r: &SupervisionRequest, role: ViewerRole) -> Vec<String> {
    let view = lifecycle::request_view(r, role);
    let mut lines = vec![
        format!(
            "Request #{}: {}",
            r.id,
            r.proposal_title.as_deref().unwrap_or("(untitled)")
        ),
        format!("Status: {}", view.badge.label),
        format!("Supervisor: {}", party(r.academician.as_ref())),
        format!("Student: {}", party(r.student.as_ref())),
        format!("Submitted: {}", opt_time(r.submitted_at.as_deref())),
    ];
    if r.decision_at.is_some() {
        lines.push(format!("Decided: {}", opt_time(r.decision_at.as_deref())));
    }
    if let Some(m) = r.motivation.as_deref().filter(|m| !m.trim().is_empty()) {
        lines.push(String::new());
        lines.push("Motivation:".into());
        lines.extend(m.lines().map(|l| format!("  {l}")));
    }
    if let Some(reason) = r.rejection_reason.as_deref() {
        lines.push(format!("Reason: {reason}"));
    }
    if !r.attachments.is_empty() {
        lines.push(String::new());
        lines.push(format!("Attachments ({}):", r.attachments.len()));
        lines.extend(r.attachments.iter().map(|a| format!("  - {}", a.name)));
    }
    if let Some(rec) = &view.recommended {
        lines.push(String::new());
        lines.push(format!("Recommended supervisors ({}):", rec.count));
        lines.extend(
            r.recommended_supervisors
                .iter()
                .map(|p| format!("  - {}", p.display_name())),
        );
    }
    lines.push(String::new());
    lines.push(format!("Actions: {}", action_list(&view.actions)));
    lines.push(format!(
        "Chat: {}",
        if view.chat_enabled { "open" } else { "closed" }
    ));
    if view.can_withdraw {
        lines.push("You can withdraw this request.".into());
    }
    lines
}

pub(crate) fn relationship_list_lines(
    rels: &[SupervisionRelationship],
    role: ViewerRole,
) -> Vec<String> {
    if rels.is_empty() {
        return vec!["No supervision relationships.".into()];
    }
    rels.iter()
        .map(|rel| {
            let view = lifecycle::relationship_view(rel, role);
            let counterpart = match role {
                ViewerRole::Student => party(rel.academician.as_ref()),
                ViewerRole::Supervisor => party(rel.student.as_ref()),
            };
            format!(
                "#{:<5} {:<18} {:<5} {}",
                rel.id,
                format!("[{}]", view.badge.label),
                format!("{:?}", rel.role).to_lowercase(),
                counterpart
            )
        })
        .collect()
}

pub(crate) fn relationship_detail_lines(
    bundle: &RelationshipBundle,
    role: ViewerRole,
) -> Vec<String> {
    let rel = &bundle.relationship;
    let view = lifecycle::relationship_view(rel, role);
    let mut lines = vec![
        format!("Relationship #{} ({:?})", rel.id, rel.role),
        format!("Status: {}", view.badge.label),
        format!("Supervisor: {}", party(rel.academician.as_ref())),
        format!("Student: {}", party(rel.student.as_ref())),
        format!("Since: {}", opt_time(rel.accepted_at.as_deref())),
    ];
    if rel.terminated_at.is_some() {
        lines.push(format!("Ended: {}", opt_time(rel.terminated_at.as_deref())));
    }
    if let Some(cohort) = rel.cohort.as_deref() {
        lines.push(format!("Cohort: {cohort}"));
    }
    if let Some(cadence) = rel.meeting_cadence.as_deref() {
        lines.push(format!("Meeting cadence: {cadence}"));
    }
    if let (Some(unbind), Some(panel)) =
        (rel.active_unbind_request.as_ref(), view.unbind.as_ref())
    {
        let by = unbind
            .initiated_by
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".into());
        lines.push(format!(
            "Unbind requested by {by}: {}",
            unbind.reason.as_deref().unwrap_or("(no reason given)")
        ));
        if panel.can_respond {
            lines.push(format!(
                "  Respond with `unbind approve {id} --relationship {rel}` \
                 or `unbind reject {id} --relationship {rel}`",
                id = panel.unbind_id,
                rel = rel.id
            ));
        }
    }
    if view.read_only {
        lines.push("This relationship has ended and is read-only.".into());
    }

    lines.push(String::new());
    lines.extend(meeting_lines(&bundle.meetings));
    lines.push(String::new());
    lines.extend(document_lines(&bundle.documents));
    lines.push(String::new());
    lines.extend(milestone_lines(&bundle.milestones));
    lines.push(String::new());
    lines.push(format!("Actions: {}", action_list(&view.actions)));
    if !view.actions.contains(&Action::Chat) {
        lines.push("Chat is closed for this relationship.".into());
    }
    lines
}

pub(crate) fn meeting_lines(meetings: &[Meeting]) -> Vec<String> {
    let mut lines = vec![format!("Meetings ({}):", meetings.len())];
    lines.extend(meetings.iter().map(|m| {
        let mut line = format!("  - {} @ {}", m.title, opt_time(m.scheduled_for.as_deref()));
        if let Some(loc) = m.location.as_deref() {
            line.push_str(&format!(" ({loc})"));
        }
        if let Some(url) = m.meeting_url.as_deref() {
            line.push_str(&format!(" {url}"));
        }
        line
    }));
    lines
}

pub(crate) fn document_lines(documents: &[Document]) -> Vec<String> {
    let mut lines = vec![format!("Documents ({}):", documents.len())];
    lines.extend(documents.iter().map(|d| {
        format!(
            "  - {}{} uploaded {} by {}",
            d.folder
                .as_deref()
                .map(|f| format!("{f}/"))
                .unwrap_or_default(),
            d.name,
            opt_time(d.uploaded_at.as_deref()),
            party(d.uploaded_by.as_ref())
        )
    }));
    lines
}

pub(crate) fn milestone_lines(milestones: &[Milestone]) -> Vec<String> {
    let mut lines = vec![format!("Milestones ({}):", milestones.len())];
    lines.extend(milestones.iter().map(|m| {
        let mark = if m.completed_at.is_some() { "x" } else { " " };
        format!(
            "  [{mark}] {} (due {})",
            m.title,
            opt_time(m.due_at.as_deref())
        )
    }));
    lines
}

pub(crate) fn research_lines(items: &[ResearchItem]) -> Vec<String> {
    let mut lines = vec![format!("Research ({}):", items.len())];
    lines.extend(items.iter().map(|r| {
        format!(
            "  - {} [{}] updated {}",
            r.title,
            r.kind.as_deref().unwrap_or("item"),
            opt_time(r.updated_at.as_deref())
        )
    }));
    lines
}

pub(crate) fn invitation_lines(
    invitations: &[CoSupervisorInvitation],
    viewer_id: Option<u64>,
) -> Vec<String> {
    if invitations.is_empty() {
        return vec!["No co-supervisor invitations.".into()];
    }
    invitations
        .iter()
        .map(|inv| {
            let badge = lifecycle::invitation_badge(&inv.status);
            let actions = lifecycle::invitation_actions(inv, viewer_id);
            let mut line = format!(
                "#{:<5} {:<20} {}",
                inv.id,
                format!("[{}]", badge.label),
                party(inv.invitee.as_ref())
            );
            if !actions.is_empty() {
                let names: Vec<String> = actions
                    .iter()
                    .map(|a| format!("{a:?}").to_lowercase())
                    .collect();
                line.push_str(&format!("  -> {}", names.join(", ")));
            }
            line
        })
        .collect()
}

pub(crate) fn candidate_lines(candidates: &[SupervisorCandidate]) -> Vec<String> {
    if candidates.is_empty() {
        return vec!["No candidates found.".into()];
    }
    candidates
        .iter()
        .map(|c| {
            let id = c
                .academician
                .id
                .map(|id| format!("#{id}"))
                .unwrap_or_else(|| "-".into());
            let mut line = format!(
                "{:<7} {:<30} {:?}",
                id,
                c.academician.display_name(),
                c.source
            );
            if let Some(note) = c.note.as_deref() {
                line.push_str(&format!("  {}", truncate(note, 60)));
            }
            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RequestStatus;

    fn request(id: u64, status: &str) -> SupervisionRequest {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "status": status,
            "proposal_title": "Edge inference for agricultural drones",
            "academician": { "academician_id": 3, "full_name": "Dr. Tan" },
            "student": { "postgraduate_id": 9, "full_name": "Aisyah" },
            "submitted_at": "2024-03-05T09:30:00+08:00"
        }))
        .unwrap()
    }

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_timestamp("2024-03-05T09:30:00+08:00"), "2024-03-05 01:30 UTC");
        assert_eq!(format_timestamp("last Tuesday"), "last Tuesday");
    }

    #[test]
    fn list_shows_badge_counterpart_and_actions() {
        let lines = request_list_lines(&[request(1, "pending")], ViewerRole::Supervisor);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("[Pending]"));
        assert!(lines[0].contains("Aisyah"));
        assert!(lines[0].ends_with("-> Accept, Decline"));

        let lines = request_list_lines(&[request(1, "pending")], ViewerRole::Student);
        assert!(lines[0].contains("Dr. Tan"));
        assert!(!lines[0].contains("->"));
    }

    #[test]
    fn detail_lists_recommendations_for_rejected() {
        let mut r = request(4, "rejected");
        r.recommended_supervisors = vec![PartyRef {
            id: Some(8),
            name: Some("Prof. Ng".into()),
            email: None,
        }];
        assert_eq!(r.status, RequestStatus::Rejected);
        let lines = request_detail_lines(&r, ViewerRole::Student);
        assert!(lines.iter().any(|l| l == "Recommended supervisors (1):"));
        assert!(lines.iter().any(|l| l == "  - Prof. Ng"));
        assert!(lines.iter().any(|l| l == "Submitted: 2024-03-05 01:30 UTC"));
    }

    #[test]
    fn detail_shows_chat_even_without_actions() {
        let lines = request_detail_lines(&request(2, "pending"), ViewerRole::Student);
        assert!(lines.iter().any(|l| l == "Actions: none"));
        assert!(lines.iter().any(|l| l == "Chat: open"));
    }

    #[test]
    fn long_titles_are_truncated() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
