use crate::api::Rejection;
use crate::lifecycle::{self, Action, BadgeColor, RelationshipView, RequestView};
use crate::model::{RelationshipBundle, SupervisionRelationship, SupervisionRequest, ViewerRole};
use crate::orchestrator::{Mutation, MutationOutcome, Target, UiCommand, UiEvent};
use crate::store::{EntityState, StoreAction, Toast, ToastLevel};
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};

pub const TAB_REQUESTS: usize = 0;
pub const TAB_RELATIONSHIPS: usize = 1;
pub const TAB_HELP: usize = 2;
pub const TAB_COUNT: usize = 3;

pub struct UiState {
    pub tab: usize,
    pub role: ViewerRole,
    pub info: Option<Toast>,

    pub requests: EntityState<Vec<SupervisionRequest>>,
    pub request_selected: usize,

    pub relationships: EntityState<Vec<SupervisionRelationship>>,
    pub relationship_selected: usize,
    /// Relationship opened with Enter, keyed by id.
    pub bundle: Option<(u64, EntityState<RelationshipBundle>)>,
    pub detail_scroll: u16,
}

impl UiState {
    pub fn new(role: ViewerRole) -> Self {
        Self {
            tab: TAB_REQUESTS,
            role,
            info: None,
            requests: EntityState::default(),
            request_selected: 0,
            relationships: EntityState::default(),
            relationship_selected: 0,
            bundle: None,
            detail_scroll: 0,
        }
    }

    pub fn selected_request(&self) -> Option<&SupervisionRequest> {
        self.requests.data.as_ref()?.get(self.request_selected)
    }

    pub fn selected_relationship(&self) -> Option<&SupervisionRelationship> {
        self.relationships.data.as_ref()?.get(self.relationship_selected)
    }

    pub fn selected_request_view(&self) -> Option<RequestView> {
        self.selected_request()
            .map(|r| lifecycle::request_view(r, self.role))
    }

    /// View of the relationship on screen; the opened bundle wins over the list row.
    pub fn selected_relationship_view(&self) -> Option<RelationshipView> {
        let opened = self.bundle.as_ref().and_then(|(id, b)| {
            let rel = &b.data.as_ref()?.relationship;
            (Some(*id) == self.selected_relationship().map(|r| r.id)).then_some(rel)
        });
        opened
            .or_else(|| self.selected_relationship())
            .map(|r| lifecycle::relationship_view(r, self.role))
    }

    pub fn move_selection(&mut self, down: bool) {
        let (selected, len) = match self.tab {
            TAB_REQUESTS => (
                &mut self.request_selected,
                self.requests.data.as_ref().map_or(0, Vec::len),
            ),
            TAB_RELATIONSHIPS => (
                &mut self.relationship_selected,
                self.relationships.data.as_ref().map_or(0, Vec::len),
            ),
            _ => return,
        };
        if down {
            if *selected + 1 < len {
                *selected += 1;
            }
        } else {
            *selected = selected.saturating_sub(1);
        }
        self.detail_scroll = 0;
    }

    /// Mutation for a request action key, if the selected request allows it.
    pub fn request_mutation(&self, action: Action) -> Result<Mutation, String> {
        let req = self.selected_request().ok_or("No request selected.")?;
        if self.requests.is_busy() {
            return Err("Another action is still running.".into());
        }
        let view = lifecycle::request_view(req, self.role);
        if !view.actions.contains(&action) {
            return Err(format!(
                "{} is not available for a request that is {}.",
                action.label(),
                view.badge.label
            ));
        }
        Ok(match action {
            Action::Accept => Mutation::Accept { request: req.id },
            Action::AcceptOffer => Mutation::AcceptOffer { request: req.id },
            Action::Decline => Mutation::Decline {
                request: req.id,
                rejection: Rejection::default(),
            },
            other => return Err(format!("{} is not available here.", other.label())),
        })
    }

    pub fn withdraw_mutation(&self) -> Result<Mutation, String> {
        let req = self.selected_request().ok_or("No request selected.")?;
        if self.requests.is_busy() {
            return Err("Another action is still running.".into());
        }
        if !lifecycle::request_view(req, self.role).can_withdraw {
            return Err("This request cannot be withdrawn.".into());
        }
        Ok(Mutation::Withdraw { request: req.id })
    }

    pub fn unbind_mutation(&self, approve: bool) -> Result<Mutation, String> {
        let view = self
            .selected_relationship_view()
            .ok_or("No relationship selected.")?;
        if self.relationships.is_busy() {
            return Err("Another action is still running.".into());
        }
        match view.unbind {
            Some(panel) if panel.can_respond => Ok(Mutation::RespondUnbind {
                unbind: panel.unbind_id,
                approve,
            }),
            Some(_) => Err("Waiting for the other party to answer the unbind request.".into()),
            None => Err("There is no unbind request to answer.".into()),
        }
    }

    /// Mark the entity behind `m` as busy until its outcome arrives.
    pub fn begin(&mut self, m: &Mutation) {
        let kind = m.kind();
        match m.target() {
            Target::Requests | Target::Request(_) => {
                self.requests.reduce(StoreAction::MutationStarted(kind))
            }
            Target::Relationship(id) if self.bundle_is(id) => {
                if let Some((_, b)) = self.bundle.as_mut() {
                    b.reduce(StoreAction::MutationStarted(kind));
                }
            }
            Target::Relationships | Target::Relationship(_) => {
                self.relationships.reduce(StoreAction::MutationStarted(kind))
            }
        }
    }

    fn bundle_is(&self, id: u64) -> bool {
        self.bundle.as_ref().is_some_and(|(bid, _)| *bid == id)
    }

    fn finish(&mut self, outcome: &MutationOutcome) {
        match outcome.target {
            Target::Requests | Target::Request(_) => self.requests.reduce(outcome.store_action()),
            Target::Relationship(id) if self.bundle_is(id) => {
                if let Some((_, b)) = self.bundle.as_mut() {
                    b.reduce(outcome.store_action());
                }
            }
            Target::Relationships | Target::Relationship(_) => {
                self.relationships.reduce(outcome.store_action())
            }
        }
    }

    /// Apply a controller event; returns any follow-up loads the UI should ask for.
    pub fn apply_event(&mut self, ev: UiEvent) -> Vec<UiCommand> {
        let mut follow_up = Vec::new();
        match ev {
            UiEvent::Requests(action) => {
                self.requests.reduce(action);
                let len = self.requests.data.as_ref().map_or(0, Vec::len);
                self.request_selected = self.request_selected.min(len.saturating_sub(1));
            }
            UiEvent::Relationships(action) => {
                self.relationships.reduce(action);
                let len = self.relationships.data.as_ref().map_or(0, Vec::len);
                self.relationship_selected =
                    self.relationship_selected.min(len.saturating_sub(1));
            }
            UiEvent::Bundle(id, action) => {
                if !self.bundle_is(id) {
                    self.bundle = Some((id, EntityState::default()));
                }
                if let Some((_, b)) = self.bundle.as_mut() {
                    b.reduce(action);
                }
            }
            UiEvent::MutationFinished(outcome) => {
                self.finish(&outcome);
                // Unbind answers refresh the list; keep an opened bundle in step.
                if outcome.succeeded() && outcome.target == Target::Relationships {
                    if let Some((id, _)) = self.bundle.as_ref() {
                        follow_up.push(UiCommand::Load(Target::Relationship(*id)));
                    }
                }
            }
        }
        self.collect_toasts();
        follow_up
    }

    fn collect_toasts(&mut self) {
        let mut toasts = self.requests.drain_toasts();
        toasts.extend(self.relationships.drain_toasts());
        if let Some((_, b)) = self.bundle.as_mut() {
            toasts.extend(b.drain_toasts());
        }
        if let Some(last) = toasts.pop() {
            self.info = Some(last);
        }
    }

    pub fn notice(&mut self, message: impl Into<String>) {
        self.info = Some(Toast::error(message));
    }
}

pub fn badge_color(color: BadgeColor) -> Color {
    match color {
        BadgeColor::Amber => Color::Yellow,
        BadgeColor::Indigo => Color::Blue,
        BadgeColor::Emerald => Color::Green,
        BadgeColor::Rose => Color::Red,
        BadgeColor::Slate => Color::Gray,
    }
}

pub fn toast_line(toast: &Toast) -> Line<'static> {
    let color = match toast.level {
        ToastLevel::Success => Color::Green,
        ToastLevel::Error => Color::Red,
    };
    Line::from(vec![Span::styled(
        toast.message.clone(),
        Style::default().fg(color),
    )])
}

pub fn push_wrapped_kv(out: &mut Vec<Line<'static>>, label: &str, value: &str, area_width: u16) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ActionKind;

    fn requests(statuses: &[&str]) -> Vec<SupervisionRequest> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, s)| {
                serde_json::from_value(serde_json::json!({ "id": i as u64 + 1, "status": s }))
                    .unwrap()
            })
            .collect()
    }

    fn loaded(role: ViewerRole, statuses: &[&str]) -> UiState {
        let mut state = UiState::new(role);
        state.apply_event(UiEvent::Requests(StoreAction::FetchSucceeded(requests(statuses))));
        state
    }

    #[test]
    fn accept_only_offered_when_allowed() {
        let state = loaded(ViewerRole::Supervisor, &["pending", "accepted"]);
        assert!(matches!(
            state.request_mutation(Action::Accept),
            Ok(Mutation::Accept { request: 1 })
        ));

        let mut state = state;
        state.move_selection(true);
        let err = state.request_mutation(Action::Accept).unwrap_err();
        assert!(err.contains("Accepted"), "{err}");
    }

    #[test]
    fn in_flight_mutation_blocks_further_actions() {
        let mut state = loaded(ViewerRole::Supervisor, &["pending"]);
        let m = state.request_mutation(Action::Decline).unwrap();
        state.begin(&m);
        assert_eq!(state.requests.in_flight, Some(ActionKind::Decline));
        assert_eq!(
            state.request_mutation(Action::Accept).unwrap_err(),
            "Another action is still running."
        );
    }

    #[test]
    fn failed_mutation_surfaces_toast_and_unlocks() {
        let mut state = loaded(ViewerRole::Student, &["pending"]);
        let m = state.withdraw_mutation().unwrap();
        state.begin(&m);
        state.apply_event(UiEvent::MutationFinished(MutationOutcome {
            kind: ActionKind::Withdraw,
            target: Target::Request(1),
            toast: Toast::error("Too late."),
        }));
        assert!(!state.requests.is_busy());
        assert_eq!(state.info.as_ref().map(|t| t.message.as_str()), Some("Too late."));
        // Data untouched until the server says otherwise.
        assert_eq!(state.selected_request().map(|r| r.status.as_str()), Some("pending"));
    }

    #[test]
    fn selection_is_clamped_after_refetch() {
        let mut state = loaded(ViewerRole::Supervisor, &["pending", "pending", "pending"]);
        state.move_selection(true);
        state.move_selection(true);
        state.move_selection(true);
        assert_eq!(state.request_selected, 2);
        state.apply_event(UiEvent::Requests(StoreAction::FetchSucceeded(requests(&["pending"]))));
        assert_eq!(state.request_selected, 0);
    }

    #[test]
    fn unbind_answer_requires_counterpart() {
        let rel: SupervisionRelationship = serde_json::from_value(serde_json::json!({
            "id": 9,
            "status": "active",
            "active_unbind_request": { "id": 4, "initiated_by": "student", "status": "pending" }
        }))
        .unwrap();

        let mut supervisor = UiState::new(ViewerRole::Supervisor);
        supervisor.tab = TAB_RELATIONSHIPS;
        supervisor.apply_event(UiEvent::Relationships(StoreAction::FetchSucceeded(vec![
            rel.clone(),
        ])));
        assert!(matches!(
            supervisor.unbind_mutation(true),
            Ok(Mutation::RespondUnbind { unbind: 4, approve: true })
        ));

        let mut student = UiState::new(ViewerRole::Student);
        student.apply_event(UiEvent::Relationships(StoreAction::FetchSucceeded(vec![rel])));
        assert!(student.unbind_mutation(false).is_err());
    }

    #[test]
    fn unbind_success_reloads_open_bundle() {
        let mut state = UiState::new(ViewerRole::Supervisor);
        state.apply_event(UiEvent::Bundle(9, StoreAction::FetchStarted));
        let follow_up = state.apply_event(UiEvent::MutationFinished(MutationOutcome {
            kind: ActionKind::RespondUnbind,
            target: Target::Relationships,
            toast: Toast::success("Unbind approved."),
        }));
        assert!(matches!(
            follow_up.as_slice(),
            [UiCommand::Load(Target::Relationship(9))]
        ));
    }
}
