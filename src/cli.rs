use crate::api::{ApiClient, CoSupervisorInvite, NewMeeting, NewRequest, Rejection};
use crate::config::{self, Overrides, Settings};
use crate::lifecycle::{self, Action, InvitationAction, RelationshipView};
use crate::model::{CoSupervisorInvitation, ViewerRole};
use crate::orchestrator::{self, Mutation, Target};
use crate::source::{self, SourceKind};
use crate::store::{EntityState, StoreAction, ToastLevel};
use crate::text_summary;
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "supervision-cli",
    version,
    about = "Manage supervision requests, relationships and co-supervision from the terminal"
)]
pub struct Cli {
    /// Base URL of the supervision API (e.g. https://portal.example.edu/api)
    #[arg(long, env = "SUPERVISION_BASE_URL")]
    pub base_url: Option<String>,

    /// API bearer token
    #[arg(long, env = "SUPERVISION_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Which side you are acting as
    #[arg(long, value_enum, env = "SUPERVISION_ROLE")]
    pub role: Option<ViewerRole>,

    /// Your user id (needed to answer co-supervisor invitations)
    #[arg(long, env = "SUPERVISION_USER_ID")]
    pub user_id: Option<u64>,

    /// HTTP timeout per request
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// Path to a config file (defaults to the platform config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Also write the JSON snapshot to this file
    #[arg(long, global = true)]
    pub export_json: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Supervision requests (proposals)
    #[command(subcommand)]
    Requests(RequestCmd),
    /// Supervision relationships
    #[command(subcommand)]
    Relationships(RelationshipCmd),
    /// Co-supervisor invitations
    #[command(subcommand)]
    Cosupervisor(CoSupervisorCmd),
    /// Relationship documents
    #[command(subcommand)]
    Documents(DocumentCmd),
    /// Research items of a relationship
    Research { relationship: u64 },
    /// Milestones of a relationship
    Milestones { relationship: u64 },
    /// Relationship meetings
    #[command(subcommand)]
    Meetings(MeetingCmd),
    /// Ending a relationship
    #[command(subcommand)]
    Unbind(UnbindCmd),
    /// Find prospective supervisors
    Candidates {
        /// Sources to query (repeatable); defaults to shortlist and connections
        #[arg(long, value_enum)]
        source: Vec<SourceKind>,
        /// Search text, required for the search source
        #[arg(long)]
        query: Option<String>,
    },
    /// Interactive dashboard
    #[cfg(feature = "tui")]
    Dashboard,
}

#[derive(Debug, Subcommand, Clone)]
pub enum RequestCmd {
    List,
    Show {
        id: u64,
    },
    /// Submit a proposal to a supervisor
    Submit {
        #[arg(long)]
        supervisor: u64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        motivation: String,
        /// Files to attach (repeatable)
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },
    Accept {
        id: u64,
    },
    /// Decline a request, optionally pointing the student elsewhere
    Reject {
        id: u64,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long)]
        note: Option<String>,
        /// Academician ids to recommend (repeatable)
        #[arg(long = "recommend")]
        recommend: Vec<u64>,
    },
    /// Withdraw your own request
    Cancel {
        id: u64,
    },
    /// Take up a supervisor's offer
    AcceptOffer {
        id: u64,
    },
}

#[derive(Debug, Subcommand, Clone)]
pub enum RelationshipCmd {
    List,
    Show { id: u64 },
}

#[derive(Debug, Subcommand, Clone)]
pub enum CoSupervisorCmd {
    List {
        relationship: u64,
    },
    Invite {
        relationship: u64,
        #[arg(long)]
        academician: u64,
        #[arg(long)]
        message: Option<String>,
    },
    /// Answer an invitation addressed to you
    Respond {
        invitation: u64,
        /// Relationship the invitation belongs to
        #[arg(long)]
        relationship: u64,
        #[arg(long)]
        decline: bool,
    },
    /// Sign off on an invitation the invitee accepted
    Approve {
        invitation: u64,
        /// Relationship the invitation belongs to
        #[arg(long)]
        relationship: u64,
        #[arg(long)]
        reject: bool,
    },
}

#[derive(Debug, Subcommand, Clone)]
pub enum DocumentCmd {
    List {
        relationship: u64,
    },
    Upload {
        relationship: u64,
        file: PathBuf,
        #[arg(long)]
        folder: Option<String>,
    },
}

#[derive(Debug, Subcommand, Clone)]
pub enum MeetingCmd {
    List {
        relationship: u64,
    },
    Schedule {
        relationship: u64,
        #[arg(long)]
        title: String,
        /// RFC 3339 start time, e.g. 2024-05-02T10:00:00+08:00
        #[arg(long)]
        at: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        agenda: Option<String>,
    },
}

#[derive(Debug, Subcommand, Clone)]
pub enum UnbindCmd {
    Request {
        relationship: u64,
        #[arg(long)]
        reason: String,
    },
    Approve {
        id: u64,
        /// Relationship the unbind request was raised on
        #[arg(long)]
        relationship: u64,
    },
    Reject {
        id: u64,
        #[arg(long)]
        relationship: u64,
    },
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config_path: self.config.clone(),
            base_url: self.base_url.clone(),
            token: self.token.clone(),
            role: self.role,
            user_id: self.user_id,
            timeout: self.timeout.map(Into::into),
        }
    }

    /// True when this invocation hands the terminal to the dashboard.
    pub fn opens_dashboard(&self) -> bool {
        #[cfg(feature = "tui")]
        {
            matches!(self.command, None | Some(Command::Dashboard)) && !self.json
        }
        #[cfg(not(feature = "tui"))]
        {
            false
        }
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let settings = config::resolve(args.overrides())?;

    #[cfg(feature = "tui")]
    if args.opens_dashboard() {
        return crate::tui::run(settings).await;
    }

    let client = ApiClient::new(&settings).map_err(|e| anyhow!(e.toast_message()))?;
    let command = args
        .command
        .clone()
        .unwrap_or(Command::Requests(RequestCmd::List));

    let (out_tx, out_handle) = spawn_output_writer();
    let ctx = Ctx {
        args: &args,
        settings: &settings,
        client: &client,
        out: out_tx,
    };
    let res = dispatch(&ctx, command).await;
    drop(ctx);
    let _ = out_handle.await;
    res
}

struct Ctx<'a> {
    args: &'a Cli,
    settings: &'a Settings,
    client: &'a ApiClient,
    out: mpsc::UnboundedSender<OutputLine>,
}

impl Ctx<'_> {
    fn role(&self) -> ViewerRole {
        self.settings.role
    }

    /// Print either the text lines or the JSON snapshot, and export the snapshot if asked.
    fn emit(&self, lines: Vec<String>, snapshot: serde_json::Value) -> Result<()> {
        if let Some(path) = self.args.export_json.as_deref() {
            crate::storage::export_json(path, &snapshot)?;
            let _ = self
                .out
                .send(OutputLine::Stderr(format!("Exported: {}", path.display())));
        }
        if self.args.json {
            let _ = self
                .out
                .send(OutputLine::Stdout(serde_json::to_string_pretty(&snapshot)?));
        } else {
            for line in lines {
                let _ = self.out.send(OutputLine::Stdout(line));
            }
        }
        Ok(())
    }

    async fn load<T>(
        &self,
        context: &str,
        fut: impl Future<Output = Result<T, crate::api::ApiError>>,
    ) -> Result<T> {
        orchestrator::fetch(context, orchestrator::interruptible(fut))
            .await
            .map_err(anyhow::Error::msg)
    }
}

async fn dispatch(ctx: &Ctx<'_>, command: Command) -> Result<()> {
    let role = ctx.role();
    match command {
        Command::Requests(cmd) => match cmd {
            RequestCmd::List => refresh(ctx, Target::Requests).await,
            RequestCmd::Show { id } => refresh(ctx, Target::Request(id)).await,
            RequestCmd::Submit {
                supervisor,
                title,
                motivation,
                attachments,
            } => {
                if role != ViewerRole::Student {
                    bail!("Only students can submit supervision requests.");
                }
                mutate(
                    ctx,
                    Mutation::Submit(NewRequest {
                        academician_id: supervisor,
                        proposal_title: title,
                        motivation,
                        attachments,
                    }),
                )
                .await
            }
            RequestCmd::Accept { id } => {
                ensure_request_action(ctx, id, Action::Accept).await?;
                mutate(ctx, Mutation::Accept { request: id }).await
            }
            RequestCmd::AcceptOffer { id } => {
                ensure_request_action(ctx, id, Action::AcceptOffer).await?;
                mutate(ctx, Mutation::AcceptOffer { request: id }).await
            }
            RequestCmd::Reject {
                id,
                reason,
                note,
                recommend,
            } => {
                ensure_request_action(ctx, id, Action::Decline).await?;
                let rejection = Rejection {
                    reason,
                    note,
                    recommended_supervisors: recommend,
                };
                mutate(ctx, Mutation::Decline { request: id, rejection }).await
            }
            RequestCmd::Cancel { id } => {
                let req = ctx.load("load request", ctx.client.get_request(id)).await?;
                if !lifecycle::request_view(&req, role).can_withdraw {
                    bail!(
                        "A request that is {} cannot be withdrawn.",
                        lifecycle::request_badge(&req.status).label
                    );
                }
                mutate(ctx, Mutation::Withdraw { request: id }).await
            }
        },
        Command::Relationships(cmd) => match cmd {
            RelationshipCmd::List => refresh(ctx, Target::Relationships).await,
            RelationshipCmd::Show { id } => refresh(ctx, Target::Relationship(id)).await,
        },
        Command::Cosupervisor(cmd) => match cmd {
            CoSupervisorCmd::List { relationship } => {
                let invitations = ctx
                    .load(
                        "load invitations",
                        ctx.client.list_invitations(relationship),
                    )
                    .await?;
                let lines = text_summary::invitation_lines(&invitations, ctx.settings.user_id);
                let snapshot = json!(invitations
                    .iter()
                    .map(|inv| json!({
                        "invitation": inv,
                        "badge": lifecycle::invitation_badge(&inv.status),
                        "actions": lifecycle::invitation_actions(inv, ctx.settings.user_id),
                    }))
                    .collect::<Vec<_>>());
                ctx.emit(lines, snapshot)
            }
            CoSupervisorCmd::Invite {
                relationship,
                academician,
                message,
            } => {
                ensure_relationship_action(ctx, relationship, Action::InviteCoSupervisor).await?;
                mutate(
                    ctx,
                    Mutation::InviteCoSupervisor {
                        relationship,
                        invite: CoSupervisorInvite {
                            academician_id: academician,
                            message,
                        },
                    },
                )
                .await
            }
            CoSupervisorCmd::Respond {
                invitation,
                relationship,
                decline,
            } => {
                let action = if decline {
                    InvitationAction::Decline
                } else {
                    InvitationAction::Accept
                };
                ensure_invitation_action(ctx, relationship, invitation, action).await?;
                mutate(
                    ctx,
                    Mutation::RespondInvitation {
                        invitation,
                        accept: !decline,
                    },
                )
                .await
            }
            CoSupervisorCmd::Approve {
                invitation,
                relationship,
                reject,
            } => {
                let action = if reject {
                    InvitationAction::Reject
                } else {
                    InvitationAction::Approve
                };
                ensure_invitation_action(ctx, relationship, invitation, action).await?;
                mutate(
                    ctx,
                    Mutation::ApproveInvitation {
                        invitation,
                        approve: !reject,
                    },
                )
                .await
            }
        },
        Command::Documents(cmd) => match cmd {
            DocumentCmd::List { relationship } => {
                let docs = ctx
                    .load("load documents", ctx.client.list_documents(relationship))
                    .await?;
                ctx.emit(text_summary::document_lines(&docs), json!(docs))
            }
            DocumentCmd::Upload {
                relationship,
                file,
                folder,
            } => {
                ensure_relationship_action(ctx, relationship, Action::UploadDocument).await?;
                mutate(
                    ctx,
                    Mutation::UploadDocument {
                        relationship,
                        path: file,
                        folder,
                    },
                )
                .await
            }
        },
        Command::Research { relationship } => {
            let items = ctx
                .load("load research", ctx.client.list_research(relationship))
                .await?;
            ctx.emit(text_summary::research_lines(&items), json!(items))
        }
        Command::Milestones { relationship } => {
            let items = ctx
                .load("load milestones", ctx.client.list_milestones(relationship))
                .await?;
            ctx.emit(text_summary::milestone_lines(&items), json!(items))
        }
        Command::Meetings(cmd) => match cmd {
            MeetingCmd::List { relationship } => {
                let meetings = ctx
                    .load("load meetings", ctx.client.list_meetings(relationship))
                    .await?;
                ctx.emit(text_summary::meeting_lines(&meetings), json!(meetings))
            }
            MeetingCmd::Schedule {
                relationship,
                title,
                at,
                location,
                url,
                agenda,
            } => {
                let scheduled_for = parse_start_time(&at)?;
                ensure_relationship_action(ctx, relationship, Action::ScheduleMeeting).await?;
                mutate(
                    ctx,
                    Mutation::ScheduleMeeting {
                        relationship,
                        meeting: NewMeeting {
                            title,
                            scheduled_for,
                            location,
                            meeting_url: url,
                            agenda,
                        },
                    },
                )
                .await
            }
        },
        Command::Unbind(cmd) => match cmd {
            UnbindCmd::Request {
                relationship,
                reason,
            } => {
                ensure_relationship_action(ctx, relationship, Action::RequestUnbind).await?;
                mutate(
                    ctx,
                    Mutation::RequestUnbind {
                        relationship,
                        reason,
                    },
                )
                .await
            }
            UnbindCmd::Approve { id, relationship } => {
                ensure_unbind_response(ctx, relationship, id).await?;
                mutate(ctx, Mutation::RespondUnbind { unbind: id, approve: true }).await
            }
            UnbindCmd::Reject { id, relationship } => {
                ensure_unbind_response(ctx, relationship, id).await?;
                mutate(ctx, Mutation::RespondUnbind { unbind: id, approve: false }).await
            }
        },
        Command::Candidates { source, query } => candidates(ctx, source, query).await,
        #[cfg(feature = "tui")]
        Command::Dashboard => bail!("The dashboard cannot be combined with --json."),
    }
}

/// Fetch and print the entity behind `target`.
async fn refresh(ctx: &Ctx<'_>, target: Target) -> Result<()> {
    let role = ctx.role();
    match target {
        Target::Requests => {
            let mut list = ctx.load("load requests", ctx.client.list_requests()).await?;
            lifecycle::sort_for_display(&mut list);
            let snapshot = json!(list
                .iter()
                .map(|r| json!({ "request": r, "view": lifecycle::request_view(r, role) }))
                .collect::<Vec<_>>());
            ctx.emit(text_summary::request_list_lines(&list, role), snapshot)
        }
        Target::Request(id) => {
            let req = ctx.load("load request", ctx.client.get_request(id)).await?;
            let snapshot = json!({ "request": &req, "view": lifecycle::request_view(&req, role) });
            ctx.emit(text_summary::request_detail_lines(&req, role), snapshot)
        }
        Target::Relationships => {
            let list = ctx
                .load("load relationships", ctx.client.list_relationships())
                .await?;
            let snapshot = json!(list
                .iter()
                .map(|r| {
                    json!({ "relationship": r, "view": lifecycle::relationship_view(r, role) })
                })
                .collect::<Vec<_>>());
            ctx.emit(text_summary::relationship_list_lines(&list, role), snapshot)
        }
        Target::Relationship(id) => {
            let bundle = ctx
                .load("load relationship", ctx.client.load_relationship_bundle(id))
                .await?;
            let view = lifecycle::relationship_view(&bundle.relationship, role);
            let snapshot = json!({ "bundle": &bundle, "view": view });
            ctx.emit(text_summary::relationship_detail_lines(&bundle, role), snapshot)
        }
    }
}

/// Run a mutation through the reducer, toast the outcome, then show the re-fetched entity.
async fn mutate(ctx: &Ctx<'_>, m: Mutation) -> Result<()> {
    let mut state: EntityState<()> = EntityState::default();
    state.reduce(StoreAction::MutationStarted(m.kind()));

    let outcome = tokio::select! {
        outcome = orchestrator::run_mutation(ctx.client, ctx.role(), &m) => outcome,
        _ = tokio::signal::ctrl_c() => bail!("Interrupted."),
    };
    state.reduce(outcome.store_action());

    for toast in state.drain_toasts() {
        match toast.level {
            ToastLevel::Success => {
                let _ = ctx.out.send(OutputLine::Stderr(toast.message));
            }
            ToastLevel::Error => return Err(anyhow::Error::msg(toast.message)),
        }
    }

    if state.needs_refresh() {
        refresh(ctx, outcome.target).await?;
    }
    Ok(())
}

async fn ensure_request_action(ctx: &Ctx<'_>, id: u64, action: Action) -> Result<()> {
    let req = ctx.load("load request", ctx.client.get_request(id)).await?;
    let view = lifecycle::request_view(&req, ctx.role());
    if !view.actions.contains(&action) {
        bail!(
            "{} is not available to a {} for a request that is {}.",
            action.label(),
            ctx.role(),
            view.badge.label
        );
    }
    Ok(())
}

async fn ensure_relationship_action(ctx: &Ctx<'_>, id: u64, action: Action) -> Result<()> {
    let rel = ctx
        .load("load relationship", ctx.client.get_relationship(id))
        .await?;
    let view = lifecycle::relationship_view(&rel, ctx.role());
    if !view.actions.contains(&action) {
        bail!(
            "{} is not available to a {} while the relationship is {}.",
            action.label(),
            ctx.role(),
            view.badge.label
        );
    }
    Ok(())
}

async fn ensure_invitation_action(
    ctx: &Ctx<'_>,
    relationship: u64,
    invitation: u64,
    action: InvitationAction,
) -> Result<()> {
    let invitations = ctx
        .load(
            "load invitations",
            ctx.client.list_invitations(relationship),
        )
        .await?;
    check_invitation_action(&invitations, invitation, ctx.settings.user_id, action)
}

fn check_invitation_action(
    invitations: &[CoSupervisorInvitation],
    invitation: u64,
    viewer_id: Option<u64>,
    action: InvitationAction,
) -> Result<()> {
    let inv = invitations
        .iter()
        .find(|inv| inv.id == invitation)
        .with_context(|| format!("invitation #{invitation} is not part of this relationship"))?;
    if viewer_id.is_none() {
        bail!("Set --user-id (or user_id in the config file) to answer invitations.");
    }
    if !lifecycle::invitation_actions(inv, viewer_id).contains(&action) {
        bail!(
            "You cannot {} an invitation that is {}.",
            format!("{action:?}").to_lowercase(),
            lifecycle::invitation_badge(&inv.status).label
        );
    }
    Ok(())
}

async fn ensure_unbind_response(ctx: &Ctx<'_>, relationship: u64, unbind: u64) -> Result<()> {
    let rel = ctx
        .load("load relationship", ctx.client.get_relationship(relationship))
        .await?;
    check_unbind_response(&lifecycle::relationship_view(&rel, ctx.role()), unbind)
}

fn check_unbind_response(view: &RelationshipView, unbind: u64) -> Result<()> {
    match view.unbind.as_ref() {
        Some(panel) if panel.unbind_id != unbind => bail!(
            "Unbind request #{unbind} is not the open request on this relationship (#{} is).",
            panel.unbind_id
        ),
        Some(panel) if panel.can_respond => Ok(()),
        Some(_) => bail!("Only the other party can answer this unbind request."),
        None => bail!("This relationship has no open unbind request."),
    }
}

fn parse_start_time(raw: &str) -> Result<String> {
    let parsed = OffsetDateTime::parse(raw.trim(), &Rfc3339)
        .with_context(|| format!("invalid meeting time {raw:?}; expected RFC 3339"))?;
    parsed.format(&Rfc3339).context("format meeting time")
}

async fn candidates(ctx: &Ctx<'_>, sources: Vec<SourceKind>, query: Option<String>) -> Result<()> {
    let mut sources = sources;
    if sources.is_empty() {
        sources = vec![SourceKind::Shortlist, SourceKind::Connection];
        if query.is_some() {
            sources.push(SourceKind::Search);
        }
    }

    let mut tagged = Vec::new();
    for kind in sources {
        let batch = match kind {
            SourceKind::Shortlist => ctx.load("load shortlist", ctx.client.shortlist()).await?,
            SourceKind::Connection => {
                ctx.load("load connections", ctx.client.connections())
                    .await?
            }
            SourceKind::Search => {
                let q = query
                    .as_deref()
                    .filter(|q| !q.trim().is_empty())
                    .context("--query is required when searching")?;
                ctx.load("search academicians", ctx.client.search_academicians(q))
                    .await?
            }
        };
        tagged.extend(batch);
    }

    let merged = source::merge(tagged);
    ctx.emit(text_summary::candidate_lines(&merged), json!(merged))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_subcommands_and_globals() {
        let cli = Cli::try_parse_from([
            "supervision-cli",
            "--role",
            "supervisor",
            "requests",
            "reject",
            "12",
            "--reason",
            "capacity",
            "--recommend",
            "3",
            "--recommend",
            "4",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.role, Some(ViewerRole::Supervisor));
        assert!(cli.json);
        match cli.command {
            Some(Command::Requests(RequestCmd::Reject { id, recommend, .. })) => {
                assert_eq!(id, 12);
                assert_eq!(recommend, vec![3, 4]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn timeout_flag_feeds_overrides() {
        let cli = Cli::try_parse_from([
            "supervision-cli",
            "--timeout",
            "5s",
            "relationships",
            "list",
        ])
        .unwrap();
        assert_eq!(
            cli.overrides().timeout,
            Some(std::time::Duration::from_secs(5))
        );
    }

    #[test]
    fn meeting_time_must_be_rfc3339() {
        assert_eq!(
            parse_start_time("2024-05-02T10:00:00+08:00").unwrap(),
            "2024-05-02T10:00:00+08:00"
        );
        assert!(parse_start_time("next monday").is_err());
    }

    #[test]
    fn unbind_flags_require_relationship() {
        assert!(Cli::try_parse_from(["supervision-cli", "unbind", "approve", "4"]).is_err());
        let cli = Cli::try_parse_from([
            "supervision-cli",
            "unbind",
            "reject",
            "4",
            "--relationship",
            "9",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Unbind(UnbindCmd::Reject { id: 4, relationship: 9 }))
        ));
    }

    fn relationship(initiated_by: &str) -> crate::model::SupervisionRelationship {
        serde_json::from_value(json!({
            "id": 9,
            "status": "active",
            "active_unbind_request": { "id": 4, "initiated_by": initiated_by }
        }))
        .unwrap()
    }

    #[test]
    fn unbind_answer_is_checked_against_the_open_request() {
        let view = lifecycle::relationship_view(&relationship("student"), ViewerRole::Supervisor);
        assert!(check_unbind_response(&view, 4).is_ok());
        assert!(check_unbind_response(&view, 5).is_err());

        let own = lifecycle::relationship_view(&relationship("student"), ViewerRole::Student);
        let err = check_unbind_response(&own, 4).unwrap_err();
        assert!(err.to_string().contains("other party"), "{err}");
    }

    #[test]
    fn invitation_answer_is_checked_against_viewer() {
        let invitations: Vec<CoSupervisorInvitation> = serde_json::from_value(json!([
            { "id": 3, "status": "pending", "invitee_id": 21, "approver_id": 7 }
        ]))
        .unwrap();

        let check = |id, viewer, action| check_invitation_action(&invitations, id, viewer, action);
        assert!(check(3, Some(21), InvitationAction::Accept).is_ok());
        assert!(check(3, Some(7), InvitationAction::Accept).is_err());
        assert!(check(3, Some(7), InvitationAction::Approve).is_err());
        assert!(check(3, None, InvitationAction::Accept).is_err());
        assert!(check(8, Some(21), InvitationAction::Accept).is_err());
    }

    #[cfg(feature = "tui")]
    #[test]
    fn bare_invocation_opens_dashboard_unless_json() {
        let cli = Cli::try_parse_from(["supervision-cli"]).unwrap();
        assert!(cli.opens_dashboard());
        let cli = Cli::try_parse_from(["supervision-cli", "--json"]).unwrap();
        assert!(!cli.opens_dashboard());
    }
}
