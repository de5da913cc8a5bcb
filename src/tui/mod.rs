mod help;
mod state;

use crate::api::ApiClient;
use crate::config::Settings;
use crate::lifecycle::{self, Action, Badge};
use crate::model::{PartyRef, ViewerRole};
use crate::orchestrator::{self, Mutation, Target, UiCommand, UiEvent};
use crate::store::EntityState;
use crate::text_summary;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{
    badge_color, push_wrapped_kv, toast_line, UiState, TAB_COUNT, TAB_HELP, TAB_RELATIONSHIPS,
    TAB_REQUESTS,
};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(settings: Settings) -> Result<()> {
    let client = ApiClient::new(&settings).map_err(|e| anyhow::anyhow!(e.toast_message()))?;
    let role = settings.role;

    let (event_tx, event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let log_path = crate::logging::dashboard_log_path().map(|p| p.display().to_string());

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(role, log_path, event_rx, cmd_tx));

    orchestrator::run_controller(client, role, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }
    Ok(())
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    role: ViewerRole,
    log_path: Option<String>,
    mut event_rx: UnboundedReceiver<UiEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(role);
    let _ = cmd_tx.send(UiCommand::Load(Target::Requests));
    let _ = cmd_tx.send(UiCommand::Load(Target::Relationships));

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            for cmd in state.apply_event(ev) {
                let _ = cmd_tx.send(cmd);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            terminal
                .draw(|f| draw(f.area(), f, &state, log_path.as_deref()))
                .ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Tab) => {
                        state.tab = (state.tab + 1) % TAB_COUNT;
                        state.detail_scroll = 0;
                    }
                    (_, KeyCode::Char('?')) => {
                        state.tab = TAB_HELP;
                    }
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) => state.move_selection(false),
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) => state.move_selection(true),
                    (_, KeyCode::PageUp) => {
                        state.detail_scroll = state.detail_scroll.saturating_sub(5);
                    }
                    (_, KeyCode::PageDown) => {
                        state.detail_scroll = state.detail_scroll.saturating_add(5);
                    }
                    (_, KeyCode::Char('r')) => match state.tab {
                        TAB_REQUESTS => {
                            let _ = cmd_tx.send(UiCommand::Load(Target::Requests));
                        }
                        TAB_RELATIONSHIPS => {
                            let _ = cmd_tx.send(UiCommand::Load(Target::Relationships));
                            if let Some((id, _)) = state.bundle.as_ref() {
                                let _ = cmd_tx.send(UiCommand::Load(Target::Relationship(*id)));
                            }
                        }
                        _ => {}
                    },
                    (_, KeyCode::Char('a')) if state.tab == TAB_REQUESTS => {
                        let m = state.request_mutation(Action::Accept);
                        submit(&mut state, &cmd_tx, m);
                    }
                    (_, KeyCode::Char('d')) if state.tab == TAB_REQUESTS => {
                        let m = state.request_mutation(Action::Decline);
                        submit(&mut state, &cmd_tx, m);
                    }
                    (_, KeyCode::Char('o')) if state.tab == TAB_REQUESTS => {
                        let m = state.request_mutation(Action::AcceptOffer);
                        submit(&mut state, &cmd_tx, m);
                    }
                    (_, KeyCode::Char('x')) if state.tab == TAB_REQUESTS => {
                        let m = state.withdraw_mutation();
                        submit(&mut state, &cmd_tx, m);
                    }
                    (_, KeyCode::Enter) if state.tab == TAB_RELATIONSHIPS => {
                        if let Some(id) = state.selected_relationship().map(|r| r.id) {
                            state.bundle = Some((id, EntityState::default()));
                            state.detail_scroll = 0;
                            let _ = cmd_tx.send(UiCommand::Load(Target::Relationship(id)));
                        }
                    }
                    (_, KeyCode::Char('y')) if state.tab == TAB_RELATIONSHIPS => {
                        let m = state.unbind_mutation(true);
                        submit(&mut state, &cmd_tx, m);
                    }
                    (_, KeyCode::Char('n')) if state.tab == TAB_RELATIONSHIPS => {
                        let m = state.unbind_mutation(false);
                        submit(&mut state, &cmd_tx, m);
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn submit(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>, m: Result<Mutation, String>) {
    match m {
        Ok(m) => {
            state.begin(&m);
            state.info = None;
            let _ = cmd_tx.send(UiCommand::Mutate(m));
        }
        Err(msg) => state.notice(msg),
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, log_path: Option<&str>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Requests"),
        Line::from("Relationships"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("supervision-cli ({})", state.role)),
    )
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_REQUESTS => draw_requests(chunks[1], f, state),
        TAB_RELATIONSHIPS => draw_relationships(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f, log_path),
    }

    let status = match &state.info {
        Some(toast) => toast_line(toast),
        None => Line::from(Span::styled(
            "tab: switch  j/k: move  r: refresh  ?: help  q: quit",
            Style::default().fg(Color::DarkGray),
        )),
    };
    f.render_widget(Paragraph::new(status), chunks[2]);
}

fn badge_span(badge: &Badge) -> Span<'static> {
    Span::styled(
        format!("[{}]", badge.label),
        Style::default().fg(badge_color(badge.color)),
    )
}

fn party_name(p: Option<&PartyRef>) -> String {
    p.map(PartyRef::display_name).unwrap_or_else(|| "-".into())
}

/// Selectable rows, scrolled so the selection stays visible.
fn draw_list<T>(
    area: Rect,
    f: &mut ratatui::Frame,
    title: &str,
    store: &EntityState<Vec<T>>,
    selected: usize,
    row: impl Fn(&T) -> (Badge, String),
) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let Some(items) = store.data.as_ref() else {
        let msg = match &store.error {
            Some(e) => Line::from(Span::styled(e.clone(), Style::default().fg(Color::Red))),
            None => Line::from("Loading…"),
        };
        f.render_widget(Paragraph::new(msg).block(block), area);
        return;
    };
    if items.is_empty() {
        f.render_widget(Paragraph::new("Nothing here yet.").block(block), area);
        return;
    }

    let lines: Vec<Line> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let (badge, text) = row(item);
            let mut line = Line::from(vec![badge_span(&badge), Span::raw(" "), Span::raw(text)]);
            if i == selected {
                line = line.style(Style::default().add_modifier(Modifier::REVERSED));
            }
            line
        })
        .collect();

    let visible = (area.height as usize).saturating_sub(2).max(1);
    let offset = selected.saturating_sub(visible - 1) as u16;
    let title = if store.loading {
        format!("{title} (refreshing…)")
    } else {
        format!("{title} ({})", items.len())
    };
    let p = Paragraph::new(lines)
        .scroll((offset, 0))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn split_panes(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)].as_ref())
        .split(area)
}

fn detail_block(badge: &Badge, busy: bool) -> Block<'static> {
    let mut title = vec![Span::raw("Details "), badge_span(badge)];
    if busy {
        title.push(Span::styled(" working…", Style::default().fg(Color::Yellow)));
    }
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(badge_color(badge.color)))
        .title(Line::from(title))
}

fn tab_strip(tabs: &[lifecycle::Tab]) -> Line<'static> {
    let titles = tabs.iter().map(|t| t.title()).collect::<Vec<_>>().join(" | ");
    Line::from(Span::styled(titles, Style::default().fg(Color::Cyan)))
}

fn draw_requests(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let panes = split_panes(area);
    let role = state.role;
    draw_list(
        panes[0],
        f,
        "Requests",
        &state.requests,
        state.request_selected,
        |r| {
            let counterpart = match role {
                ViewerRole::Student => party_name(r.academician.as_ref()),
                ViewerRole::Supervisor => party_name(r.student.as_ref()),
            };
            let title = r.proposal_title.as_deref().unwrap_or("(untitled)");
            (
                lifecycle::request_badge(&r.status),
                format!("#{} {title} · {counterpart}", r.id),
            )
        },
    );

    let (Some(req), Some(view)) = (state.selected_request(), state.selected_request_view()) else {
        f.render_widget(
            Paragraph::new("Select a request.").block(Block::default().borders(Borders::ALL)),
            panes[1],
        );
        return;
    };

    let mut lines = vec![tab_strip(&view.tabs), Line::from("")];
    lines.extend(
        text_summary::request_detail_lines(req, role)
            .into_iter()
            .map(Line::from),
    );
    lines.push(Line::from(vec![
        Span::styled("Chat: ", Style::default().fg(Color::Gray)),
        Span::raw(if view.chat_enabled { "open" } else { "closed" }),
    ]));
    let keys: Vec<&str> = [
        (Action::Accept, "a: accept"),
        (Action::Decline, "d: decline"),
        (Action::AcceptOffer, "o: accept offer"),
    ]
    .into_iter()
    .filter(|(a, _)| view.actions.contains(a))
    .map(|(_, k)| k)
    .chain(view.can_withdraw.then_some("x: withdraw"))
    .collect();
    if !keys.is_empty() && !state.requests.is_busy() {
        lines.push(Line::from(Span::styled(
            keys.join("  "),
            Style::default().fg(Color::Magenta),
        )));
    }

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((state.detail_scroll, 0))
        .block(detail_block(&view.badge, state.requests.is_busy()));
    f.render_widget(p, panes[1]);
}

fn draw_relationships(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let panes = split_panes(area);
    let role = state.role;
    draw_list(
        panes[0],
        f,
        "Relationships",
        &state.relationships,
        state.relationship_selected,
        |r| {
            let counterpart = match role {
                ViewerRole::Student => party_name(r.academician.as_ref()),
                ViewerRole::Supervisor => party_name(r.student.as_ref()),
            };
            (
                lifecycle::relationship_view(r, role).badge,
                format!("#{} {counterpart} ({:?})", r.id, r.role),
            )
        },
    );

    let (Some(rel), Some(view)) = (
        state.selected_relationship(),
        state.selected_relationship_view(),
    ) else {
        f.render_widget(
            Paragraph::new("Select a relationship.").block(Block::default().borders(Borders::ALL)),
            panes[1],
        );
        return;
    };

    let mut lines = vec![tab_strip(&view.tabs), Line::from("")];
    let opened = state
        .bundle
        .as_ref()
        .filter(|(id, _)| *id == rel.id)
        .map(|(_, b)| b);
    let mut busy = state.relationships.is_busy();
    match opened {
        Some(b) if b.data.is_some() => {
            busy |= b.is_busy();
            if let Some(bundle) = b.data.as_ref() {
                lines.extend(
                    text_summary::relationship_detail_lines(bundle, role)
                        .into_iter()
                        .map(Line::from),
                );
            }
        }
        Some(b) if b.error.is_some() => {
            lines.push(Line::from(Span::styled(
                b.error.clone().unwrap_or_default(),
                Style::default().fg(Color::Red),
            )));
        }
        Some(_) => lines.push(Line::from("Loading…")),
        None => {
            let width = panes[1].width;
            push_wrapped_kv(&mut lines, "Supervisor", &party_name(rel.academician.as_ref()), width);
            push_wrapped_kv(&mut lines, "Student", &party_name(rel.student.as_ref()), width);
            if let Some(unbind) = rel.active_unbind_request.as_ref() {
                push_wrapped_kv(
                    &mut lines,
                    "Unbind reason",
                    unbind.reason.as_deref().unwrap_or("(no reason given)"),
                    width,
                );
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "enter: load meetings, documents and milestones",
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    if let Some(panel) = view.unbind.as_ref() {
        lines.push(Line::from(""));
        let hint = if panel.can_respond {
            "y: approve unbind  n: reject unbind"
        } else {
            "Waiting for the other party to answer the unbind request."
        };
        lines.push(Line::from(Span::styled(hint, Style::default().fg(Color::Magenta))));
    }

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((state.detail_scroll, 0))
        .block(detail_block(&view.badge, busy));
    f.render_widget(p, panes[1]);
}
