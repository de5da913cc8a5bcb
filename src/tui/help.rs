use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame, log_path: Option<&str>) {
    let mut lines = vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key_line("tab", 9, "Switch tabs"),
        key_line("r", 11, "Refresh current tab"),
        key_line("?", 11, "Show this help"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw(" or "),
            Span::styled("j/k", Style::default().fg(Color::Magenta)),
            Span::raw("  Navigate"),
        ]),
        Line::from(""),
        Line::from("Requests tab:"),
        key_line("a", 11, "Accept (supervisor)"),
        key_line("d", 11, "Decline (supervisor)"),
        key_line("o", 11, "Accept offer (student)"),
        key_line("x", 11, "Withdraw request (student)"),
        Line::from(""),
        Line::from("Relationships tab:"),
        key_line("enter", 7, "Open meetings, documents and milestones"),
        key_line("y", 11, "Approve pending unbind"),
        key_line("n", 11, "Reject pending unbind"),
        key_line("pgup/pgdn", 3, "Scroll details"),
        Line::from(""),
        Line::from("Actions that are not available for the selected item are ignored."),
    ];
    if let Some(path) = log_path {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::raw("Log file: "),
            Span::styled(path.to_string(), Style::default().fg(Color::Cyan)),
        ]));
    }
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
