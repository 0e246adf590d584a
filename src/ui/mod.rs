use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

pub mod layout;

use crate::app::{App, Field, Focus, InputMode, StatusLevel};
use crate::domain::Operation;
use crate::wallet::Phase;

pub fn draw(f: &mut Frame, app: &App) {
    let areas = layout::areas(f.size());

    draw_header(f, areas.header, app);
    draw_wallet(f, areas.wallet, app);
    draw_form(f, areas.form, app);
    draw_actions(f, areas.actions, app);
    draw_activity(f, areas.activity, app);
    draw_status_line(f, areas.status_line, app);
    draw_command_line(f, areas.command_line, app);
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let (phase_text, phase_color) = match app.phase {
        Phase::Connected => ("connected", Color::LightGreen),
        Phase::AwaitingChainSwitch => ("awaiting chain switch", Color::Yellow),
        Phase::Disconnected => ("disconnected", Color::DarkGray),
    };
    let endpoint_color = if app.endpoint_ready {
        Color::White
    } else {
        Color::DarkGray
    };

    let title = Line::from(vec![
        Span::styled(
            "namereg",
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("RPC ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.endpoint.clone(), Style::default().fg(endpoint_color)),
        Span::raw("  "),
        Span::styled("Chain ", Style::default().fg(Color::DarkGray)),
        Span::raw(app.target_chain_id.to_string()),
        Span::raw("  "),
        Span::styled("Contract ", Style::default().fg(Color::DarkGray)),
        Span::raw(short_addr(&app.contract.to_string())),
        Span::raw("  "),
        Span::styled(phase_text, Style::default().fg(phase_color)),
    ]);

    let paragraph = Paragraph::new(title).block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn draw_wallet(f: &mut Frame, area: Rect, app: &App) {
    let account = app
        .account
        .map(|account| account.to_string())
        .unwrap_or_else(|| "--".to_string());

    let lines = vec![
        Line::from(vec![
            Span::styled("Your Wallet ", Style::default().fg(Color::DarkGray)),
            Span::raw(account),
        ]),
        Line::from(vec![
            Span::styled("Connector ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("{}  ", app.connector)),
            Span::styled("Reconnects ", Style::default().fg(Color::DarkGray)),
            Span::raw(app.reconnect_attempts.to_string()),
        ]),
        Line::from(button(app.connect_label(), app.focus == Focus::Connect)),
    ];

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Wallet"),
    );
    f.render_widget(paragraph, area);
}

fn draw_form(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().borders(Borders::ALL).title("Form");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(inner);

    for (field, row) in Field::ALL.iter().zip(rows.iter()) {
        let focused = app.focus == Focus::Field(*field);
        let editing = app.input_mode == InputMode::Editing(*field);
        let value = if editing {
            format!("{}▏", app.input)
        } else {
            app.field_value(*field).to_string()
        };
        let border_style = if editing {
            Style::default().fg(Color::Yellow)
        } else if focused {
            Style::default().fg(Color::LightCyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let input = Paragraph::new(value).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(field.title()),
        );
        f.render_widget(input, *row);
    }
}

fn draw_actions(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    for operation in Operation::ALL {
        let label = match operation {
            Operation::Register => "Register",
            Operation::Renew => "Renew",
            Operation::Cancel => "Cancel",
        };
        let label = if app.pending.contains(&operation) {
            format!("{label}…")
        } else {
            label.to_string()
        };
        spans.extend(button(&label, app.focus == Focus::Action(operation)));
        spans.push(Span::raw("  "));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Actions"));
    f.render_widget(paragraph, area);
}

fn draw_activity(f: &mut Frame, area: Rect, app: &App) {
    let visible = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = app
        .activity
        .iter()
        .rev()
        .take(visible)
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{} ", entry.at),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(entry.text.clone(), level_style(entry.level)),
            ]))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Activity"));
    f.render_widget(list, area);
}

fn draw_status_line(f: &mut Frame, area: Rect, app: &App) {
    let line = match app.status_text() {
        Some((text, level)) => Line::from(Span::styled(text.to_string(), level_style(level))),
        None => Line::from(Span::styled(
            "Tab focus  Enter select  c connect  r register  n renew  x cancel  y copy  : command  q quit",
            Style::default().fg(Color::DarkGray),
        )),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn draw_command_line(f: &mut Frame, area: Rect, app: &App) {
    let content = match app.input_mode {
        InputMode::Command => Line::from(vec![
            Span::styled(": ", Style::default().fg(Color::Yellow)),
            Span::raw(app.input.clone()),
            Span::styled(
                "  register | renew | cancel | connect | name <s> | blocks <n> | amount <wei> | hash [s]",
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        InputMode::Editing(field) => Line::from(vec![
            Span::styled(
                format!("> {} ", field.title()),
                Style::default().fg(Color::LightCyan),
            ),
            Span::styled("(Enter=ok Esc=cancel)", Style::default().fg(Color::DarkGray)),
        ]),
        InputMode::Normal => Line::from(""),
    };
    f.render_widget(Paragraph::new(content), area);
}

fn button(label: &str, focused: bool) -> Vec<Span<'static>> {
    let style = if focused {
        Style::default()
            .fg(Color::Black)
            .bg(Color::LightCyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::LightCyan)
    };
    vec![Span::styled(format!("[ {label} ]"), style)]
}

fn level_style(level: StatusLevel) -> Style {
    match level {
        StatusLevel::Info => Style::default().fg(Color::White),
        StatusLevel::Warn => Style::default().fg(Color::Yellow),
        StatusLevel::Error => Style::default().fg(Color::LightRed),
    }
}

fn short_addr(value: &str) -> String {
    let value = value.trim();
    if value.len() <= 10 {
        return value.to_string();
    }
    format!("{}..{}", &value[..6], &value[value.len() - 4..])
}
