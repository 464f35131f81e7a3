use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph};
use tui::{Frame, Terminal};
use tui_logger::{TuiLoggerLevelOutput, TuiLoggerWidget};

use crate::app::App;
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use chrono::Local;
use esports_api::{ListName, MatchRecord, TeamRef};

const HELP: &str = "q quit  r refresh  tab switch  j/k move  enter detail  f full screen  \" logs";

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);

    let drawn = terminal.draw(|f| {
        layout.update(f.area(), app.settings.full_screen, app.state.show_logs);

        if !app.settings.full_screen {
            draw_status_bar(f, layout.status_bar, app);
        }

        draw_list(f, layout.live, app, ListName::Live);
        draw_list(f, layout.upcoming, app, ListName::Upcoming);

        if app.state.show_logs {
            draw_logs(f, layout.logs);
        }

        if app.state.show_detail
            && let Some(record) = app.selected_match()
        {
            draw_detail(f, f.area(), record);
        }

        draw_loading_spinner(f, f.area(), app, loading);
    });

    if let Err(e) = drawn {
        log::error!("failed to draw frame: {e}");
    }
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let status = &app.state.status;
    let status_style = if status.is_degraded() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    };

    let mut spans = vec![
        Span::styled(" esports-board ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(status.text(), status_style),
    ];
    if let Some(error) = app.state.last_error.as_deref()
        && status.is_degraded()
    {
        spans.push(Span::styled(format!(": {error}"), Style::default().fg(Color::DarkGray)));
    }
    if let Some(game) = app.settings.board.game.as_deref() {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(format!("game: {game}"), Style::default().fg(Color::Magenta)));
    }
    if let Some(pin) = app.settings.board.pin.as_deref() {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(format!("pinned: {pin}"), Style::default().fg(Color::Cyan)));
    }

    let block = default_border(Color::DarkGray).title_bottom(Line::from(HELP).right_aligned());
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_list(f: &mut Frame, area: Rect, app: &App, list: ListName) {
    let focused = app.state.focus == list;
    let pane = app.state.pane(list);
    let border_color = if focused { Color::White } else { Color::DarkGray };
    let title = match list {
        ListName::Live => format!(" Live ({}) ", pane.records.len()),
        ListName::Upcoming => format!(
            " Upcoming · next {}h ({}) ",
            app.settings.upcoming_hours,
            pane.records.len()
        ),
    };
    let block = default_border(border_color).title(title);

    if let Some(message) = pane.placeholder(app.state.never_loaded_and_failed()) {
        let inner = block.inner(area);
        f.render_widget(block, area);
        draw_placeholder(f, inner, message);
        return;
    }

    let items: Vec<ListItem> = pane
        .records
        .iter()
        .map(|record| ListItem::new(card_lines(record, list)))
        .collect();

    let highlight = if focused {
        Style::default().bg(Color::DarkGray)
    } else {
        Style::default()
    };
    let widget = List::new(items)
        .block(block)
        .highlight_style(highlight)
        .highlight_symbol("▌");
    let mut state = ListState::default().with_selected(Some(pane.selected));
    f.render_stateful_widget(widget, area, &mut state);
}

/// Three rows per match: matchup, event line, spacer.
fn card_lines(record: &MatchRecord, list: ListName) -> Vec<Line<'static>> {
    let when = match (list, record.start_time) {
        (ListName::Live, _) => Span::styled("LIVE", Style::default().fg(Color::Red)),
        (ListName::Upcoming, Some(at)) => Span::styled(
            at.with_timezone(&Local).format("%a %H:%M").to_string(),
            Style::default().fg(Color::Green),
        ),
        (ListName::Upcoming, None) => Span::styled("time tbc", Style::default().fg(Color::DarkGray)),
    };

    let mut event = Vec::with_capacity(7);
    if let Some(game) = record.game.as_deref() {
        event.push(Span::styled(game.to_string(), Style::default().fg(Color::Magenta)));
        event.push(Span::raw(" · "));
    }
    event.extend([
        Span::styled(record.event_label().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" · "),
        Span::raw(record.format.clone()),
        Span::raw(" · "),
        when,
    ]);

    vec![
        Line::from(vec![
            Span::styled(matchup_text(record), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(event),
        Line::from(""),
    ]
}

/// "Alpha 1 vs 2 Beta"; zero scores are left out.
fn matchup_text(record: &MatchRecord) -> String {
    let side = |team: &TeamRef, score_first: bool| match team.display_score() {
        Some(score) if score_first => format!("{score} {}", team.name),
        Some(score) => format!("{} {score}", team.name),
        None => team.name.clone(),
    };
    format!("{} vs {}", side(record.home(), false), side(record.away(), true))
}

fn draw_detail(f: &mut Frame, area: Rect, record: &MatchRecord) {
    let [popup] = Layout::horizontal([Constraint::Length(60)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::vertical([Constraint::Length(13)])
        .flex(Flex::Center)
        .areas(popup);

    let label = Style::default().fg(Color::Gray);
    let start = record
        .start_time
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let team_line = |side: &str, team: &TeamRef| {
        Line::from(vec![
            Span::styled(format!("{side:<8}"), label),
            Span::raw(format!("{} ({})", team.name, team.score)),
            Span::styled(
                if team.winner { "  winner" } else { "" },
                Style::default().fg(Color::Green),
            ),
            Span::styled(
                format!("  {}", team.logo_url.as_deref().unwrap_or("no logo")),
                Style::default().fg(Color::DarkGray),
            ),
        ])
    };

    let lines = vec![
        Line::from(vec![Span::styled("event   ", label), Span::raw(record.event_label().to_string())]),
        Line::from(vec![
            Span::styled("game    ", label),
            Span::raw(record.game.clone().unwrap_or_else(|| "unknown".to_string())),
        ]),
        Line::from(vec![Span::styled("format  ", label), Span::raw(record.format.clone())]),
        Line::from(vec![Span::styled("start   ", label), Span::raw(start)]),
        Line::from(vec![
            Span::styled("status  ", label),
            Span::raw(if record.live { "live" } else { "scheduled" }),
        ]),
        Line::from(""),
        team_line("home", record.home()),
        team_line("away", record.away()),
        Line::from(""),
        Line::from(Span::styled(
            if record.synthetic_id {
                "id generated locally".to_string()
            } else {
                format!("id {}", record.id)
            },
            Style::default().fg(Color::DarkGray),
        )),
    ];

    f.render_widget(Clear, popup);
    f.render_widget(
        Paragraph::new(lines).block(default_border(Color::White).title(" Match (esc to close) ")),
        popup,
    );
}

fn draw_logs(f: &mut Frame, area: Rect) {
    let logs = TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Logs "))
        .style_error(Style::default().fg(Color::Red))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_info(Style::default().fg(Color::Cyan))
        .style_debug(Style::default().fg(Color::DarkGray))
        .output_timestamp(Some("%H:%M:%S".to_string()))
        .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
        .output_target(false)
        .output_file(false)
        .output_line(false);
    f.render_widget(logs, area);
}

fn draw_placeholder(f: &mut Frame, area: Rect, msg: &str) {
    let [middle] = Layout::vertical([Constraint::Length(1)])
        .flex(Flex::Center)
        .areas(area);
    f.render_widget(
        Paragraph::new(msg.to_string())
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        middle,
    );
}

fn draw_loading_spinner(f: &mut Frame, area: Rect, app: &App, loading: LoadingState) {
    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner = Paragraph::new(loading.spinner_char.to_string())
        .alignment(Alignment::Right)
        .style(style);
    let area = if app.settings.full_screen {
        Rect::new(area.width.saturating_sub(3), area.height.saturating_sub(2), 1, 1)
    } else {
        Rect::new(area.width.saturating_sub(3), 1, 1, 1)
    };
    f.render_widget(spinner, area);
}
