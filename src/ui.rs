use std::time::SystemTime;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table, Widget, Wrap},
};
use time_humanize::{Accuracy, HumanTime, Tense};
use unicode_width::UnicodeWidthStr;

use crate::{App, View};
use tippwerk::practice::{DisplayMode, SequencePosition};
use tippwerk::round::RoundStatus;

const HORIZONTAL_MARGIN: u16 = 5;

const PARTICLE_COLORS: [Color; 7] = [
    Color::Yellow,
    Color::Green,
    Color::Cyan,
    Color::Magenta,
    Color::Red,
    Color::Blue,
    Color::White,
];

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.view {
            View::Menu => render_menu(self, area, buf),
            View::Round => render_round(self, area, buf),
            View::Practice => render_practice(self, area, buf),
            View::Highscores => render_highscores(self, area, buf),
            View::Badges => render_badges(self, area, buf),
        }

        render_particles(self, area, buf);
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn render_menu(app: &App, area: Rect, buf: &mut Buffer) {
    let lines = vec![
        Line::from(Span::styled("⛏ tippwerk", bold().fg(Color::Green))),
        Line::default(),
        Line::from(format!(
            "Schwierigkeit: {}",
            app.config.difficulty.label()
        )),
        Line::default(),
        Line::from("(1) Anfänger   (2) Fortgeschritten   (3) Experte"),
        Line::from("(p) Übungsmodus   (h) Highscores   (b) Abzeichen"),
        Line::default(),
        Line::from(Span::styled("(esc) beenden", dim_bold())),
    ];

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::NONE))
        .render(centered_vertically(area, 8), buf);
}

fn render_round(app: &App, area: Rect, buf: &mut Buffer) {
    let now = SystemTime::now();
    let round = &app.round;

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_occupied_lines =
        ((round.target().width() as f64 / max_chars_per_line as f64).ceil() as u16).max(1);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(prompt_occupied_lines),
            Constraint::Length(6),
        ])
        .split(area);

    let stats = Line::from(vec![
        Span::styled(format!("{} WPM", round.wpm()), bold().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
            format!("{:.1}% Genauigkeit", round.accuracy()),
            bold().fg(Color::Green),
        ),
        Span::raw("  "),
        Span::styled(format!("{} Fehler", round.errors()), bold().fg(Color::Red)),
        Span::raw("  "),
        Span::styled(format!("{:.0}s", round.elapsed_secs()), dim_bold()),
    ]);
    Paragraph::new(stats)
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let typed_len = round.typed().chars().count();
    let mut spans: Vec<Span> = vec![Span::styled(
        round.typed().to_string(),
        bold().fg(Color::Green),
    )];
    if let Some(next) = round.next_char() {
        let current_style = if round.error_flash(now) {
            bold().fg(Color::White).bg(Color::Red)
        } else {
            dim_bold().add_modifier(Modifier::UNDERLINED)
        };
        spans.push(Span::styled(next.to_string(), current_style));
        let rest: String = round.target().chars().skip(typed_len + 1).collect();
        spans.push(Span::styled(rest, dim_bold()));
    }
    Paragraph::new(Line::from(spans))
        .alignment(if prompt_occupied_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: false })
        .render(chunks[1], buf);

    if round.status() == RoundStatus::Finished {
        let mut lines = vec![
            Line::from(Span::styled(
                "🏆 Level geschafft!",
                bold().fg(Color::Yellow),
            )),
            Line::from(format!(
                "{} WPM mit {:.1}% Genauigkeit ({})",
                round.wpm(),
                round.accuracy(),
                round.difficulty().label()
            )),
        ];
        for badge in &app.earned_badges {
            lines.push(Line::from(Span::styled(
                format!("Neues Abzeichen: {}", badge.name),
                bold().fg(Color::Cyan),
            )));
        }
        lines.push(Line::from(Span::styled(
            "(n) neues Level  (esc) Hauptmenü",
            dim_bold(),
        )));
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
    } else {
        Paragraph::new(Line::from(Span::styled("(esc) abbrechen", dim_bold())))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
    }
}

fn render_practice(app: &App, area: Rect, buf: &mut Buffer) {
    let now = SystemTime::now();
    let session = &app.practice;
    let stats = session.stats();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(3),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Length(2),
        ])
        .split(area);

    let stats_line = Line::from(vec![
        Span::styled(format!("{} WPM", stats.wpm), bold().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
            format!("{:.1}% Genauigkeit", stats.accuracy),
            bold().fg(Color::Green),
        ),
        Span::raw("  "),
        Span::styled(format!("Serie {}", stats.streak), bold().fg(Color::Cyan)),
        Span::raw("  "),
        Span::styled(format!("Beste {}", stats.best_streak), dim_bold()),
        Span::raw("  "),
        Span::styled(format!("{:.0}s", stats.session_secs), dim_bold()),
    ]);
    Paragraph::new(stats_line)
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let target_line = if session.settings().display_mode == DisplayMode::Sequence {
        let spans: Vec<Span> = session
            .sequence_display()
            .into_iter()
            .map(|(c, position)| {
                let style = match position {
                    SequencePosition::Completed => bold().fg(Color::Green),
                    SequencePosition::Current => {
                        if session.error_flash(now) {
                            bold().fg(Color::White).bg(Color::Red)
                        } else {
                            bold().fg(Color::Yellow).add_modifier(Modifier::UNDERLINED)
                        }
                    }
                    SequencePosition::Upcoming => dim_bold(),
                };
                Span::styled(format!(" {c} "), style)
            })
            .collect();
        Line::from(spans)
    } else {
        let c = session.current_char().map(String::from).unwrap_or_default();
        let style = if session.error_flash(now) {
            bold().fg(Color::White).bg(Color::Red)
        } else {
            bold().fg(Color::Yellow)
        };
        Line::from(Span::styled(c, style))
    };
    Paragraph::new(target_line)
        .alignment(Alignment::Center)
        .render(centered_vertically(chunks[1], 1), buf);

    let problematic = session.problematic_keys();
    if !problematic.is_empty() {
        let keys: String = problematic
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Paragraph::new(Line::from(vec![
            Span::styled("Problemtasten: ", dim_bold()),
            Span::styled(keys, bold().fg(Color::Red)),
        ]))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
    }

    if session.settings().show_keyboard {
        Paragraph::new(Line::from(Span::styled(
            "Grundreihe: a s d f   j k l ö",
            dim_bold(),
        )))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    }

    Paragraph::new(Line::from(Span::styled("(esc) beenden", dim_bold())))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
}

fn render_highscores(app: &App, area: Rect, buf: &mut Buffer) {
    let now = chrono::Utc::now();
    let rows: Vec<Row> = app
        .progress
        .highscores
        .iter()
        .enumerate()
        .map(|(idx, score)| {
            let age = now
                .signed_duration_since(score.date)
                .to_std()
                .unwrap_or_default();
            Row::new(vec![
                format!("{}", idx + 1),
                format!("{}", score.wpm),
                format!("{:.1}%", score.accuracy),
                score.difficulty.label().to_string(),
                HumanTime::from(age).to_text_en(Accuracy::Rough, Tense::Past),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Length(10),
            Constraint::Length(16),
            Constraint::Min(12),
        ],
    )
    .header(
        Row::new(vec!["#", "WPM", "Genauigkeit", "Schwierigkeit", "Wann"]).style(bold()),
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Highscores  (c) löschen  (esc) zurück "),
    );

    table.render(margined(area), buf);
}

fn render_badges(app: &App, area: Rect, buf: &mut Buffer) {
    let mut lines = Vec::new();
    for badge in &app.progress.badges {
        let (marker, style) = if badge.achieved {
            ("✔", bold().fg(Color::Green))
        } else {
            ("·", dim_bold())
        };
        lines.push(Line::from(Span::styled(
            format!("{marker} {}", badge.name),
            style,
        )));
        lines.push(Line::from(Span::styled(
            format!("   {}", badge.description),
            Style::default().add_modifier(Modifier::DIM),
        )));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled("(esc) zurück", dim_bold())));

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Abzeichen "))
        .render(margined(area), buf);
}

fn render_particles(app: &App, area: Rect, buf: &mut Buffer) {
    for particle in app.celebration.particles() {
        let x = particle.x.round() as i32;
        let y = particle.y.round() as i32;
        if x < area.x as i32
            || y < area.y as i32
            || x >= (area.x + area.width) as i32
            || y >= (area.y + area.height) as i32
        {
            continue;
        }
        if let Some(cell) = buf.cell_mut((x as u16, y as u16)) {
            cell.set_char(particle.symbol);
            cell.set_fg(PARTICLE_COLORS[particle.color_index % PARTICLE_COLORS.len()]);
        }
    }
}

fn margined(area: Rect) -> Rect {
    Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(1)
        .constraints([Constraint::Min(1)])
        .split(area)[0]
}

/// Shrinks `area` to `height` lines, vertically centered.
fn centered_vertically(area: Rect, height: u16) -> Rect {
    let pad = area.height.saturating_sub(height) / 2;
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(pad),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area)[1]
}
