pub mod charting;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Clear, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use typespeed::{
    context::Theme,
    session::{Outcome, DURATION_BUDGET},
};

use crate::{App, MessageKind, Screen};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const CHART_LABEL_FORMAT: &str = "%m-%d %H:%M";

struct Palette {
    base: Style,
    title: Style,
    pending: Style,
    correct: Style,
    incorrect: Style,
    result: Style,
    hint: Style,
    line: Color,
}

fn palette(theme: Theme) -> Palette {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    match theme {
        Theme::Light => Palette {
            base: Style::default().fg(Color::Black).bg(Color::White),
            title: bold.fg(Color::Black),
            pending: Style::default().fg(Color::DarkGray),
            correct: bold.fg(Color::Green),
            incorrect: bold.fg(Color::Red),
            result: bold.fg(Color::Blue),
            hint: Style::default().add_modifier(Modifier::ITALIC),
            line: Color::Green,
        },
        Theme::Dark => Palette {
            base: Style::default().fg(Color::White).bg(Color::Black),
            title: bold.fg(Color::White),
            pending: Style::default().fg(Color::Gray),
            correct: bold.fg(Color::LightGreen),
            incorrect: bold.fg(Color::LightRed),
            result: bold.fg(Color::LightGreen),
            hint: Style::default().add_modifier(Modifier::ITALIC),
            line: Color::LightGreen,
        },
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let palette = palette(self.context.theme);
        Block::default().style(palette.base).render(area, buf);

        match self.screen {
            Screen::Login => render_login(self, &palette, area, buf),
            Screen::Main => render_main(self, &palette, area, buf),
            Screen::ConfirmLogout => {
                render_main(self, &palette, area, buf);
                render_popup(
                    "Logout",
                    "Are you sure you want to logout? (y/n)",
                    palette.base,
                    area,
                    buf,
                );
            }
            Screen::Chart => render_chart(self, &palette, area, buf),
            Screen::About => render_about(&palette, area, buf),
        }

        if let Some(ref message) = self.message {
            let (title, style) = match message.kind {
                MessageKind::Info => ("Info", palette.base),
                MessageKind::Warning => ("Warning", palette.base.fg(Color::Red)),
            };
            render_popup(title, &message.text, style, area, buf);
        }
    }
}

fn render_login(app: &App, palette: &Palette, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(area);

    Paragraph::new(Span::styled(
        "Welcome! Please enter your username:",
        palette.title,
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(format!("{}_", app.username_input))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let footer = match app.login_error {
        Some(ref e) => Span::styled(format!("Error: {e}"), palette.incorrect),
        None => Span::styled("(enter) login / (esc)ape", palette.hint),
    };
    Paragraph::new(footer)
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
}

/// Prompt words colored by whether the word typed at the same position matches
fn prompt_line<'a>(prompt: &'a str, typed: &str, palette: &Palette) -> Line<'a> {
    let mut typed_words = typed.split_whitespace();
    let spans = prompt
        .split_whitespace()
        .flat_map(|word| {
            let style = match typed_words.next() {
                Some(t) if t == word => palette.correct,
                Some(_) => palette.incorrect,
                None => palette.pending,
            };
            [Span::styled(word, style), Span::raw(" ")]
        })
        .collect::<Vec<Span>>();
    Line::from(spans)
}

fn outcome_lines(outcome: &Outcome) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(format!("Time Taken: {:.2} sec", outcome.elapsed)),
        Line::from(format!("Speed: {:.2} WPM", outcome.result.speed)),
        Line::from(format!("Accuracy: {:.2}%", outcome.result.accuracy)),
        Line::from(format!("Score: {}/100", outcome.result.score)),
    ];
    if !outcome.saved {
        lines.push(Line::from("(result not saved)"));
    }
    lines
}

fn render_main(app: &App, palette: &Palette, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // greeting, difficulty, countdown
            Constraint::Length(1),
            Constraint::Min(3),    // prompt
            Constraint::Length(7), // typed text
            Constraint::Length(5), // result summary
            Constraint::Length(1), // legend
        ])
        .split(area);

    let user = app.session.user().unwrap_or_default();
    let trial = app.session.trial();
    let countdown = match trial {
        Some(t) => format!("Time Left: {}s", t.remaining),
        None => format!("Time Limit: {DURATION_BUDGET}s"),
    };
    Paragraph::new(Line::from(vec![
        Span::styled(format!("Hello, {user}!"), palette.title),
        Span::raw(format!("   Difficulty: {}   ", app.difficulty)),
        Span::styled(countdown, palette.title),
    ]))
    .render(chunks[0], buf);

    let prompt = match trial {
        Some(t) => prompt_line(&t.prompt, &t.typed, palette),
        None => Line::from(Span::styled(
            "Press (s) to start a test.",
            palette.pending,
        )),
    };
    Paragraph::new(prompt)
        .wrap(Wrap { trim: true })
        .render(chunks[2], buf);

    let typed = trial.map(|t| format!("{}_", t.typed)).unwrap_or_default();
    Paragraph::new(typed)
        .block(Block::default().borders(Borders::ALL).title("Your text"))
        .wrap(Wrap { trim: false })
        .render(chunks[3], buf);

    if let Some(outcome) = app.session.last_outcome() {
        Paragraph::new(outcome_lines(outcome))
            .style(palette.result)
            .render(chunks[4], buf);
    }

    let legend = if app.session.is_running() {
        "(enter) submit / (ctrl+l) logout"
    } else {
        "(s)tart / (d)ifficulty / (g)raph / (e)xport / (t)heme / (m)ute / (a)bout / (l)ogout / (q)uit"
    };
    Paragraph::new(Span::styled(legend, palette.hint))
        .wrap(Wrap { trim: true })
        .render(chunks[5], buf);
}

fn render_chart(app: &App, palette: &Palette, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let (x_max, y_max) = charting::compute_chart_params(&app.chart);
    let data = charting::chart_data(&app.chart);
    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(Style::default().fg(palette.line))
        .graph_type(GraphType::Line)
        .data(&data)];

    let label = |i: usize| {
        app.chart
            .get(i)
            .map(|p| p.timestamp.format(CHART_LABEL_FORMAT).to_string())
            .unwrap_or_default()
    };
    let user = app.session.user().unwrap_or_default();

    Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("{user}'s Typing Speed Over Time (WPM)")),
        )
        .x_axis(
            Axis::default()
                .title("time")
                .bounds([1.0, x_max])
                .labels(vec![
                    Span::styled(label(0), palette.title),
                    Span::styled(label(app.chart.len().saturating_sub(1)), palette.title),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, y_max])
                .labels(vec![
                    Span::styled("0", palette.title),
                    Span::styled(charting::format_label(y_max), palette.title),
                ]),
        )
        .render(chunks[0], buf);

    Paragraph::new(Span::styled("(b)ack", palette.hint)).render(chunks[1], buf);
}

fn render_about(palette: &Palette, area: Rect, buf: &mut Buffer) {
    let lines = vec![
        Line::from(Span::styled("Typing Speed Tester", palette.title)),
        Line::from(""),
        Line::from("Features:"),
        Line::from("- User login"),
        Line::from("- Difficulty levels"),
        Line::from("- Saves history per user"),
        Line::from("- Export history as a report"),
        Line::from("- Countdown alerts"),
        Line::from("- Speed graph"),
        Line::from("- Light/Dark theme toggle"),
        Line::from(""),
        Line::from(Span::styled("(b)ack", palette.hint)),
    ];
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("About"))
        .alignment(Alignment::Center)
        .render(centered(area, 60, 14), buf);
}

fn centered(area: Rect, width_pct: u16, height: u16) -> Rect {
    let width = ((u32::from(area.width) * u32::from(width_pct) / 100) as u16)
        .max(20)
        .min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_popup(title: &str, text: &str, style: Style, area: Rect, buf: &mut Buffer) {
    let popup = centered(area, 60, 7);
    Clear.render(popup, buf);
    Paragraph::new(text.to_string())
        .style(style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string()),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(popup, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message;
    use std::path::PathBuf;
    use std::sync::Arc;
    use typespeed::{
        clock::ManualClock,
        config::Config,
        history::{HistoryStore, MemoryHistoryStore, TrialResult},
        language::SentenceGenerator,
        report,
        session::Session,
        sound::Silent,
    };

    fn create_test_app() -> (App, ManualClock, MemoryHistoryStore) {
        let clock = ManualClock::new();
        let store = MemoryHistoryStore::new();
        let session = Session::new(SentenceGenerator::seeded(1), clock.clone(), store.clone());
        let app = App::new(Config::default(), session, Arc::new(Silent), PathBuf::from("."));
        (app, clock, store)
    }

    fn rendered(app: &App, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_login_screen() {
        let (mut app, _, _) = create_test_app();
        app.username_input = "ali".into();
        let content = rendered(&app, 80, 24);
        assert!(content.contains("Please enter your username"));
        assert!(content.contains("ali_"));

        app.login("");
        assert!(rendered(&app, 80, 24).contains("Error: username cannot be empty"));
    }

    #[test]
    fn test_main_screen_running() {
        let (mut app, clock, _) = create_test_app();
        app.login("alice");
        app.start_trial();
        clock.advance_secs(3);
        app.on_tick();

        let content = rendered(&app, 100, 30);
        assert!(content.contains("Hello, alice!"));
        assert!(content.contains("Difficulty: Medium"));
        assert!(content.contains("Time Left: 57s"));
        assert!(content.contains("(enter) submit"));
    }

    #[test]
    fn test_main_screen_shows_result() {
        let (mut app, clock, _) = create_test_app();
        app.login("alice");
        app.start_trial();
        let prompt = app.session.trial().unwrap().prompt.clone();
        app.session.set_typed(&prompt);
        clock.advance_secs(30);
        app.submit();

        let content = rendered(&app, 100, 30);
        assert!(content.contains("Time Taken: 30.00 sec"));
        assert!(content.contains("Speed: 80.00 WPM"));
        assert!(content.contains("Accuracy: 100.00%"));
        assert!(content.contains("Score: 100/100"));
        assert!(!content.contains("not saved"));
    }

    #[test]
    fn test_prompt_line_colors_words() {
        let p = palette(Theme::Light);
        let line = prompt_line("Mouse loop timer", "Mouse lop", &p);
        let styles: Vec<Style> = line
            .spans
            .iter()
            .filter(|s| s.content != " ")
            .map(|s| s.style)
            .collect();
        assert_eq!(styles, vec![p.correct, p.incorrect, p.pending]);
    }

    #[test]
    fn test_unsaved_result_is_flagged() {
        let mut outcome = Outcome {
            result: TrialResult {
                timestamp: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap(),
                speed: 10.0,
                accuracy: 50.0,
                score: 40,
            },
            elapsed: 12.5,
            saved: true,
        };
        assert_eq!(outcome_lines(&outcome).len(), 4);
        outcome.saved = false;
        assert_eq!(outcome_lines(&outcome).len(), 5);
    }

    #[test]
    fn test_chart_screen() {
        let (mut app, clock, store) = create_test_app();
        app.login("alice");
        for speed in [20.0, 35.5, 48.0] {
            clock.advance_secs(60);
            store
                .append(
                    "alice",
                    &TrialResult {
                        timestamp: typespeed::clock::Clock::timestamp(&clock),
                        speed,
                        accuracy: 90.0,
                        score: typespeed::scoring::grade(speed),
                    },
                )
                .unwrap();
        }
        app.show_chart();
        assert_eq!(app.screen, Screen::Chart);

        let content = rendered(&app, 100, 30);
        assert!(content.contains("alice's Typing Speed Over Time (WPM)"));
        assert!(content.contains("01-01 09:01"));
        assert!(content.contains("01-01 09:03"));
        assert!(content.contains("(b)ack"));
    }

    #[test]
    fn test_popups_render_over_screen() {
        let (mut app, _, _) = create_test_app();
        app.login("alice");
        app.message = Some(Message {
            kind: MessageKind::Warning,
            text: "Failed to save score".into(),
        });
        let content = rendered(&app, 80, 24);
        assert!(content.contains("Warning"));
        assert!(content.contains("Failed to save score"));

        app.message = None;
        app.screen = Screen::ConfirmLogout;
        assert!(rendered(&app, 80, 24).contains("Are you sure you want to logout?"));
    }

    #[test]
    fn test_about_screen() {
        let (mut app, _, _) = create_test_app();
        app.screen = Screen::About;
        let content = rendered(&app, 80, 24);
        assert!(content.contains("Typing Speed Tester"));
        assert!(content.contains("Saves history per user"));
    }

    #[test]
    fn test_dark_theme_background() {
        let (mut app, _, _) = create_test_app();
        app.toggle_theme();
        let area = Rect::new(0, 0, 40, 10);
        let mut buffer = Buffer::empty(area);
        (&app).render(area, &mut buffer);
        assert_eq!(buffer[(0, 0)].bg, Color::Black);
    }

    #[test]
    fn test_small_area_does_not_panic() {
        let (mut app, _, _) = create_test_app();
        for screen in [Screen::Login, Screen::Main, Screen::About, Screen::ConfirmLogout] {
            app.screen = screen;
            let area = Rect::new(0, 0, 20, 5);
            let mut buffer = Buffer::empty(area);
            (&app).render(area, &mut buffer);
            assert_eq!(*buffer.area(), area);
        }
        app.chart = report::recent_speeds(&[], 10);
        app.screen = Screen::Chart;
        let area = Rect::new(0, 0, 20, 5);
        let mut buffer = Buffer::empty(area);
        (&app).render(area, &mut buffer);
    }

    #[test]
    fn test_ui_constants() {
        assert_eq!(HORIZONTAL_MARGIN, 5);
        assert_eq!(VERTICAL_MARGIN, 2);
    }
}
