use crossterm::event::KeyCode;
use ratatui::{
    layout::{Alignment, Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crypto_guesser::controller::{CountdownDisplay, GameScreen, GuessPanel, Screen, ViewState};
use crypto_guesser::types::{Direction, Guess, PriceQuote};

// ---------------------------------------------------------------------------
// Key bindings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Guess(Direction),
    Reset,
    DismissError,
    Refresh,
    Quit,
}

/// Maps a key press to an action for the screen currently shown.
pub fn action_for(code: KeyCode, started: bool) -> Option<Action> {
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') => Some(Action::Quit),
        KeyCode::Esc | KeyCode::Char('e') | KeyCode::Char('E') => Some(Action::DismissError),
        KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Enter if !started => Some(Action::Start),
        KeyCode::Char('u') | KeyCode::Char('U') | KeyCode::Up if started => Some(Action::Guess(Direction::Up)),
        KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Down if started => {
            Some(Action::Guess(Direction::Down))
        }
        KeyCode::Char('x') | KeyCode::Char('X') if started => Some(Action::Reset),
        KeyCode::Char('r') | KeyCode::Char('R') if started => Some(Action::Refresh),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

pub fn render(f: &mut Frame, state: &ViewState) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    match state.screen() {
        Screen::Landing { loading, error } => render_landing(f, loading, error, chunks[0]),
        Screen::Game(game) => render_game(f, &game, chunks[0]),
    }
    render_footer(f, state.started, chunks[1]);
}

fn bordered(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

fn render_landing(f: &mut Frame, loading: bool, error: Option<&str>, area: Rect) {
    let muted = Style::default().fg(Color::Gray);
    let heading = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);

    let button = if loading {
        Span::styled(" ◌ Starting Game... ", Style::default().fg(Color::Yellow))
    } else {
        Span::styled(
            " [s] Start Playing → ",
            Style::default().fg(Color::Black).bg(Color::Blue).add_modifier(Modifier::BOLD),
        )
    };

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Test your market analysis skills by predicting short-term Bitcoin price movements.",
            muted,
        )),
        Line::from(""),
        Line::from(button),
        Line::from(""),
    ];
    if let Some(e) = error {
        lines.push(Line::from(Span::styled(e.to_string(), Style::default().fg(Color::Red))));
        lines.push(Line::from(""));
    }
    lines.extend([
        Line::from(Span::styled("How to Play", heading)),
        Line::from(Span::styled("1. View the current Bitcoin price in USD and your score", muted)),
        Line::from(Span::styled(
            "2. Choose UP if you think the price will be higher in 60+ seconds, or DOWN if lower",
            muted,
        )),
        Line::from(Span::styled("3. Wait for at least 60 seconds while the price updates", muted)),
        Line::from(Span::styled("4. Your guess resolves automatically when conditions are met", muted)),
        Line::from(""),
        Line::from(Span::styled("Scoring", heading)),
        Line::from(vec![
            Span::styled("+1 ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::styled("correct prediction   ", muted),
            Span::styled("-1 ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::styled("incorrect prediction   ", muted),
            Span::styled("0 ", Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD)),
            Span::styled("starting score", muted),
        ]),
    ]);

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(bordered(" CryptoGuess "));
    f.render_widget(paragraph, area);
}

fn render_game(f: &mut Frame, game: &GameScreen<'_>, area: Rect) {
    let error_height = if game.error.is_some() { 4 } else { 0 };
    let rows = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(3),            // title
            Constraint::Length(5),            // score | price
            Constraint::Min(7),               // guess panel
            Constraint::Length(error_height), // error banner
        ])
        .split(area);

    let title = Line::from(vec![
        Span::styled(
            " Crypto Guesser  ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled("[x] Reset Game", Style::default().fg(Color::DarkGray)),
    ]);
    f.render_widget(
        Paragraph::new(title).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        ),
        rows[0],
    );

    let halves = Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    render_score(f, game.score, halves[0]);
    render_price(f, game.price, halves[1]);

    render_guess_panel(f, &game.panel, game.loading, rows[2]);

    if let Some(e) = game.error {
        render_error(f, e, rows[3]);
    }
}

fn render_score(f: &mut Frame, score: i64, area: Rect) {
    let color = if score < 0 { Color::Red } else { Color::Green };
    let paragraph = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            score.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
    ])
    .alignment(Alignment::Center)
    .block(bordered(" YOUR SCORE "));
    f.render_widget(paragraph, area);
}

fn render_price(f: &mut Frame, quote: Option<&PriceQuote>, area: Rect) {
    let price_style = Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD);
    let muted = Style::default().fg(Color::DarkGray);

    let lines = match quote {
        Some(q) => {
            let mut lines = vec![Line::from(Span::styled(format!("${}", format_price(q.price)), price_style))];
            if let Some(age) = q.age_seconds {
                let stale = if q.stale() { " (stale)" } else { "" };
                lines.push(Line::from(Span::styled(format!("Updated {}s ago{stale}", format_age(age)), muted)));
            }
            lines
        }
        None => vec![
            Line::from(Span::styled("$0", price_style)),
            Line::from(Span::styled(
                "Price is inaccurate and will be updated soon",
                Style::default().fg(Color::Yellow),
            )),
        ],
    };

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(bordered(" BTC PRICE "));
    f.render_widget(paragraph, area);
}

fn render_guess_panel(f: &mut Frame, panel: &GuessPanel<'_>, loading: bool, area: Rect) {
    let (title, lines) = match panel {
        GuessPanel::Pending { guess, countdown } => (" GUESS PENDING ", pending_lines(guess, *countdown)),
        GuessPanel::Prediction { enabled } => (" MAKE YOUR PREDICTION ", prediction_lines(*enabled, loading)),
    };

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(bordered(title));
    f.render_widget(paragraph, area);
}

fn pending_lines(guess: &Guess, countdown: CountdownDisplay) -> Vec<Line<'static>> {
    let muted = Style::default().fg(Color::Gray);
    let placed_at = guess
        .guess_timestamp
        .with_timezone(&chrono::Local)
        .format("%H:%M:%S")
        .to_string();

    let mut lines = vec![
        Line::from(vec![
            Span::raw("You guessed: "),
            Span::styled(
                guess.direction.to_string(),
                Style::default()
                    .fg(direction_color(guess.direction))
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(format!("From ${}", format_price(guess.price_at_guess)), muted)),
        Line::from(Span::styled(placed_at, Style::default().fg(Color::DarkGray))),
        Line::from(""),
    ];

    match countdown {
        CountdownDisplay::Remaining(secs) => lines.push(Line::from(vec![
            Span::styled("● ", Style::default().fg(Color::Blue)),
            Span::styled("Time remaining: ", muted),
            Span::styled(format!("{secs}s"), Style::default().add_modifier(Modifier::BOLD)),
        ])),
        CountdownDisplay::AwaitingResolution => lines.push(Line::from(vec![
            Span::styled("● ", Style::default().fg(Color::Green)),
            Span::styled(
                "Ready to resolve! Waiting for server...",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
        ])),
        CountdownDisplay::Hidden => {}
    }

    lines
}

fn prediction_lines(enabled: bool, loading: bool) -> Vec<Line<'static>> {
    let button = |label: &'static str, direction: Direction| {
        let style = if enabled {
            Style::default()
                .fg(Color::Black)
                .bg(direction_color(direction))
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Span::styled(label, style)
    };

    let mut lines = vec![
        Line::from(Span::styled(
            "Will Bitcoin's price be higher or lower in 60+ seconds?",
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(vec![
            button(" [u] ▲ UP ", Direction::Up),
            Span::raw("     "),
            button(" [d] ▼ DOWN ", Direction::Down),
        ]),
    ];
    if loading {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("◌ Submitting...", Style::default().fg(Color::Yellow))));
    }
    lines
}

fn render_error(f: &mut Frame, message: &str, area: Rect) {
    let line = Line::from(vec![
        Span::styled(message.to_string(), Style::default().fg(Color::Red)),
        Span::styled(
            " Try resetting game with the [x] Reset Game key above",
            Style::default().fg(Color::LightRed),
        ),
    ]);
    let paragraph = Paragraph::new(line).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(Span::styled(" [e] dismiss ", Style::default().fg(Color::Red))),
    );
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, started: bool, area: Rect) {
    let key = Style::default().fg(Color::Yellow);
    let mut spans = vec![Span::styled(" [q] ", key), Span::raw("quit  ")];
    if started {
        spans.extend([
            Span::styled("[u/↑] ", key),
            Span::raw("up  "),
            Span::styled("[d/↓] ", key),
            Span::raw("down  "),
            Span::styled("[r] ", key),
            Span::raw("refresh  "),
            Span::styled("[x] ", key),
            Span::raw("reset  "),
        ]);
    } else {
        spans.extend([Span::styled("[s/enter] ", key), Span::raw("start  ")]);
    }
    spans.extend([Span::styled("[e/esc] ", key), Span::raw("dismiss error")]);

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}

fn direction_color(direction: Direction) -> Color {
    match direction {
        Direction::Up => Color::Green,
        Direction::Down => Color::Red,
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Two decimals with thousands separators: 50123.456 → "50,123.46".
pub fn format_price(v: f64) -> String {
    let cents = (v.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if v < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac:02}")
}

pub fn format_age(secs: f64) -> String {
    format!("{:.0}", secs.max(0.0))
}
