use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use improvement_viewer::{
    direct_image_url, format_date_time, sanitize_identifier_input, validate_identifier, Advance,
    ImprovementEntry, InputForm, Month, Screen, Session, ViewSession, Workflow, IDENTIFIER_LEN,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use tokio::runtime::Runtime;
use tracing::{info, warn};

/// What a key press means on the current screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    TypeDigit(char),
    Erase,
    NextMonth,
    PreviousMonth,
    Submit,
    Advance,
    Retreat,
    Back,
    Reset,
    Ignore,
}

pub fn action_for(screen: &Screen, key: KeyCode) -> Action {
    match screen {
        Screen::Input(_) => match key {
            KeyCode::Esc | KeyCode::Char('q') => Action::Quit,
            KeyCode::Char(c) if c.is_ascii_digit() => Action::TypeDigit(c),
            KeyCode::Backspace | KeyCode::Delete => Action::Erase,
            KeyCode::Right | KeyCode::Down | KeyCode::Tab => Action::NextMonth,
            KeyCode::Left | KeyCode::Up | KeyCode::BackTab => Action::PreviousMonth,
            KeyCode::Enter => Action::Submit,
            _ => Action::Ignore,
        },
        Screen::Viewing(_) => match key {
            KeyCode::Esc | KeyCode::Char('q') => Action::Quit,
            KeyCode::Right | KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('l') => Action::Advance,
            KeyCode::Left | KeyCode::Char('h') => Action::Retreat,
            KeyCode::Char('b') => Action::Back,
            _ => Action::Ignore,
        },
        Screen::Completed(_) => match key {
            KeyCode::Esc | KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('r') | KeyCode::Enter => Action::Reset,
            _ => Action::Ignore,
        },
    }
}

pub struct App {
    pub screen: Screen,
    pub workflow: Workflow,
    /// Shown instead of the screen while a remote call is running
    pub busy: Option<&'static str>,
}

impl App {
    pub fn new(workflow: Workflow) -> Self {
        Self {
            screen: Screen::default(),
            workflow,
            busy: None,
        }
    }

    /// Loading message when `action` will wait on the entry store
    pub fn pending_label(&self, action: Action) -> Option<&'static str> {
        match (&self.screen, action) {
            (Screen::Input(form), Action::Submit)
                if validate_identifier(&form.id_number) && form.month.is_some() =>
            {
                Some("Loading entries...")
            }
            (Screen::Viewing(session), Action::Advance) if session.is_last() => {
                Some("Saving progress... recording your completion timestamp")
            }
            _ => None,
        }
    }

    /// Local form edits; false for actions that belong to other screens
    pub fn edit_form(&mut self, action: Action) -> bool {
        let Screen::Input(form) = &mut self.screen else {
            return false;
        };

        match action {
            Action::TypeDigit(c) => {
                let mut typed = form.id_number.clone();
                typed.push(c);
                form.id_number = sanitize_identifier_input(&typed);
            }
            Action::Erase => {
                form.id_number.pop();
            }
            Action::NextMonth => {
                form.month = Some(form.month.map(|m| m.next()).unwrap_or(Month::January));
            }
            Action::PreviousMonth => {
                form.month = Some(form.month.map(|m| m.previous()).unwrap_or(Month::December));
            }
            _ => return false,
        }
        form.error = None;
        true
    }

    pub fn apply(&mut self, action: Action, runtime: &Runtime) {
        if self.edit_form(action) {
            return;
        }

        match action {
            Action::Submit => self.submit(runtime),
            Action::Advance => self.advance(runtime),
            Action::Retreat => {
                if let Screen::Viewing(session) = &mut self.screen {
                    self.workflow.retreat(session);
                }
            }
            Action::Back => {
                self.screen.back();
            }
            Action::Reset => {
                self.screen.reset();
            }
            _ => {}
        }
    }

    fn submit(&mut self, runtime: &Runtime) {
        let (id, month) = match &self.screen {
            Screen::Input(form) => (form.id_number.clone(), form.month),
            _ => return,
        };

        match runtime.block_on(self.workflow.start_session(&id, month)) {
            Ok(session) => {
                info!(id = %id, entries = session.len(), "Viewing started");
                self.screen.begin(session);
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Submit rejected");
                self.screen.show_error(e.user_message());
            }
        }
    }

    fn advance(&mut self, runtime: &Runtime) {
        let summary = match &mut self.screen {
            Screen::Viewing(session) => match runtime.block_on(self.workflow.advance(session)) {
                Advance::Moved(_) => None,
                Advance::Completed(result) => {
                    if !result.success {
                        // Viewing already happened; show the outcome and move on
                        warn!(message = %result.message, "Completion not recorded");
                    }
                    Some(ViewSession::from_session(session, result))
                }
            },
            _ => None,
        };

        if let Some(summary) = summary {
            self.screen.complete(summary);
        }
    }
}

pub fn run_ui(app: &mut App, runtime: &Runtime) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app, runtime);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runtime: &Runtime,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
            if kind != KeyEventKind::Press {
                continue;
            }

            let action = action_for(&app.screen, code);
            if action == Action::Quit {
                return Ok(());
            }

            if let Some(label) = app.pending_label(action) {
                app.busy = Some(label);
                terminal.draw(|f| ui(f, app))?;
            }
            app.apply(action, runtime);
            app.busy = None;
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Key hints
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if let Some(label) = app.busy {
        render_busy(f, chunks[1], label);
    } else {
        match &app.screen {
            Screen::Input(form) => render_input(f, chunks[1], form),
            Screen::Viewing(session) => render_viewer(f, chunks[1], session),
            Screen::Completed(summary) => render_completion(f, chunks[1], summary),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        " Entry Viewer ",
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )];

    match &app.screen {
        Screen::Input(_) => {
            spans.push(Span::raw(" │ "));
            spans.push(Span::styled(
                "Enter your details to view improvement entries",
                Style::default().fg(Color::DarkGray),
            ));
        }
        Screen::Viewing(session) => {
            spans.push(Span::raw(" │ "));
            spans.push(Span::styled(
                format!("ID: {}", session.id_number()),
                Style::default().fg(Color::White),
            ));
            spans.push(Span::raw("  |  "));
            spans.push(Span::styled(
                format!("Month: {}", session.month()),
                Style::default().fg(Color::Cyan),
            ));
            spans.push(Span::raw("  |  "));
            spans.push(Span::styled(
                format!("Entry {} of {}", session.position() + 1, session.len()),
                Style::default().fg(Color::Green),
            ));
        }
        Screen::Completed(_) => {
            spans.push(Span::raw(" │ "));
            spans.push(Span::styled("Session Complete!", Style::default().fg(Color::Green)));
        }
    }

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_busy(f: &mut Frame, area: Rect, label: &str) {
    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            label.to_string(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Waiting for the spreadsheet to answer",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];

    let paragraph = Paragraph::new(content)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(" Please wait "));

    f.render_widget(paragraph, area);
}

fn label(text: &str) -> Span<'static> {
    Span::styled(
        format!("  {}: ", text),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )
}

fn render_input(f: &mut Frame, area: Rect, form: &InputForm) {
    let id_valid = validate_identifier(&form.id_number);

    let mut content = vec![
        Line::from(""),
        Line::from(vec![
            label("ID Number"),
            Span::styled(
                if form.id_number.is_empty() {
                    "Enter 8-digit ID number".to_string()
                } else {
                    form.id_number.clone()
                },
                if form.id_number.is_empty() {
                    Style::default().fg(Color::DarkGray)
                } else if id_valid {
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Red)
                },
            ),
            Span::styled("▏", Style::default().fg(Color::Yellow)),
        ]),
    ];

    if !form.id_number.is_empty() && !id_valid {
        content.push(Line::from(Span::styled(
            format!(
                "  ID must be exactly 8 digits ({}/{} digits entered)",
                form.id_number.len(),
                IDENTIFIER_LEN
            ),
            Style::default().fg(Color::Red),
        )));
    }

    content.push(Line::from(""));
    let mut month_line = vec![label("Select Month")];
    match form.month {
        Some(m) => {
            month_line.push(Span::styled("◀ ", Style::default().fg(Color::DarkGray)));
            month_line.push(Span::styled(
                m.name(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ));
            month_line.push(Span::styled(" ▶", Style::default().fg(Color::DarkGray)));
        }
        None => month_line.push(Span::styled(
            "Choose a month (←/→)",
            Style::default().fg(Color::DarkGray),
        )),
    }
    content.push(Line::from(month_line));
    content.push(Line::from(""));

    if let Some(error) = &form.error {
        content.push(Line::from(Span::styled(
            format!("  ⚠ {}", error),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        content.push(Line::from(""));
    }

    let ready = id_valid && form.month.is_some();
    content.push(Line::from(Span::styled(
        "  [ View Entries ]",
        if ready {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        },
    )));

    let paragraph = Paragraph::new(content)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Entry Viewer "),
        );

    f.render_widget(paragraph, area);
}

fn render_viewer(f: &mut Frame, area: Rect, session: &Session) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let progress = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Progress "))
        .gauge_style(Style::default().fg(Color::Green).bg(Color::DarkGray))
        .ratio(session.progress())
        .label(format!("{}/{}", session.position() + 1, session.len()));
    f.render_widget(progress, chunks[0]);

    let entry = session.current();
    let body = Paragraph::new(entry_lines(entry))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(format!(" {} ", display_or(&entry.entry_title, "Untitled entry"))),
        );
    f.render_widget(body, chunks[1]);
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

fn section(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        format!("  {}", title),
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
    ))
}

fn entry_lines(entry: &ImprovementEntry) -> Vec<Line<'static>> {
    let image = |url: &str| {
        if url.is_empty() {
            Span::styled("Image not available", Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))
        } else {
            Span::styled(direct_image_url(url), Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED))
        }
    };

    vec![
        Line::from(vec![
            label("Category"),
            Span::raw(entry.category.clone()),
            Span::raw("   "),
            label("Control #"),
            Span::raw(entry.control_number.clone()),
            Span::raw("   "),
            label("Record #"),
            Span::raw(entry.record_number.clone()),
        ]),
        Line::from(vec![
            label("Area"),
            Span::raw(entry.area_code.clone()),
            Span::raw("   "),
            label("Date"),
            Span::raw(format_date_time(&entry.date_time)),
        ]),
        Line::from(""),
        section("DESCRIPTION"),
        Line::from(format!("  {}", entry.description)),
        Line::from(""),
        Line::from(vec![label("Before"), image(&entry.before_image)]),
        Line::from(vec![label("After"), image(&entry.after_image)]),
        Line::from(""),
        section("IMPROVEMENT"),
        Line::from(format!("  {}", entry.improvement)),
        Line::from(""),
        section("IMPROVEMENT EFFECT"),
        Line::from(format!("  {}", entry.improvement_effect)),
    ]
}

fn render_completion(f: &mut Frame, area: Rect, summary: &ViewSession) {
    let registration_style = if summary.registration.success {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    };

    let content = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "  You have successfully viewed all {} improvement entries for {}.",
                summary.entries_viewed, summary.month
            ),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        section("SESSION SUMMARY"),
        Line::from(""),
        Line::from(vec![label("ID Number"), Span::raw(summary.id_number.clone())]),
        Line::from(vec![label("Month"), Span::raw(summary.month.name())]),
        Line::from(vec![label("Entries Viewed"), Span::raw(summary.entries_viewed.to_string())]),
        Line::from(vec![
            label("Completed At"),
            Span::raw(
                summary
                    .completed_at
                    .with_timezone(&chrono::Local)
                    .format("%B %-d, %Y, %I:%M %p")
                    .to_string(),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", summary.registration.message),
            registration_style,
        )),
    ];

    let paragraph = Paragraph::new(content)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green))
                .title(" Session Complete "),
        );

    f.render_widget(paragraph, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let hints: &[(&str, &str)] = match &app.screen {
        Screen::Input(_) => &[("0-9", " ID"), ("←/→", " Month"), ("Enter", " View"), ("Esc", " Quit")],
        Screen::Viewing(session) if session.is_last() => {
            &[("→", " Complete"), ("←", " Previous"), ("b", " Back"), ("q", " Quit")]
        }
        Screen::Viewing(_) => &[("→", " Next"), ("←", " Previous"), ("b", " Back"), ("q", " Quit")],
        Screen::Completed(_) => &[("r", " View More Entries"), ("q", " Quit")],
    };

    let mut spans = vec![Span::styled(
        format!(" {} ", app.screen.name()),
        Style::default().fg(Color::Cyan),
    )];
    for (key, what) in hints {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(*what));
    }

    let status_bar = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use improvement_viewer::{EntryStore, RowRecord, StoreResult};
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    struct StaticStore {
        rows: Vec<RowRecord>,
    }

    #[async_trait::async_trait]
    impl EntryStore for StaticStore {
        async fn ping(&self) -> StoreResult<()> {
            Ok(())
        }

        async fn fetch_rows(&self) -> StoreResult<Vec<RowRecord>> {
            Ok(self.rows.clone())
        }

        async fn is_registered(&self, _id: &str, _month: &str) -> StoreResult<bool> {
            Ok(false)
        }

        async fn record_timestamp(&self, _id: &str, _month: &str) -> StoreResult<()> {
            Ok(())
        }
    }

    fn app() -> App {
        let rows = vec![
            RowRecord::from_pairs([("Entry Title", "Label the shelves"), ("Date and Time", "05-16-2025")]),
            RowRecord::from_pairs([("Entry Title", "Clear the aisle"), ("Date and Time", "05-20-2025")]),
        ];
        App::new(Workflow::new(Arc::new(StaticStore { rows })))
    }

    fn screen_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn type_id(app: &mut App, id: &str) {
        for c in id.chars() {
            app.edit_form(Action::TypeDigit(c));
        }
    }

    #[test]
    fn test_key_mapping_per_screen() {
        let input = Screen::default();
        assert_eq!(action_for(&input, KeyCode::Char('7')), Action::TypeDigit('7'));
        assert_eq!(action_for(&input, KeyCode::Char('x')), Action::Ignore);
        assert_eq!(action_for(&input, KeyCode::Enter), Action::Submit);
    }

    #[test]
    fn test_id_field_caps_at_eight_digits() {
        let mut app = app();
        type_id(&mut app, "1234567890");

        match &app.screen {
            Screen::Input(form) => assert_eq!(form.id_number, "12345678"),
            other => panic!("unexpected screen {}", other.name()),
        }
    }

    #[test]
    fn test_month_selector_starts_at_january() {
        let mut app = app();
        app.edit_form(Action::NextMonth);
        assert!(matches!(&app.screen, Screen::Input(f) if f.month == Some(Month::January)));
        app.edit_form(Action::PreviousMonth);
        assert!(matches!(&app.screen, Screen::Input(f) if f.month == Some(Month::December)));
    }

    #[test]
    fn test_full_walkthrough() {
        let runtime = Runtime::new().unwrap();
        let mut app = app();

        type_id(&mut app, "12345678");
        for _ in 0..5 {
            app.edit_form(Action::NextMonth);
        }
        assert_eq!(app.pending_label(Action::Submit), Some("Loading entries..."));

        app.apply(Action::Submit, &runtime);
        assert_eq!(app.screen.name(), "viewing");
        assert!(screen_text(&app).contains("Label the shelves"));

        app.apply(Action::Advance, &runtime);
        assert!(app.pending_label(Action::Advance).is_some());
        app.apply(Action::Advance, &runtime);

        assert_eq!(app.screen.name(), "completed");
        assert!(screen_text(&app).contains("Registration successful for ID 12345678 in May."));

        app.apply(Action::Reset, &runtime);
        assert_eq!(app.screen.name(), "input");
    }

    #[test]
    fn test_submit_error_stays_on_input() {
        let runtime = Runtime::new().unwrap();
        let mut app = app();

        type_id(&mut app, "12345678");
        app.edit_form(Action::PreviousMonth); // December: no entries
        app.apply(Action::Submit, &runtime);

        assert_eq!(app.screen.name(), "input");
        assert!(screen_text(&app).contains("No entries found for December."));
    }
}
