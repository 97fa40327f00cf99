use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::api::TextApi;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::logging;
use crate::models::{LearningLevel, Term, TermKind};
use crate::scroller::{AnchorLayout, ScrollRequest, resolve};
use crate::session::{Completion, Effect, LevelStep, ReadingSession};
use crate::settings::Action;
use crate::ui::board::Board;
use crate::ui::layout::TermLayout;
use crate::ui::windows::{help::HelpWindow, statistics::statistics_line, term::TermWindow};

const MESSAGE_TTL: Duration = Duration::from_secs(3);
const BUSY_POLL: Duration = Duration::from_millis(50);
const IDLE_POLL: Duration = Duration::from_secs(60);
const HEADER_ROWS: u16 = 1;
const FOOTER_ROWS: u16 = 2;
const SIDE_PADDING: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    Help,
    Term(usize),
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub scroll: usize,
    pub popup: Option<Popup>,
    pub message: Option<String>,
    pub message_type: MessageType,
    pub message_time: Option<Instant>,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        Self {
            scroll: 0,
            popup: None,
            message: None,
            message_type: MessageType::Info,
            message_time: None,
        }
    }

    pub fn set_message(&mut self, message: String, message_type: MessageType) {
        self.message = Some(message);
        self.message_type = message_type;
        self.message_time = Some(Instant::now());
    }

    pub fn clear_message(&mut self) {
        self.message = None;
        self.message_time = None;
    }

    /// Returns true if the current message has expired (older than 3 seconds).
    pub fn message_expired(&self) -> bool {
        self.message_time
            .is_some_and(|t| t.elapsed() >= MESSAGE_TTL)
    }
}

/// What one frame shows, collected before drawing.
pub struct Screen {
    pub header: Line<'static>,
    pub body: Body,
    pub footer: Line<'static>,
    pub popup: Option<PopupView>,
    pub message: Option<(String, MessageType)>,
}

pub enum Body {
    Loading,
    Processing,
    Lines(Vec<Line<'static>>),
}

pub enum PopupView {
    Help,
    Term(Term),
}

/// Everything the reading view needs apart from the terminal itself.
pub struct ApplicationState {
    pub config: Config,
    pub session: ReadingSession,
    pub ui_state: UiState,
    pub should_quit: bool,
    layout: TermLayout,
    body_width: usize,
    body_height: usize,
    layout_dirty: bool,
    scroll_dirty: bool,
}

impl ApplicationState {
    pub fn new(config: Config, text_id: u64, columns: u16, rows: u16) -> Self {
        let options = config.settings.session_options(columns);
        let mut state = Self {
            config,
            session: ReadingSession::new(text_id, options),
            ui_state: UiState::new(),
            should_quit: false,
            layout: TermLayout::default(),
            body_width: 0,
            body_height: 0,
            layout_dirty: true,
            scroll_dirty: false,
        };
        state.set_body_size(columns, rows);
        state
    }

    pub fn layout(&self) -> &TermLayout {
        &self.layout
    }

    fn set_body_size(&mut self, columns: u16, rows: u16) {
        self.body_width = columns.saturating_sub(SIDE_PADDING * 2) as usize;
        self.body_height = rows.saturating_sub(HEADER_ROWS + FOOTER_ROWS) as usize;
        self.layout_dirty = true;
    }

    pub fn resize(&mut self, columns: u16, rows: u16) -> Vec<Effect> {
        self.set_body_size(columns, rows);
        let settings = &self.config.settings;
        let sizing = settings.sizing_for(settings.profile_for(columns));
        self.session.on_resize(sizing)
    }

    pub fn apply_completions(&mut self, completions: Vec<Completion>) -> Vec<Effect> {
        let mut effects = Vec::new();
        for completion in completions {
            if matches!(
                completion,
                Completion::TermsLoaded { .. }
                    | Completion::TextLoaded(_)
                    | Completion::TermCount(_)
            ) {
                self.layout_dirty = true;
            }
            effects.extend(self.session.apply(completion));
        }
        for notice in self.session.take_notices() {
            self.ui_state.set_message(notice, MessageType::Error);
        }
        if effects.iter().any(|effect| matches!(effect, Effect::FetchTerms { .. })) {
            self.layout_dirty = true;
        }
        effects
    }

    /// Per-iteration bookkeeping: timers, layout, scroll corrections, window growth.
    pub fn refresh(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = self.session.tick(now);
        if !self.session.is_readable() {
            return effects;
        }

        if self.layout_dirty {
            self.rebuild_layout();
        }
        if let Some(request) = self.session.take_scroll_request() {
            self.scroll_to(request);
        }
        if self.scroll_dirty && self.ui_state.popup.is_none() {
            self.scroll_dirty = false;
            let metrics = self.layout.metrics(self.ui_state.scroll);
            let top = self.layout.first_visible(self.ui_state.scroll);
            let growth = self.session.on_scroll(metrics, top);
            if !growth.is_empty() {
                self.rebuild_layout();
            }
            effects.extend(growth);
        }

        self.session
            .observe_viewport(self.layout.visible_indices(self.ui_state.scroll), now);
        effects
    }

    fn rebuild_layout(&mut self) {
        let Some(window) = self.session.window() else {
            return;
        };
        let anchor = self.layout.first_visible(self.ui_state.scroll).and_then(|index| {
            let row = self.layout.row_of(index)?;
            Some((index, row.saturating_sub(self.ui_state.scroll)))
        });

        self.layout = TermLayout::build(
            self.session.store(),
            window,
            self.body_width,
            self.body_height,
        );
        self.layout_dirty = false;

        // Keep whatever was on screen in place while rows appear above it.
        if let Some((index, offset)) = anchor {
            if let Some(row) = self.layout.row_of(index) {
                self.ui_state.scroll = row.saturating_sub(offset);
            }
        }
        self.ui_state.scroll = self.ui_state.scroll.min(self.layout.max_scroll());
    }

    fn scroll_to(&mut self, request: ScrollRequest) -> bool {
        match resolve(request, &self.layout) {
            Some(row) => {
                self.ui_state.scroll = row.min(self.layout.max_scroll());
                self.scroll_dirty = true;
                true
            }
            None => false,
        }
    }

    fn scroll_by(&mut self, delta: isize) {
        let scroll = self.ui_state.scroll.saturating_add_signed(delta);
        self.ui_state.scroll = scroll.min(self.layout.max_scroll());
        // Even a clamped scroll is a gesture at the edge.
        self.scroll_dirty = true;
    }

    fn reveal(&mut self, index: usize) {
        let Some(row) = self.layout.row_of(index) else {
            return;
        };
        let height = self.layout.viewport_rows().max(1);
        if row < self.ui_state.scroll {
            self.ui_state.scroll = row;
        } else if row >= self.ui_state.scroll + height {
            self.ui_state.scroll = row + 1 - height;
        } else {
            return;
        }
        self.scroll_dirty = true;
    }

    /// Term the level and inspect keys act on.
    fn target(&self) -> Option<usize> {
        match self.ui_state.popup {
            Some(Popup::Term(index)) => Some(index),
            _ => self.session.selected(),
        }
    }

    fn first_interactive_visible(&self) -> Option<usize> {
        self.layout
            .visible_indices(self.ui_state.scroll)
            .into_iter()
            .find(|&index| {
                self.session
                    .store()
                    .get(index)
                    .is_some_and(|term| term.kind() != TermKind::Skipped)
            })
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> eyre::Result<Vec<Effect>> {
        if self.ui_state.message.is_some() {
            self.ui_state.clear_message();
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(Vec::new());
        }

        let action = match key.code {
            KeyCode::Up => Some(Action::ScrollUp),
            KeyCode::Down => Some(Action::ScrollDown),
            KeyCode::Left => Some(Action::SelectPrev),
            KeyCode::Right => Some(Action::SelectNext),
            KeyCode::Enter => Some(Action::Inspect),
            KeyCode::PageUp => {
                self.page(-1);
                return Ok(Vec::new());
            }
            KeyCode::PageDown => {
                self.page(1);
                return Ok(Vec::new());
            }
            KeyCode::Esc => {
                if self.ui_state.popup.take().is_none() {
                    self.session.select(None);
                }
                self.scroll_dirty = true;
                return Ok(Vec::new());
            }
            KeyCode::Char(c) => self.config.keymap.action_for(c),
            _ => None,
        };
        let Some(action) = action else {
            return Ok(Vec::new());
        };

        if self.ui_state.popup == Some(Popup::Help) {
            if matches!(action, Action::Help | Action::Quit) {
                self.ui_state.popup = None;
            }
            return Ok(Vec::new());
        }

        match action {
            Action::Quit => {
                if self.ui_state.popup.take().is_none() {
                    self.should_quit = true;
                }
                return Ok(Vec::new());
            }
            Action::Help => {
                self.ui_state.popup = Some(Popup::Help);
                return Ok(Vec::new());
            }
            _ => {}
        }

        if !self.session.is_readable() {
            return Ok(Vec::new());
        }
        self.handle_reading_action(action)
    }

    fn page(&mut self, direction: isize) {
        if self.ui_state.popup.is_none() && self.session.is_readable() {
            let rows = self.layout.viewport_rows().saturating_sub(1).max(1) as isize;
            self.scroll_by(direction * rows);
        }
    }

    fn handle_reading_action(&mut self, action: Action) -> eyre::Result<Vec<Effect>> {
        let popup_open = self.ui_state.popup.is_some();
        match action {
            Action::ScrollUp if !popup_open => self.scroll_by(-1),
            Action::ScrollDown if !popup_open => self.scroll_by(1),
            Action::SelectPrev | Action::SelectNext if !popup_open => {
                if let Some(index) = self.session.select_step(action == Action::SelectNext) {
                    self.reveal(index);
                }
            }
            Action::Inspect => {
                let Some(index) = self.target().or_else(|| self.first_interactive_visible()) else {
                    return Ok(Vec::new());
                };
                let effects = self.session.inspect(index)?;
                if self.session.selected() == Some(index) {
                    self.ui_state.popup = Some(Popup::Term(index));
                }
                return Ok(effects);
            }
            Action::LevelUp | Action::LevelDown => {
                let Some(index) = self.target() else {
                    self.ui_state
                        .set_message("Select a term first".to_string(), MessageType::Info);
                    return Ok(Vec::new());
                };
                let step = if action == Action::LevelUp {
                    LevelStep::Better
                } else {
                    LevelStep::Worse
                };
                return Ok(self.session.change_level(index, step)?);
            }
            Action::MarkWellKnown | Action::MarkIgnored => {
                let Some(index) = self.target() else {
                    self.ui_state
                        .set_message("Select a term first".to_string(), MessageType::Info);
                    return Ok(Vec::new());
                };
                let level = if action == Action::MarkWellKnown {
                    LearningLevel::WellKnown
                } else {
                    LearningLevel::Ignored
                };
                return Ok(self.session.set_level(index, level)?);
            }
            Action::JumpToBookmark if !popup_open => {
                if let Some(bookmark) = self.session.bookmark() {
                    if !self.scroll_to(ScrollRequest::Center(bookmark)) {
                        self.ui_state.set_message(
                            "Bookmark is not in the loaded part of the text".to_string(),
                            MessageType::Warning,
                        );
                    }
                }
            }
            _ => {}
        }
        Ok(Vec::new())
    }

    pub fn handle_mouse_scroll(&mut self, kind: MouseEventKind) {
        if self.ui_state.popup.is_some() || !self.session.is_readable() {
            return;
        }
        match kind {
            MouseEventKind::ScrollUp => self.scroll_by(-3),
            MouseEventKind::ScrollDown => self.scroll_by(3),
            _ => {}
        }
    }

    pub fn screen(&self) -> eyre::Result<Screen> {
        if !self.session.is_loaded() {
            return Ok(Screen {
                header: Line::from(" Loading..."),
                body: Body::Loading,
                footer: Line::from(""),
                popup: self.popup_view()?,
                message: self.message(),
            });
        }

        let text = self.session.text()?;
        let status = self
            .session
            .processing_state()
            .map(|state| state.label())
            .unwrap_or_default();
        let position = match self.session.viewing_index() {
            Some(index) if text.term_count > 0 => format!("  {}%", index * 100 / text.term_count),
            _ => String::new(),
        };
        let header = Line::from(vec![
            Span::styled(
                format!(" {}", text.title),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  [{status}]{position}")),
            Span::styled(
                if self.session.is_fetching() { "  loading" } else { "" },
                Style::default().add_modifier(Modifier::DIM),
            ),
        ]);

        let body = if self.session.is_readable() {
            Body::Lines(
                Board::new(&self.layout)
                    .with_scroll(self.ui_state.scroll)
                    .with_bookmark(self.session.bookmark())
                    .with_selected(self.session.selected())
                    .lines(&self.session)?,
            )
        } else {
            Body::Processing
        };

        let footer = if self.config.settings.show_statistics {
            statistics_line(text.terms_count_by_learning_level.as_ref(), text.term_count)
        } else {
            Line::from("")
        };

        Ok(Screen {
            header,
            body,
            footer,
            popup: self.popup_view()?,
            message: self.message(),
        })
    }

    fn popup_view(&self) -> eyre::Result<Option<PopupView>> {
        Ok(match self.ui_state.popup {
            Some(Popup::Help) => Some(PopupView::Help),
            Some(Popup::Term(index)) => self.session.term(index)?.cloned().map(PopupView::Term),
            None => None,
        })
    }

    fn message(&self) -> Option<(String, MessageType)> {
        self.ui_state
            .message
            .clone()
            .map(|message| (message, self.ui_state.message_type))
    }

    /// How long the loop may wait for input before something else needs doing.
    pub fn poll_timeout(&self, now: Instant, outstanding: usize) -> Duration {
        let mut timeout = IDLE_POLL;
        if let Some(deadline) = self.session.next_deadline() {
            timeout = timeout.min(deadline.saturating_duration_since(now));
        }
        if let Some(t) = self.ui_state.message_time {
            timeout = timeout.min(MESSAGE_TTL.saturating_sub(t.elapsed()));
        }
        if outstanding > 0 || self.layout_dirty || self.scroll_dirty {
            timeout = timeout.min(BUSY_POLL);
        }
        timeout
    }
}

pub struct Reader {
    state: ApplicationState,
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    dispatcher: Dispatcher,
}

impl Reader {
    pub fn new(config: Config, api: Arc<dyn TextApi>, text_id: u64) -> eyre::Result<Self> {
        let backend = CrosstermBackend::new(io::stdout());
        let terminal = Terminal::new(backend)?;
        let (columns, rows) = crossterm::terminal::size()?;

        Ok(Self {
            state: ApplicationState::new(config, text_id, columns, rows),
            terminal,
            dispatcher: Dispatcher::new(api),
        })
    }

    /// Run the main application loop
    pub fn run(&mut self) -> eyre::Result<()> {
        let mouse = self.state.config.settings.mouse_support;
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
        if mouse {
            crossterm::execute!(io::stdout(), crossterm::event::EnableMouseCapture)?;
        }
        self.terminal.clear()?;
        self.terminal.hide_cursor()?;

        let result = self.event_loop();
        self.state.session.teardown();

        self.terminal.clear()?;
        self.terminal.show_cursor()?;
        if mouse {
            crossterm::execute!(io::stdout(), crossterm::event::DisableMouseCapture)?;
        }
        crossterm::execute!(io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
        crossterm::terminal::disable_raw_mode()?;

        result
    }

    fn event_loop(&mut self) -> eyre::Result<()> {
        let opening = self.state.session.open();
        self.dispatcher.dispatch_all(opening);

        while !self.state.should_quit {
            if self.state.ui_state.message_expired() {
                self.state.ui_state.clear_message();
            }

            let completions = self.dispatcher.drain();
            let effects = self.state.apply_completions(completions);
            self.dispatcher.dispatch_all(effects);

            let effects = self.state.refresh(Instant::now());
            self.dispatcher.dispatch_all(effects);

            let screen = self.state.screen()?;
            let keymap = &self.state.config.keymap;
            self.terminal.draw(|f| Self::render_static(f, &screen, keymap))?;

            let timeout = self
                .state
                .poll_timeout(Instant::now(), self.dispatcher.outstanding());
            if !crossterm::event::poll(timeout)? {
                continue;
            }

            match crossterm::event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let effects = self.state.handle_key_event(key)?;
                    self.dispatcher.dispatch_all(effects);
                }
                Event::Mouse(mouse) => self.state.handle_mouse_scroll(mouse.kind),
                Event::Resize(columns, rows) => {
                    logging::debug(format!("terminal resized to {columns}x{rows}"));
                    let effects = self.state.resize(columns, rows);
                    self.dispatcher.dispatch_all(effects);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn render_static(
        frame: &mut Frame,
        screen: &Screen,
        keymap: &crate::settings::CfgDefaultKeymaps,
    ) {
        let [header_area, body_area, footer_area] = Layout::vertical([
            Constraint::Length(HEADER_ROWS),
            Constraint::Min(0),
            Constraint::Length(FOOTER_ROWS),
        ])
        .areas(frame.area());

        frame.render_widget(
            Paragraph::new(screen.header.clone())
                .style(Style::default().add_modifier(Modifier::REVERSED)),
            header_area,
        );

        let body_inner = Rect {
            x: body_area.x + SIDE_PADDING,
            y: body_area.y,
            width: body_area.width.saturating_sub(SIDE_PADDING * 2),
            height: body_area.height,
        };
        match &screen.body {
            Body::Loading => Self::render_centered(frame, body_inner, "Loading..."),
            Body::Processing => Self::render_centered(frame, body_inner, "Processing…"),
            Body::Lines(lines) => Board::render(lines.clone(), frame, body_inner),
        }

        frame.render_widget(
            Paragraph::new(screen.footer.clone())
                .block(Block::default().borders(Borders::TOP)),
            footer_area,
        );

        match &screen.popup {
            Some(PopupView::Help) => HelpWindow::render(frame, frame.area(), keymap),
            Some(PopupView::Term(term)) => TermWindow::render(frame, frame.area(), term),
            None => {}
        }

        if let Some((message, message_type)) = &screen.message {
            Self::render_message_static(frame, message, message_type);
        }
    }

    fn render_centered(frame: &mut Frame, area: Rect, text: &str) {
        let y = area.y + area.height / 2;
        let line_area = Rect::new(area.x, y.min(area.bottom().saturating_sub(1)), area.width, 1);
        frame.render_widget(
            Paragraph::new(text).alignment(ratatui::layout::Alignment::Center),
            line_area,
        );
    }

    fn render_message_static(frame: &mut Frame, message: &str, message_type: &MessageType) {
        let color = match message_type {
            MessageType::Info => Color::Blue,
            MessageType::Warning => Color::Yellow,
            MessageType::Error => Color::Red,
        };

        let message_paragraph = Paragraph::new(message)
            .style(Style::default().fg(color))
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: true });

        let frame_area = frame.area();
        let area = Rect {
            x: frame_area.x + 2,
            y: frame_area.y + 2,
            width: frame_area.width.saturating_sub(4),
            height: 3.min(frame_area.height),
        };

        frame.render_widget(Clear, area);
        frame.render_widget(message_paragraph, area);
    }
}
