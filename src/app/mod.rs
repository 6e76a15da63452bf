use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::widgets::TableState;
use ratatui::Terminal;
use strum::IntoEnumIterator;

use crate::config::{AppConfig, Palette};
use crate::prefs::{PreferenceStore, SqlitePreferences, TypedPreferences};
use crate::storage::StorageHandle;
use crate::ui;
use crate::view::{ColumnKey, ViewPreferences};

pub mod actions;
pub mod state;
pub mod worker;

pub use actions::{CheckMutations, MutationKind, MutationQueue, MutationRequest};
pub use state::{ChecklistState, OverlayState, ViewRow};
pub use worker::{MutationEvent, MutationWorker};

enum Action {
    Quit,
    MoveDown,
    MoveUp,
    PageDown,
    PageUp,
    ToggleSelect,
    ToggleSelectAll,
    CycleSort,
    ToggleGroup,
    ToggleCollapse,
    ToggleColumn(ColumnKey),
    StartSearch,
    PickUpOrDrop,
    Escape,
    ToggleStatus,
    BulkDisable,
    BulkEnable,
    Delete,
    BulkEdit,
    PickFolder,
    NewFolder,
    CheckNow,
    Refresh,
    Help,
}

pub struct App {
    pub config: Arc<AppConfig>,
    pub storage: StorageHandle,
    prefs: SqlitePreferences,
    worker: MutationWorker,
    state: ChecklistState,
    table_state: TableState,
    table_body: Option<Rect>,
    palette: Palette,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>, storage: StorageHandle) -> Result<Self> {
        let prefs = SqlitePreferences::new(storage.clone(), config.profile.clone());
        let defaults = ViewPreferences {
            sort_by: config.default_sort,
            group_by: config.default_group,
            ..ViewPreferences::default()
        };
        let view = prefs.load_view(&defaults);
        let mut state = ChecklistState::new(
            view,
            config.bulk_edit.interval_unit,
            config.search.max_results,
        );
        let checks = storage
            .fetch_checks()
            .context("loading checks for initial state")?;
        if checks.is_empty() {
            state.set_status_message(Some(
                "No checks yet. Load some with `checklist import <file>`.",
            ));
        }
        state.replace_checks(checks);
        let worker = MutationWorker::spawn(storage.clone())?;
        Ok(Self {
            palette: config.palette(),
            tick_rate: config.tick_rate(),
            config,
            storage,
            prefs,
            worker,
            state,
            table_state: TableState::default(),
            table_body: None,
            should_quit: false,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        self.worker.shutdown();
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    if self.state.rows().is_empty() {
                        self.table_state.select(None);
                    } else {
                        self.table_state.select(Some(self.state.cursor()));
                    }
                    let layout =
                        ui::draw_app(frame, &self.state, &mut self.table_state, &self.palette);
                    self.table_body = Some(layout.table_body);
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        while let Some(event) = self.worker.try_recv() {
            if !self.state.on_mutation_event(event) {
                self.reload();
            }
        }
    }

    fn reload(&mut self) {
        match self.storage.fetch_checks() {
            Ok(checks) => self.state.replace_checks(checks),
            Err(err) => {
                tracing::error!(?err, "failed to reload checks from storage");
                self.state
                    .set_status_message(Some("Failed to reload checks"));
            }
        }
    }

    /// Runs `f` with the mutation queue; failures are logged and surfaced, never fatal.
    fn mutate<F>(&mut self, what: &str, f: F)
    where
        F: FnOnce(&mut ChecklistState, &dyn CheckMutations) -> Result<()>,
    {
        let Some(queue) = self.worker.queue() else {
            self.state
                .set_status_message(Some("Mutation worker is not running"));
            return;
        };
        if let Err(err) = f(&mut self.state, queue) {
            tracing::error!(?err, what, "failed to issue mutation");
            self.state
                .set_status_message(Some(format!("Failed to {what}")));
        }
    }

    fn with_prefs<F>(&mut self, what: &str, f: F)
    where
        F: FnOnce(&mut ChecklistState, &dyn PreferenceStore) -> Result<()>,
    {
        if let Err(err) = f(&mut self.state, &self.prefs) {
            tracing::error!(?err, what, "failed to persist preference");
            self.state
                .set_status_message(Some(format!("Could not save {what}")));
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.handle_overlay_key(key) {
            return;
        }

        if self.state.search.active {
            match key.code {
                KeyCode::Esc => {
                    self.state.cancel_search();
                    return;
                }
                KeyCode::Enter => {
                    self.state.finish_search();
                    return;
                }
                KeyCode::Backspace => {
                    self.state.pop_search_char();
                    return;
                }
                KeyCode::Char(ch)
                    if !key.modifiers.intersects(
                        KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                    ) =>
                {
                    self.state.push_search_char(ch);
                    return;
                }
                _ => {}
            }
        }

        let plain = !key.modifiers.intersects(
            KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
        );
        let action = match key.code {
            KeyCode::Char('q') if plain => Some(Action::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Refresh)
            }
            KeyCode::Char('j') | KeyCode::Down => Some(Action::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::MoveUp),
            KeyCode::PageDown => Some(Action::PageDown),
            KeyCode::PageUp => Some(Action::PageUp),
            KeyCode::Char(' ') if plain => Some(Action::ToggleSelect),
            KeyCode::Char('a') if plain => Some(Action::ToggleSelectAll),
            KeyCode::Char('s') if plain => Some(Action::CycleSort),
            KeyCode::Char('g') if plain => Some(Action::ToggleGroup),
            KeyCode::Char('z') if plain => Some(Action::ToggleCollapse),
            KeyCode::Enter => match self.state.cursor_row() {
                Some(ViewRow::Header { .. }) => Some(Action::ToggleCollapse),
                _ if self.state.drag().is_dragging() => Some(Action::PickUpOrDrop),
                _ => None,
            },
            KeyCode::Char('/') if plain => Some(Action::StartSearch),
            KeyCode::Char('m') if plain => Some(Action::PickUpOrDrop),
            KeyCode::Esc => Some(Action::Escape),
            KeyCode::Char('p') if plain => Some(Action::ToggleStatus),
            KeyCode::Char('P') => Some(Action::BulkDisable),
            KeyCode::Char('U') => Some(Action::BulkEnable),
            KeyCode::Char('d') | KeyCode::Delete if plain => Some(Action::Delete),
            KeyCode::Char('e') if plain => Some(Action::BulkEdit),
            KeyCode::Char('f') if plain => Some(Action::PickFolder),
            KeyCode::Char('n') if plain => Some(Action::NewFolder),
            KeyCode::Char('c') if plain => Some(Action::CheckNow),
            KeyCode::Char('?') => Some(Action::Help),
            KeyCode::Char(digit @ '0'..='9') if plain => {
                let index = digit.to_digit(10).map(|d| (d as usize + 9) % 10);
                index
                    .and_then(|idx| ColumnKey::iter().nth(idx))
                    .map(Action::ToggleColumn)
            }
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::MoveDown => self.step(1),
            Action::MoveUp => self.step(-1),
            Action::PageDown => self.state.move_cursor(10),
            Action::PageUp => self.state.move_cursor(-10),
            Action::ToggleSelect => self.state.toggle_selection_at_cursor(),
            Action::ToggleSelectAll => self.state.toggle_select_all(),
            Action::CycleSort => self.with_prefs("sort order", |state, store| {
                let key = state.cycle_sort(store)?;
                state.set_status_message(Some(format!("Sorted by {}", key.label())));
                Ok(())
            }),
            Action::ToggleGroup => self.with_prefs("grouping", |state, store| {
                state.toggle_group(store).map(|_| ())
            }),
            Action::ToggleCollapse => self.with_prefs("collapsed folders", |state, store| {
                state.toggle_collapse_at_cursor(store).map(|_| ())
            }),
            Action::ToggleColumn(key) => self.with_prefs("column visibility", |state, store| {
                let visible = state.toggle_column(key, store)?;
                let verb = if visible { "Showing" } else { "Hiding" };
                state.set_status_message(Some(format!("{verb} {} column", key.title())));
                Ok(())
            }),
            Action::StartSearch => self.state.begin_search(),
            Action::PickUpOrDrop => {
                if self.state.drag().is_dragging() {
                    self.state.end_drag();
                    self.state.clear_status_message();
                } else if self.state.begin_drag_at_cursor() {
                    self.state
                        .set_status_message(Some("Moving: j/k to reposition, m or Enter to drop"));
                } else if !self.state.drag_enabled() {
                    self.state.set_status_message(Some(
                        "Reordering needs custom sort, no grouping and no filter",
                    ));
                }
            }
            Action::Escape => {
                if self.state.drag().is_dragging() {
                    self.state.end_drag();
                    self.state.clear_status_message();
                } else if !self.state.search.query.is_empty() {
                    self.state.cancel_search();
                } else {
                    self.state.clear_selection();
                }
            }
            Action::ToggleStatus => self.mutate("change status", |state, queue| {
                state.toggle_status_at_cursor(queue)
            }),
            Action::BulkDisable => self.mutate("pause checks", |state, queue| {
                state.bulk_toggle_status(true, queue).map(|_| ())
            }),
            Action::BulkEnable => self.mutate("resume checks", |state, queue| {
                state.bulk_toggle_status(false, queue).map(|_| ())
            }),
            Action::Delete => self.state.request_delete(),
            Action::BulkEdit => {
                self.state.open_bulk_edit();
            }
            Action::PickFolder => {
                self.state.open_folder_picker();
            }
            Action::NewFolder => {
                self.state.open_new_folder_dialog();
            }
            Action::CheckNow => {
                self.mutate("run check", |state, queue| state.check_now_at_cursor(queue))
            }
            Action::Refresh => self.reload(),
            Action::Help => self.state.overlay = Some(OverlayState::Help),
        }
    }

    fn step(&mut self, delta: isize) {
        if self.state.drag().is_dragging() {
            self.mutate("reorder", |state, queue| {
                state.drag_step(delta, queue).map(|_| ())
            });
        } else {
            self.state.move_cursor(delta);
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        let plain = !key.modifiers.intersects(
            KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
        );
        match self.state.overlay {
            Some(OverlayState::Help) => {
                self.state.close_overlay();
                true
            }
            Some(OverlayState::ConfirmDelete(_)) => {
                match key.code {
                    KeyCode::Enter | KeyCode::Char('y') => {
                        self.mutate("delete", |state, queue| {
                            state.confirm_delete(queue).map(|_| ())
                        });
                    }
                    KeyCode::Esc | KeyCode::Char('n') => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Delete canceled"));
                    }
                    _ => {}
                }
                true
            }
            Some(OverlayState::NewFolder(_)) => {
                match key.code {
                    KeyCode::Esc => self.state.close_overlay(),
                    KeyCode::Enter => self.mutate("create folder", |state, queue| {
                        state.commit_folder_dialog(queue).map(|_| ())
                    }),
                    KeyCode::Backspace => {
                        if let Some(dialog) = self.state.folder_dialog_mut() {
                            dialog.pop_char();
                        }
                    }
                    KeyCode::Char(ch) if plain => {
                        if let Some(dialog) = self.state.folder_dialog_mut() {
                            dialog.push_char(ch);
                        }
                    }
                    _ => {}
                }
                true
            }
            Some(OverlayState::FolderPicker(_)) => {
                match key.code {
                    KeyCode::Esc => self.state.close_overlay(),
                    KeyCode::Enter => self.mutate("move to folder", |state, queue| {
                        state.commit_folder_pick(queue).map(|_| ())
                    }),
                    KeyCode::Char('n') if plain => {
                        self.state.open_new_folder_dialog();
                    }
                    KeyCode::Char('j') | KeyCode::Down => {
                        if let Some(picker) = self.state.folder_picker_mut() {
                            picker.move_cursor(1);
                        }
                    }
                    KeyCode::Char('k') | KeyCode::Up => {
                        if let Some(picker) = self.state.folder_picker_mut() {
                            picker.move_cursor(-1);
                        }
                    }
                    _ => {}
                }
                true
            }
            Some(OverlayState::BulkEdit(_)) => {
                self.handle_bulk_edit_key(key, plain);
                true
            }
            None => false,
        }
    }

    fn handle_bulk_edit_key(&mut self, key: KeyEvent, plain: bool) {
        let typing = self
            .state
            .bulk_edit_mut()
            .map(|overlay| overlay.input.is_some())
            .unwrap_or(false);
        if typing {
            let Some(overlay) = self.state.bulk_edit_mut() else {
                return;
            };
            match key.code {
                KeyCode::Esc => {
                    overlay.input = None;
                    overlay.error = None;
                }
                KeyCode::Enter => overlay.commit_input(),
                KeyCode::Backspace => {
                    if let Some(input) = overlay.input.as_mut() {
                        input.pop();
                    }
                }
                KeyCode::Char(ch) if plain => {
                    if let Some(input) = overlay.input.as_mut() {
                        input.push(ch);
                    }
                }
                _ => {}
            }
            return;
        }

        if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.mutate("apply bulk edit", |state, queue| {
                if state.apply_bulk_edit(queue)? {
                    state.set_status_message(Some("Bulk edit sent"));
                }
                Ok(())
            });
            return;
        }
        if key.code == KeyCode::Esc {
            self.state.close_overlay();
            self.state.set_status_message(Some("Bulk edit canceled"));
            return;
        }
        let Some(overlay) = self.state.bulk_edit_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => overlay.move_field(1),
            KeyCode::Char('k') | KeyCode::Up => overlay.move_field(-1),
            KeyCode::Char(' ') if plain => {
                let field = overlay.field();
                overlay.draft.toggle(field);
            }
            KeyCode::Enter => overlay.begin_input(),
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.state.overlay.is_some() {
            return;
        }
        let row = self.row_at(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(row) = row else {
                    return;
                };
                self.state.set_cursor(row);
                if let Some(position) = self.state.cursor_position() {
                    self.state.begin_drag(position);
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let Some(position) = row.and_then(|row| self.position_of_row(row)) else {
                    return;
                };
                self.mutate("reorder", |state, queue| {
                    state.drag_over(position, queue).map(|_| ())
                });
            }
            MouseEventKind::Up(MouseButton::Left) => self.state.end_drag(),
            MouseEventKind::ScrollDown => self.state.move_cursor(1),
            MouseEventKind::ScrollUp => self.state.move_cursor(-1),
            _ => {}
        }
    }

    fn row_at(&self, column: u16, row: u16) -> Option<usize> {
        let body = self.table_body?;
        if column < body.x
            || column >= body.x + body.width
            || row < body.y
            || row >= body.y + body.height
        {
            return None;
        }
        let index = self.table_state.offset() + usize::from(row - body.y);
        (index < self.state.rows().len()).then_some(index)
    }

    fn position_of_row(&self, row: usize) -> Option<usize> {
        match self.state.rows().into_iter().nth(row)? {
            ViewRow::Check { position, .. } => Some(position),
            ViewRow::Header { .. } => None,
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}
