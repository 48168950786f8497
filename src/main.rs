use anyhow::Result;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::layout::Rect;
use ratatui::DefaultTerminal;
use site_map::app::{App, Focus};
use site_map::config::Cli;
use site_map::data::{self, DataSource};
use site_map::error::LoadError;
use site_map::logging::init_tracing;
use site_map::site::SiteRecord;
use site_map::ui;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_file)?;

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &cli);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Fetch the dataset off the UI thread.
fn spawn_loader(source: DataSource) -> Receiver<Result<Vec<SiteRecord>, LoadError>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        tracing::info!(source = %source, "loading site dataset");
        // The receiver only disappears when the UI has already quit
        let _ = tx.send(data::load_sites(&source));
    });
    rx
}

/// Hand a finished load to the app. Returns true once the loader is done.
fn receive_dataset(app: &mut App, rx: &Receiver<Result<Vec<SiteRecord>, LoadError>>) -> bool {
    match rx.try_recv() {
        Ok(Ok(sites)) => app.on_loaded(sites),
        Ok(Err(e)) => app.on_load_failed(&e),
        Err(mpsc::TryRecvError::Empty) => return false,
        // The thread panicked before sending
        Err(mpsc::TryRecvError::Disconnected) => app.on_load_failed(&LoadError::LoaderStopped),
    }
    true
}

fn run(terminal: &mut DefaultTerminal, cli: &Cli) -> Result<()> {
    let size = terminal.size()?;
    let screen = Rect::new(0, 0, size.width, size.height);
    let mut app = App::new(ui::map_area(screen), size.width, cli.map_options());

    data::load_basemap(&mut app.basemap, &cli.basemap_dir);
    if !app.basemap.has_data() {
        tracing::info!(dir = %cli.basemap_dir.display(), "no basemap files, using built-in outline");
        data::simple_world(&mut app.basemap);
    }

    let mut loader = Some(spawn_loader(cli.data_source()));

    loop {
        if loader.as_ref().is_some_and(|rx| receive_dataset(&mut app, rx)) {
            loader = None;
        }

        terminal.draw(|frame| ui::render(frame, &app))?;

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(&mut app, key),
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => {
                    app.resize(ui::map_area(Rect::new(0, 0, width, height)), width);
                }
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    app.notice = None;

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    match app.focus {
        Focus::Search => match key.code {
            KeyCode::Esc | KeyCode::Enter => app.focus = Focus::Map,
            KeyCode::Backspace => app.pop_search_char(),
            KeyCode::Char(ch) => app.push_search_char(ch),
            _ => {}
        },
        Focus::Filters => match key.code {
            KeyCode::Esc | KeyCode::Char('f') => app.focus = Focus::Map,
            KeyCode::Up | KeyCode::Char('k') => app.controls.cursor_prev(),
            KeyCode::Down | KeyCode::Char('j') => app.controls.cursor_next(),
            KeyCode::Char(' ') | KeyCode::Enter => app.toggle_filter_at_cursor(),
            KeyCode::Char('R') => app.reset_filters(),
            KeyCode::Char('/') => app.focus = Focus::Search,
            _ => {}
        },
        Focus::Map => match key.code {
            KeyCode::Char('q') => app.quit(),
            KeyCode::Esc => {
                if app.selected_marker().is_some() {
                    app.close_popup();
                } else {
                    app.quit();
                }
            }

            // Pan with hjkl or arrow keys
            KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
            KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
            KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
            KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),
            KeyCode::Char('0') => app.fit_visible(),

            KeyCode::Char('/') => app.focus = Focus::Search,
            KeyCode::Char('f') => app.focus = Focus::Filters,
            KeyCode::Char('R') => app.reset_filters(),

            KeyCode::Tab | KeyCode::Char('n') => app.cycle_selection(true),
            KeyCode::BackTab | KeyCode::Char('N') => app.cycle_selection(false),
            KeyCode::Char('o') | KeyCode::Enter => app.open_selected_link(),

            KeyCode::Char('b') | KeyCode::Char('B') => app.basemap.toggle_borders(),
            _ => {}
        },
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Moved => app.hover(mouse.column, mouse.row),
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Click selects; dragging pans
        MouseEventKind::Down(MouseButton::Left) => {
            app.click(mouse.column, mouse.row);
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(),
        _ => {}
    }
}
