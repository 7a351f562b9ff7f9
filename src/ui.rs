use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use pokedex::{
    CatalogLoader, CatalogState, CatalogView, DetailPhase, DisplayRecord, ItemLookup,
    ItemResolver, ResolverEvent, CATALOG_PATH,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

const TICK: Duration = Duration::from_millis(100);
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Catalog,
    Detail,
}

impl Page {
    pub fn title(&self) -> &str {
        match self {
            Page::Catalog => "Catalog",
            Page::Detail => "Detail",
        }
    }
}

/// One open detail page. Dropping it tears the resolver down.
pub struct DetailView {
    resolver: ItemResolver,
    events: mpsc::UnboundedReceiver<ResolverEvent>,
}

impl DetailView {
    pub fn phase(&self) -> DetailPhase {
        self.resolver.phase()
    }
}

pub struct App {
    pub catalog: CatalogState,
    pub state: TableState,
    pub current_page: Page,
    pub detail: Option<DetailView>,
    loader: Option<CatalogLoader>,
    catalog_rx: Option<oneshot::Receiver<CatalogState>>,
    lookup: Arc<dyn ItemLookup>,
    tick: usize,
}

impl App {
    pub fn new(loader: CatalogLoader, lookup: Arc<dyn ItemLookup>) -> Self {
        Self {
            catalog: CatalogState::default(),
            state: TableState::default(),
            current_page: Page::Catalog,
            detail: None,
            loader: Some(loader),
            catalog_rx: None,
            lookup,
            tick: 0,
        }
    }

    /// Kick off the one catalog fetch of this app's lifetime
    pub fn start(&mut self) {
        let Some(loader) = self.loader.take() else {
            return;
        };
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let state = loader.load().await;
            let _ = tx.send(state);
        });
        self.catalog_rx = Some(rx);
    }

    /// Pull finished background work into the app
    pub fn poll_background(&mut self) {
        if let Some(rx) = self.catalog_rx.as_mut() {
            match rx.try_recv() {
                Ok(state) => {
                    self.set_catalog(state);
                    self.catalog_rx = None;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => self.catalog_rx = None,
            }
        }

        // resolver state is read directly at draw time; events only need draining
        if let Some(detail) = self.detail.as_mut() {
            while detail.events.try_recv().is_ok() {}
        }
    }

    pub fn set_catalog(&mut self, catalog: CatalogState) {
        self.catalog = catalog;
        if self.catalog.items.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    fn spinner(&self) -> &'static str {
        SPINNER[self.tick % SPINNER.len()]
    }

    pub fn selected(&self) -> Option<&DisplayRecord> {
        self.state.selected().and_then(|i| self.catalog.items.get(i))
    }

    pub fn open_detail(&mut self) {
        let Some(identifier) = self.selected().map(|item| item.id.clone()) else {
            return;
        };
        let resolver = ItemResolver::new(Arc::clone(&self.lookup));
        let events = resolver.subscribe();
        resolver.resolve_identifier(identifier);

        self.detail = Some(DetailView { resolver, events });
        self.current_page = Page::Detail;
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
        self.current_page = Page::Catalog;
    }

    pub fn detail_phase(&self) -> Option<DetailPhase> {
        self.detail.as_ref().map(DetailView::phase)
    }

    pub fn next(&mut self) {
        let len = self.catalog.items.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.catalog.items.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.catalog.items.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + 20).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.catalog.items.is_empty() {
            return;
        }
        let i = self.state.selected().map(|i| i.saturating_sub(20)).unwrap_or(0);
        self.state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

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
) -> io::Result<()> {
    app.start();

    loop {
        app.poll_background();
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(TICK)? {
            app.on_tick();
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match (app.current_page, key.code) {
            (_, KeyCode::Char('q')) => return Ok(()),
            (Page::Catalog, KeyCode::Esc) => return Ok(()),
            (Page::Catalog, KeyCode::Enter) => app.open_detail(),
            (Page::Catalog, KeyCode::Down | KeyCode::Char('j')) => app.next(),
            (Page::Catalog, KeyCode::Up | KeyCode::Char('k')) => app.previous(),
            (Page::Catalog, KeyCode::PageDown) => app.page_down(),
            (Page::Catalog, KeyCode::PageUp) => app.page_up(),
            (Page::Catalog, KeyCode::Home) => {
                if !app.catalog.items.is_empty() {
                    app.state.select(Some(0));
                }
            }
            (Page::Catalog, KeyCode::End) => {
                if !app.catalog.items.is_empty() {
                    app.state.select(Some(app.catalog.items.len() - 1));
                }
            }
            (Page::Detail, KeyCode::Esc | KeyCode::Backspace | KeyCode::Left) => {
                app.close_detail()
            }
            _ => {}
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Navigation bar
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Catalog => render_catalog(f, chunks[1], app),
        Page::Detail => render_detail(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        " Pokédex ",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )];

    for page in [Page::Catalog, Page::Detail] {
        spans.push(Span::raw(" │ "));
        let style = if page == app.current_page {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {} ", page.title()), style));
    }

    spans.push(Span::raw("   "));
    spans.push(Span::styled(
        format!("lookup: {}", app.lookup.strategy()),
        Style::default().fg(Color::Magenta),
    ));

    let header = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_catalog(f: &mut Frame, area: Rect, app: &mut App) {
    let block = Block::default().borders(Borders::ALL);

    match app.catalog.view() {
        CatalogView::Loading => {
            let text = vec![
                Line::from(""),
                Line::from(Span::styled(app.spinner(), Style::default().fg(Color::Yellow))),
                Line::from(""),
                Line::from("Loading Pokémons..."),
            ];
            let paragraph = Paragraph::new(text)
                .alignment(Alignment::Center)
                .block(block.title(" Pokémons "));
            f.render_widget(paragraph, area);
        }
        CatalogView::Failed(message) => {
            let paragraph = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Red))),
            ])
            .alignment(Alignment::Center)
            .block(block.title(" Pokémons "));
            f.render_widget(paragraph, area);
        }
        CatalogView::Empty => {
            let paragraph = Paragraph::new(vec![
                Line::from(""),
                Line::from(format!(
                    "No Pokémon found. Check that {} is served and is not empty.",
                    CATALOG_PATH
                )),
            ])
            .alignment(Alignment::Center)
            .block(block.title(" Pokémons "));
            f.render_widget(paragraph, area);
        }
        CatalogView::Cards(cards) => {
            let header_cells = ["#", "Name", "Types", "ATK", "DEF", "SPD", "HP"]
                .iter()
                .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
            let header = Row::new(header_cells).height(1).bottom_margin(1);

            let rows: Vec<Row> = cards
                .iter()
                .map(|card| {
                    Row::new(vec![
                        Cell::from(card.id.clone()),
                        Cell::from(card.name().to_string()).style(Style::default().fg(Color::White)),
                        Cell::from(card.types_label()).style(Style::default().fg(Color::Cyan)),
                        Cell::from(card.record.attack.to_string()),
                        Cell::from(card.record.defense.to_string()),
                        Cell::from(card.record.speed.to_string()),
                        Cell::from(card.record.health.to_string()),
                    ])
                })
                .collect();

            let widths = [
                Constraint::Length(5),
                Constraint::Length(16),
                Constraint::Length(20),
                Constraint::Length(5),
                Constraint::Length(5),
                Constraint::Length(5),
                Constraint::Length(5),
            ];

            let table = Table::new(rows, widths)
                .header(header)
                .block(block.title(format!(" Pokémons ({}) ", cards.len())))
                .highlight_style(
                    Style::default()
                        .bg(Color::DarkGray)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol(">> ");

            f.render_stateful_widget(table, area, &mut app.state);
        }
    }
}

fn render_detail(f: &mut Frame, area: Rect, app: &App) {
    let Some(phase) = app.detail_phase() else {
        let empty = Paragraph::new("No Pokémon selected")
            .block(Block::default().borders(Borders::ALL).title(" Pokémon "));
        f.render_widget(empty, area);
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Pokémon Details ");

    let pending = |message: String| {
        vec![
            Line::from(""),
            Line::from(Span::styled(app.spinner(), Style::default().fg(Color::Yellow))),
            Line::from(""),
            Line::from(message),
        ]
    };

    let content = match phase {
        DetailPhase::IdentifierLoading => pending("Loading Pokémon details...".to_string()),
        DetailPhase::DataLoading(id) => pending(format!("Loading Pokémon data for ID: {}...", id)),
        DetailPhase::IdentifierMissing => vec![
            Line::from(""),
            Line::from(Span::styled(
                "Could not determine the Pokémon ID.",
                Style::default().fg(Color::Red),
            )),
        ],
        DetailPhase::NotFound(id) => vec![
            Line::from(""),
            Line::from(Span::styled(
                format!(
                    "Pokémon with ID '{}' not found or an error occurred while fetching.",
                    id
                ),
                Style::default().fg(Color::Red),
            )),
        ],
        DetailPhase::Resolved(item) => {
            let paragraph = Paragraph::new(detail_lines(&item)).block(block);
            f.render_widget(paragraph, area);
            return;
        }
    };

    let paragraph = Paragraph::new(content)
        .alignment(Alignment::Center)
        .block(block);
    f.render_widget(paragraph, area);
}

fn detail_lines(item: &DisplayRecord) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let section = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let field = |name: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("  {:<14}", name), label),
            Span::styled(value, Style::default().fg(Color::Green)),
        ])
    };

    vec![
        Line::from(""),
        Line::from(vec![Span::styled(
            format!("  {} #{}", item.name(), item.id),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        field("Types:", item.types_label()),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(vec![Span::styled("  STATS", section)]),
        Line::from(""),
        field("Attack:", item.record.attack.to_string()),
        field("Defense:", item.record.defense.to_string()),
        field("Speed:", item.record.speed.to_string()),
        field("Health:", item.record.health.to_string()),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(vec![Span::styled("  EVOLUTION", section)]),
        Line::from(""),
        field("Evolves to:", item.evolution().unwrap_or("—").to_string()),
        field("Evolves from:", item.devolution().unwrap_or("—").to_string()),
        Line::from(""),
        field("Image:", item.record.main_image.clone()),
    ]
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let hints = match app.current_page {
        Page::Catalog => "↑/↓ j/k: Move │ PgUp/PgDn │ Enter: Details │ q/Esc: Quit",
        Page::Detail => "Esc/Backspace: Back to catalog │ q: Quit",
    };

    let position = match (app.current_page, app.state.selected()) {
        (Page::Catalog, Some(i)) if !app.catalog.items.is_empty() => {
            format!("{}/{}", i + 1, app.catalog.items.len())
        }
        _ => String::new(),
    };

    let status_text = Line::from(vec![
        Span::styled(format!(" {} ", hints), Style::default().fg(Color::DarkGray)),
        Span::raw("  "),
        Span::styled(position, Style::default().fg(Color::Cyan)),
    ]);

    let status_bar = Paragraph::new(status_text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(status_bar, area);
}

// ============================================================================
// TESTS
// ============================================================================
