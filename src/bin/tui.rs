mod tui_app;

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use order_desk::client::{BackendClient, OrderSource};
use order_desk::config::Config;
use order_desk::session::OrderDeskSession;
use order_desk::sync::SyncDriver;
use order_desk::types::{OrderQuery, SyncProgress};
use order_desk::view::html::{ERROR_PREFIX, NO_RESULTS_TEXT};
use order_desk::view::status::ALL_STATUSES_LABEL;
use order_desk::view::{Command, Dashboard, OrderTable, Screen, StatusClass};
use tui_app::{chunk_label, truncate, AppMsg, AppState, InputMode, VisibleRow};

const CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    // The terminal belongs to the dashboard; logs only go to LOG_FILE.
    if let Some(path) = &cfg.log_file {
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(&cfg.log_level))
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    }

    let client = match BackendClient::from_config(&cfg) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("HTTP client error: {e}");
            std::process::exit(1);
        }
    };

    let session = OrderDeskSession::load(&cfg.session_file);
    let mut app = AppState::new(Dashboard::new(cfg.sync_total_days), session, client.base_url().to_string());
    info!(api_url = %app.base_url, "order-desk-tui starting");

    let (tx, mut rx) = mpsc::channel::<AppMsg>(CHANNEL_CAPACITY);
    app.dash.on_load_started();
    spawn_load(client.clone(), tx.clone());

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut runtime = Runtime { client, cfg, tx, sync_cancel: None };
    let result = run_loop(&mut terminal, &mut app, &mut runtime, &mut rx).await;

    if let Some(cancel) = &runtime.sync_cancel {
        cancel.store(true, Ordering::Relaxed);
    }

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

struct Runtime {
    client: BackendClient,
    cfg: Config,
    tx: mpsc::Sender<AppMsg>,
    sync_cancel: Option<Arc<AtomicBool>>,
}

impl Runtime {
    fn execute(&mut self, cmd: Command) {
        if cmd == Command::StartSync {
            self.sync_cancel = Some(spawn_sync(self.client.clone(), &self.cfg, self.tx.clone()));
        }
    }
}

fn spawn_load(client: BackendClient, tx: mpsc::Sender<AppMsg>) {
    tokio::spawn(async move {
        let result = client.fetch_orders(&OrderQuery::Cached).await.map_err(|e| {
            warn!("Order load failed: {e}");
            e.user_message()
        });
        let _ = tx.send(AppMsg::Loaded(result)).await;
    });
}

/// Run the sync driver on its own task; progress is forwarded to the UI loop.
fn spawn_sync(client: BackendClient, cfg: &Config, tx: mpsc::Sender<AppMsg>) -> Arc<AtomicBool> {
    let driver = SyncDriver::new(client, cfg);
    let cancel = driver.cancel_token();

    tokio::spawn(async move {
        let progress_tx = tx.clone();
        let result = driver
            .run(move |p: &SyncProgress| {
                // The UI only needs the latest value; drop it if the loop is behind.
                let _ = progress_tx.try_send(AppMsg::SyncProgress(*p));
            })
            .await
            .map(|outcome| outcome.orders)
            .map_err(|e| e.user_message());
        let _ = tx.send(AppMsg::SyncFinished(result)).await;
    });

    cancel
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    runtime: &mut Runtime,
    rx: &mut mpsc::Receiver<AppMsg>,
) -> io::Result<()> {
    let poll_interval = Duration::from_millis(100);
    let mut table_state = TableState::default();

    loop {
        while let Ok(msg) = rx.try_recv() {
            let cmd = app.apply(msg, Instant::now());
            runtime.execute(cmd);
        }
        let cmd = app.tick(Instant::now());
        runtime.execute(cmd);

        table_state.select(Some(app.selected));
        terminal.draw(|f| render(f, app, &mut table_state))?;

        if !event::poll(poll_interval)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.input {
            InputMode::Search => match key.code {
                KeyCode::Enter => app.input = InputMode::Normal,
                KeyCode::Esc => {
                    app.clear_search();
                    app.input = InputMode::Normal;
                }
                KeyCode::Backspace => app.pop_search(),
                KeyCode::Char(c) => app.push_search(c),
                _ => {}
            },
            InputMode::Normal => match key.code {
                KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                KeyCode::Char('s') | KeyCode::Char('S') => {
                    let cmd = app.request_sync();
                    runtime.execute(cmd);
                }
                KeyCode::Char('r') | KeyCode::Char('R') => {
                    if !app.dash.sync_running() {
                        app.dash.on_load_started();
                        spawn_load(runtime.client.clone(), runtime.tx.clone());
                    }
                }
                KeyCode::Char('f') | KeyCode::Tab => app.cycle_status(),
                KeyCode::Char('/') => app.input = InputMode::Search,
                KeyCode::Enter | KeyCode::Char(' ') => app.toggle_selected(),
                KeyCode::Down | KeyCode::Char('j') => app.select_next(),
                KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
                _ => {}
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, table_state: &mut TableState) {
    let area = f.area();

    // Outer vertical split: header | body | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_body(f, app, table_state, chunks[1]);
    render_footer(f, app, chunks[2]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let criteria = app.dash.criteria();
    let status_label = app
        .dash
        .status_options()
        .iter()
        .find(|o| o.code == criteria.status)
        .map_or(ALL_STATUSES_LABEL, |o| o.label.as_str());

    let search_style = if app.input == InputMode::Search {
        Style::default().fg(Color::Black).bg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };

    let mut spans = vec![
        Span::styled(
            " 주문 관리  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(truncate(&app.base_url, 30), Style::default().fg(Color::DarkGray)),
        Span::raw("  │  상태: "),
        Span::styled(status_label.to_string(), Style::default().fg(Color::White)),
        Span::raw("  │  검색: "),
        Span::styled(format!("[{}]", criteria.search), search_style),
        Span::raw("  │  "),
        Span::styled(
            format!("{}건", app.dash.orders().len()),
            Style::default().fg(Color::White),
        ),
    ];
    if app.dash.sync_running() {
        spans.push(Span::raw("  │  "));
        spans.push(Span::styled("동기화 중", Style::default().fg(Color::Yellow)));
    }
    if let Some(notice) = app.dash.notice() {
        spans.push(Span::raw("  │  "));
        spans.push(Span::styled(notice.to_string(), Style::default().fg(Color::Green)));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(
            Style::default().fg(Color::DarkGray),
        ));

    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, table_state: &mut TableState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " 주문 목록 ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    match app.dash.screen() {
        Screen::Loading => {
            let p = Paragraph::new("불러오는 중...").style(Style::default().fg(Color::DarkGray)).block(block);
            f.render_widget(p, area);
        }
        Screen::Syncing(progress) => render_sync(f, progress, block, area),
        Screen::Error(message) => {
            let p = Paragraph::new(format!("{ERROR_PREFIX}{message}"))
                .style(Style::default().fg(Color::Red))
                .block(block);
            f.render_widget(p, area);
        }
        Screen::Empty => {
            let p = Paragraph::new(NO_RESULTS_TEXT).style(Style::default().fg(Color::DarkGray)).block(block);
            f.render_widget(p, area);
        }
        Screen::Table(table) => render_order_table(f, app, table, table_state, block, area),
    }
}

fn render_sync(f: &mut Frame, progress: Option<&SyncProgress>, block: Block, area: Rect) {
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(1), Constraint::Min(0)])
        .split(inner);

    let (window, percent) = match progress {
        Some(p) => (format!("구간: {}~{}일 전", p.offset_days, p.window_end_days), p.percent_complete),
        None => (String::new(), 0),
    };
    let label = match progress {
        Some(p) => format!("진행률: {percent}% ({})", chunk_label(p)),
        None => format!("진행률: {percent}%"),
    };
    let text = Paragraph::new(vec![Line::from("네이버와 동기화 중입니다..."), Line::from(window)]);
    f.render_widget(text, rows[0]);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan))
        .label(label)
        .percent(percent.min(100) as u16);
    f.render_widget(gauge, rows[1]);
}

fn status_color(class: StatusClass) -> Color {
    match class {
        StatusClass::Paid => Color::Green,
        StatusClass::InDelivery => Color::Cyan,
        StatusClass::Canceled => Color::Red,
        StatusClass::Default => Color::Gray,
    }
}

fn render_order_table(
    f: &mut Frame,
    app: &AppState,
    table: &OrderTable,
    state: &mut TableState,
    block: Block,
    area: Rect,
) {
    let header_cells = ["", "주문일시", "주문번호", "상태", "상품명 / 옵션", "수량", "구매자"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .visible_rows()
        .into_iter()
        .filter_map(|vr| match vr {
            VisibleRow::Summary(g) => {
                let row = table.rows.get(g)?;
                let s = &row.summary;
                let icon = if app.dash.is_expanded(&s.order_id) { "▾" } else { "▸" };
                Some(Row::new(vec![
                    Cell::from(icon).style(Style::default().fg(Color::DarkGray)),
                    Cell::from(s.order_date.clone()),
                    Cell::from(s.order_id.clone()),
                    Cell::from(truncate(&s.status_label, 14)).style(Style::default().fg(status_color(s.status_class))),
                    Cell::from(truncate(&s.product_summary, 40)),
                    Cell::from(s.total_quantity.to_string()),
                    Cell::from(truncate(&s.buyer_name, 10)),
                ]))
            }
            VisibleRow::Detail(g, d) => {
                let detail = table.rows.get(g)?.details.get(d)?;
                Some(Row::new(vec![
                    Cell::from("└").style(Style::default().fg(Color::DarkGray)),
                    Cell::from(""),
                    Cell::from(detail.product_order_id.clone()).style(Style::default().fg(Color::DarkGray)),
                    Cell::from(truncate(&detail.status_label, 14))
                        .style(Style::default().fg(status_color(detail.status_class))),
                    Cell::from(truncate(&format!("{} / {}", detail.product_name, detail.product_option), 40)),
                    Cell::from(detail.quantity.clone()),
                    Cell::from(""),
                ]))
            }
        })
        .collect();

    let widget = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Length(15),
            Constraint::Length(22),
            Constraint::Length(14),
            Constraint::Min(20),
            Constraint::Length(5),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );

    f.render_stateful_widget(widget, area, state);
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let line = if app.input == InputMode::Search {
        Line::from(vec![
            Span::styled(" [Enter] ", Style::default().fg(Color::Yellow)),
            Span::raw("done  "),
            Span::styled("[Esc] ", Style::default().fg(Color::Yellow)),
            Span::raw("clear search"),
        ])
    } else {
        Line::from(vec![
            Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
            Span::raw("quit  "),
            Span::styled("[s] ", Style::default().fg(Color::Yellow)),
            Span::raw("sync  "),
            Span::styled("[r] ", Style::default().fg(Color::Yellow)),
            Span::raw("reload  "),
            Span::styled("[f] ", Style::default().fg(Color::Yellow)),
            Span::raw("status  "),
            Span::styled("[/] ", Style::default().fg(Color::Yellow)),
            Span::raw("search  "),
            Span::styled("[Enter] ", Style::default().fg(Color::Yellow)),
            Span::raw("expand  "),
            Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
            Span::raw("move"),
        ])
    };
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
