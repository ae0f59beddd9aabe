mod export;
mod help;
mod state;

use crate::cli::{build_config, Cli};
use crate::model::{UiCommand, VideoAsset, WorkflowEvent, WorkflowPhase};
use crate::orchestrator;
use crate::service::HttpHighlightService;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{Notice, UiState, UploadAction};
use std::path::PathBuf;
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let service = HttpHighlightService::new(&cfg)?;

    // Unbounded channels: the controller never waits on the UI.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let rt = tokio::runtime::Handle::current();
    let ui_service = service.clone();
    let ui_handle = std::thread::spawn(move || {
        run_threaded(args, UiContext { rt, service: ui_service }, event_rx, cmd_tx)
    });

    orchestrator::run_controller(Arc::new(service), event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    Ok(())
}

/// Handles the UI thread needs for work that happens off the controller (downloads).
struct UiContext {
    rt: tokio::runtime::Handle,
    service: HttpHighlightService,
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    args: Cli,
    ctx: UiContext,
    mut event_rx: UnboundedReceiver<WorkflowEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        video_path: args.video.clone(),
        base_url: args.base_url.clone(),
        download_dir: args
            .download_dir
            .clone()
            .unwrap_or_else(crate::download::default_download_dir),
        ..Default::default()
    };

    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel::<Notice>();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }
        while let Ok(notice) = notice_rx.try_recv() {
            state.apply_notice(notice);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }

                // Ctrl-C quits even while a path is being typed.
                if is_interrupt(&k) {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }

                if state.path_editing {
                    match k.code {
                        KeyCode::Enter => state.commit_path_edit(),
                        KeyCode::Esc => state.cancel_path_edit(),
                        KeyCode::Backspace => {
                            state.path_input.pop();
                        }
                        KeyCode::Char(c) => state.path_input.push(c),
                        _ => {}
                    }
                    continue;
                }

                match k.code {
                    KeyCode::Char('q') => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    KeyCode::Char('o') => state.begin_path_edit(),
                    KeyCode::Char('u') => match state.request_upload() {
                        UploadAction::Ignore => {}
                        UploadAction::SubmitNothing => {
                            let _ = cmd_tx.send(UiCommand::SubmitUpload(None));
                        }
                        UploadAction::Load(path) => {
                            spawn_upload(&ctx.rt, path, cmd_tx.clone(), notice_tx.clone());
                        }
                    },
                    KeyCode::Char('g') => {
                        // Guarded by the controller; stray presses are dropped there.
                        let _ = cmd_tx.send(UiCommand::StartProcessing);
                    }
                    KeyCode::Char('d') => {
                        if let Some(card) = state.selected_card().cloned() {
                            state.info = format!("Downloading {}…", card.download_filename);
                            export::spawn_download(
                                &ctx.rt,
                                ctx.service.clone(),
                                card,
                                state.download_dir.clone(),
                                notice_tx.clone(),
                            );
                        }
                    }
                    KeyCode::Char('c') => {
                        if let Some(card) = state.selected_card() {
                            let link = export::clip_link(&ctx.service, card);
                            state.info = match export::copy_to_clipboard(&link) {
                                Ok(()) => format!("Copied: {link}"),
                                Err(e) => format!("Copy failed: {e:#}"),
                            };
                        }
                    }
                    KeyCode::Up | KeyCode::Char('k') => state.select_prev(),
                    KeyCode::Down | KeyCode::Char('j') => state.select_next(),
                    KeyCode::Tab => state.tab = (state.tab + 1) % 2,
                    KeyCode::Char('?') => state.tab = 1,
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn is_interrupt(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// Read the chosen file on the runtime and submit it once loaded.
fn spawn_upload(
    rt: &tokio::runtime::Handle,
    path: PathBuf,
    cmd_tx: UnboundedSender<UiCommand>,
    notice_tx: UnboundedSender<Notice>,
) {
    rt.spawn(async move {
        match VideoAsset::load(&path).await {
            Ok(asset) => {
                let _ = cmd_tx.send(UiCommand::SubmitUpload(Some(asset)));
            }
            Err(e) => {
                let msg = format!("Cannot read video: {e:#}");
                let _ = notice_tx.send(Notice::UploadReadFailed(msg));
            }
        }
    });
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Workflow"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("sportsight"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_workflow(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }
}

fn phase_color(phase: &WorkflowPhase) -> Color {
    match phase {
        WorkflowPhase::Idle => Color::Gray,
        WorkflowPhase::Uploading | WorkflowPhase::Processing => Color::Yellow,
        WorkflowPhase::UploadedReady => Color::Cyan,
        WorkflowPhase::ResultsReady => Color::Green,
        WorkflowPhase::Failed { .. } => Color::Red,
    }
}

fn draw_workflow(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(area);

    let label = Style::default().fg(Color::Gray);
    let video = if state.path_editing {
        format!("{}▏", state.path_input)
    } else {
        state
            .video_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".into())
    };
    // Mirrors the controller's enable signal; greyed out outside UploadedReady.
    let button_style = if state.start_enabled {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let status_lines = vec![
        Line::from(vec![
            Span::styled("Phase: ", label),
            Span::styled(
                state.phase.label(),
                Style::default().fg(phase_color(&state.phase)),
            ),
        ]),
        Line::from(vec![Span::styled("Status: ", label), Span::raw(state.status.clone())]),
        Line::from(vec![Span::styled("Video: ", label), Span::raw(video)]),
        Line::from(vec![
            Span::styled("Service: ", label),
            Span::raw(state.base_url.clone()),
        ]),
        Line::from(vec![Span::styled("[g] Generate highlights", button_style)]),
    ];
    let status = Paragraph::new(status_lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[0]);

    let items: Vec<ListItem> = state
        .cards
        .iter()
        .map(|card| {
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(
                        format!("{}. ", card.index),
                        Style::default().fg(Color::Magenta),
                    ),
                    Span::raw(card.caption.clone()),
                ]),
                Line::from(vec![
                    Span::raw("   "),
                    Span::styled(card.preview_src.clone(), Style::default().fg(Color::Cyan)),
                    Span::raw(" → "),
                    Span::raw(card.download_filename.clone()),
                ]),
            ])
        })
        .collect();
    let title = format!("Highlights ({})", state.cards.len());
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray));
    let mut list_state = ListState::default();
    if !state.cards.is_empty() {
        list_state.select(Some(state.selected));
    }
    f.render_stateful_widget(list, chunks[1], &mut list_state);

    let footer = Paragraph::new(Line::from(vec![
        Span::raw(state.info.clone()),
        Span::styled(
            format!("  downloads: {}", state.download_dir.display()),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Info"));
    f.render_widget(footer, chunks[2]);
}
