mod app_service;
mod app_state;
mod commands;
mod config;
mod format;
mod normalize;
mod request;
mod session;
mod strategy;
mod ui;
mod worker;

use anyhow::Context;
use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::app_service::run_service;
use crate::app_state::{App, AppEvent};
use crate::config::AppConfig;
use crate::session::{EngineApi, HttpEngine};
use crate::ui::draw;
use crate::worker::ServiceCommand;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let log_dir = std::path::PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir).context("无法创建日志目录")?;
    let log_path = log_dir.join(format!("app-{}.log", ts));
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("无法创建日志文件: {}", log_path.display()))?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file))) // TUI 占用 stdout，日志写文件
        .filter_level(log::LevelFilter::Warn)
        .filter_module("alphadesk", log::LevelFilter::Info)
        .init();

    let mut startup_info = Vec::new();
    let current_dir = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    startup_info.push(format!("当前工作目录: {}", current_dir.display()));

    let config = AppConfig::load(&mut startup_info)?;
    log::info!("配置: {:?}", config);
    let engine = HttpEngine::from_config(&config).context("无法创建 HTTP 客户端")?;
    startup_info.push(format!("✓ 会话已就绪: {}", engine));
    let api: Arc<dyn EngineApi> = Arc::new(engine);

    let (svc_tx, svc_rx) = mpsc::unbounded_channel::<ServiceCommand>();
    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<AppEvent>();
    tokio::spawn(run_service(api, svc_rx, evt_tx));

    // TUI 初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(startup_info, config.signal_rows, svc_tx, evt_rx);
    let res = match app.evt_rx.take() {
        Some(rx) => run_app_loop(&mut terminal, &mut app, rx).await,
        None => Ok(()),
    };

    // 恢复终端
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res.context("界面主循环异常退出")
}

async fn run_app_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut evt_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        while let Ok(event) = evt_rx.try_recv() {
            app.handle_event(event);
        }

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key_event(key.code) {
                    return Ok(());
                }
            }
        }
    }
}
