mod app;
mod cli;
mod config;
mod devops;
mod error;
mod event;
mod logging;
mod model;
mod ui;
mod workload;

use std::io;
use std::panic;
use std::sync::Arc;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::info;

use app::{Action, App};
use cli::Command;
use devops::client::HttpApi;
use devops::DevOpsApi;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = cli::parse_command(&args)?;
    if command == Command::Help {
        cli::print_help();
        return Ok(());
    }

    let config = config::load_config()?;
    logging::init_logging(&config.logging, &config::data_dir())?;
    info!(collections = config.collections().len(), "workload starting");

    let api: Arc<dyn DevOpsApi> = Arc::new(HttpApi::new(config.query.request_timeout())?);

    match command {
        Command::Report(report) => {
            print!("{}", cli::report_output(api.as_ref(), &config, &report).await?);
            Ok(())
        }
        Command::Projects => {
            print!("{}", cli::projects_output(api.as_ref(), &config).await?);
            Ok(())
        }
        Command::Teams(project) => {
            print!("{}", cli::teams_output(api.as_ref(), &config, &project).await?);
            Ok(())
        }
        Command::Dashboard | Command::Help => run_dashboard(&config, api).await,
    }
}

async fn run_dashboard(config: &config::AppConfig, api: Arc<dyn DevOpsApi>) -> Result<()> {
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let mut app = App::new(config, api, action_tx.clone());

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    // Restore the terminal before the panic message prints
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let event_tx = action_tx.clone();
    tokio::spawn(async move {
        event::run_event_loop(event_tx).await;
    });

    // Initial fetch; reports missing configuration in the footer
    terminal.draw(|f| ui::render(f, &app))?;
    app.load_projects().await;

    loop {
        terminal.draw(|f| ui::render(f, &app))?;

        if let Some(action) = action_rx.recv().await {
            app.update(action).await;
            if app.should_quit {
                break;
            }
        } else {
            break;
        }
    }

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}
