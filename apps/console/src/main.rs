mod config;

use std::{
    io::{self, BufRead, Write},
    process::ExitCode,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    AlwaysConfirm, Confirm, DurableSessionStore, HttpRegistryClient, NavItem, NavigationGuard,
    NoticeLevel, Route, SessionStore, SyncController, SyncEvent, SyncResult,
};
use shared::{
    domain::{UserId, UserRecord},
    protocol::Registration,
};
use tokio::sync::broadcast;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "registry-console", about = "Operate a remote user registry")]
struct Cli {
    /// Overrides the configured registry base URL.
    #[arg(long, global = true)]
    registry_url: Option<String>,
    /// Overrides the local sqlite database holding the session.
    #[arg(long, global = true)]
    database_url: Option<String>,
    /// Skip the delete confirmation prompt.
    #[arg(long, short = 'y', global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the signed-in identity and the reachable views.
    Status,
    /// Fetch and print every registry record.
    List,
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        password: String,
    },
    /// Load a record, apply the given field changes, and submit it.
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    Delete {
        id: i64,
    },
}

/// Reads a y/n answer from the terminal.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = config::load_settings()?;
    if let Some(url) = cli.registry_url.clone() {
        settings.registry_url = url;
    }
    if let Some(url) = cli.database_url.clone() {
        settings.database_url = url;
    }
    debug!(?settings, "resolved console settings");

    let sessions = Arc::new(
        DurableSessionStore::open(&settings.database_url)
            .await
            .with_context(|| format!("failed to open local store '{}'", settings.database_url))?,
    );
    let registry = Arc::new(HttpRegistryClient::new(&settings.registry_url)?);
    let confirm: Arc<dyn Confirm> = if cli.yes {
        Arc::new(AlwaysConfirm)
    } else {
        Arc::new(StdinConfirm)
    };
    let controller = SyncController::new(registry, sessions.clone(), confirm)
        .with_timings(settings.timings());
    let mut events = controller.subscribe_events();

    let outcome = run(&controller, sessions.as_ref(), cli.command).await;
    let navigation = render_events(&mut events);

    if let Some((Route::Home, delay)) = navigation {
        tokio::time::sleep(delay).await;
        println!("-> {}", Route::Home);
        if controller.mount_list().await.is_ok() {
            print_records(&controller.records().await);
        }
        render_events(&mut events);
    } else if let Some((route, delay)) = navigation {
        tokio::time::sleep(delay).await;
        println!("-> {route}");
    }

    Ok(if outcome.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run(
    controller: &SyncController,
    sessions: &dyn SessionStore,
    command: Command,
) -> SyncResult<()> {
    match command {
        Command::Status => {
            print_status(&NavigationGuard::load(sessions).await);
            Ok(())
        }
        Command::List => {
            controller.mount_list().await?;
            print_records(&controller.records().await);
            Ok(())
        }
        Command::Login { email, password } => {
            let session = controller.authenticate(&email, &password).await?;
            println!("signed in as {} (id {})", session.name, session.id);
            Ok(())
        }
        Command::Logout => controller.logout().await,
        Command::Register {
            name,
            email,
            phone,
            password,
        } => {
            let created = controller
                .create(Registration {
                    name,
                    email,
                    phone,
                    password,
                })
                .await?;
            if let Some(id) = created {
                println!("created user {id}");
            }
            Ok(())
        }
        Command::Edit {
            id,
            name,
            email,
            phone,
        } => {
            let draft = controller.begin_edit(UserId(id)).await?;
            if name.is_none() && email.is_none() && phone.is_none() {
                print_records(&[UserRecord {
                    id: draft.id,
                    name: draft.fields.name,
                    email: draft.fields.email,
                    phone: draft.fields.phone,
                }]);
                return Ok(());
            }
            controller
                .edit_draft(|fields| {
                    if let Some(name) = name {
                        fields.name = name;
                    }
                    if let Some(email) = email {
                        fields.email = email;
                    }
                    if let Some(phone) = phone {
                        fields.phone = phone;
                    }
                })
                .await?;
            controller.submit_edit().await
        }
        Command::Delete { id } => {
            controller.mount_list().await?;
            controller.remove(UserId(id)).await?;
            print_records(&controller.records().await);
            Ok(())
        }
    }
}

/// Prints pending notices and returns the last scheduled navigation.
fn render_events(
    events: &mut broadcast::Receiver<SyncEvent>,
) -> Option<(Route, std::time::Duration)> {
    let mut navigation = None;
    loop {
        match events.try_recv() {
            Ok(SyncEvent::Notice(notice)) => {
                let tag = match notice.level {
                    NoticeLevel::Success => "ok",
                    NoticeLevel::Info => "info",
                    NoticeLevel::Warning => "warn",
                    NoticeLevel::Error => "error",
                };
                println!("[{tag}] {}", notice.message);
            }
            Ok(SyncEvent::NavigationScheduled { to, delay }) => navigation = Some((to, delay)),
            Ok(SyncEvent::SessionChanged(_)) | Ok(SyncEvent::RecordsChanged) => {}
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                debug!(skipped, "console fell behind the event stream");
            }
            Err(_) => break,
        }
    }
    navigation
}

fn print_status(guard: &NavigationGuard) {
    match guard.session() {
        Some(session) => println!("signed in as {} (id {})", session.name, session.id),
        None => println!("not signed in"),
    }
    let items: Vec<&str> = guard
        .visible_items()
        .iter()
        .map(|item| match item {
            NavItem::Home => "home",
            NavItem::Logout => "logout",
            NavItem::Login => "login",
            NavItem::Register => "register",
        })
        .collect();
    println!("navigation: {}", items.join(", "));
}

fn print_records(records: &[UserRecord]) {
    if records.is_empty() {
        println!("no users");
        return;
    }
    println!("{:>6}  {:<24}  {:<32}  {}", "id", "name", "email", "phone");
    for record in records {
        println!(
            "{:>6}  {:<24}  {:<32}  {}",
            record.id.0, record.name, record.email, record.phone
        );
    }
}
