//! Horizon Todo command-line front end.
//!
//! Wires the Firestore document store, the public sample feed and Firebase
//! authentication into a [`TodoAggregator`] and runs one command against it.
//!
//! Run with: `horizon-todo list`, `horizon-todo add Buy milk`, ...
//! Logging: `RUST_LOG=debug horizon-todo list`
//! Metrics: `HORIZON_TODO_METRICS=1 horizon-todo list`

mod cli;
mod config;
mod session_file;
mod telemetry;

use anyhow::bail;
use cli::{Command, USAGE};
use config::AppConfig;
use horizon_todo_core::{AuthSession, IdentityProvider, SystemClock, Todo, TodoPatch, TodoSource};
use horizon_todo_feed::JsonPlaceholderClient;
use horizon_todo_firestore::{FirebaseAuth, FirestoreClient};
use horizon_todo_runtime::{Navigation, TodoAggregator, TodoEnvironment, TodoListState, guard};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config.observability.log_level);
    let metrics = if config.observability.metrics {
        Some(telemetry::install()?)
    } else {
        None
    };

    let outcome = execute(&config).await;
    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }
    outcome
}

async fn execute(config: &AppConfig) -> anyhow::Result<()> {
    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => bail!("{e}\n\n{USAGE}"),
    };
    if command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let session_path = session_file::default_path();
    let session = AuthSession::new();
    session_file::restore(&session, &session_path)?;

    if let Navigation::Redirect(to) = guard(command.route(), &session).await {
        bail!("Please sign in first ({to}): horizon-todo login <email> <password>");
    }

    match command {
        Command::Login { email, password } => {
            let principal = identity(config, &session)?.sign_in(&email, &password).await?;
            session_file::save(&session_path, &principal)?;
            println!("Signed in as {}", principal.email.as_deref().unwrap_or(&email));
        }
        Command::SignUp { email, password } => {
            let principal = identity(config, &session)?.sign_up(&email, &password).await?;
            session_file::save(&session_path, &principal)?;
            println!("Account created. Signed in as {email}");
        }
        Command::Logout => {
            session_file::clear(&session_path)?;
            session.publish(None);
            println!("Signed out");
        }
        command => {
            let restored = session.snapshot();
            let outcome = run(command, config, session.clone()).await;
            session_file::persist_changes(&session, restored.as_ref(), &session_path)?;
            outcome?;
        }
    }
    Ok(())
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn identity(config: &AppConfig, session: &AuthSession) -> anyhow::Result<FirebaseAuth> {
    let api_key = config.firestore.require_api_key()?;
    Ok(FirebaseAuth::new(api_key, session.clone())
        .with_base_url(&config.firestore.auth_base_url)
        .with_token_base_url(&config.firestore.token_base_url)
        .with_timeout(config.feed.timeout())?)
}

fn aggregator(config: &AppConfig, session: AuthSession) -> anyhow::Result<TodoAggregator> {
    // Signed-out runs never reach the document store.
    let project_id = match session.snapshot() {
        Some(_) => config.firestore.require_project_id()?,
        None => config.firestore.project_id.as_deref().unwrap_or_default(),
    };
    let mut store = FirestoreClient::new(project_id, session.clone())
        .with_base_url(&config.firestore.base_url)
        .with_timeout(config.feed.timeout())?;
    if let Some(key) = &config.firestore.api_key {
        store = store
            .with_api_key(key)
            .with_token_refresh(identity(config, &session)?);
    }
    let feed = JsonPlaceholderClient::with_timeout(&config.feed.base_url, config.feed.timeout())?;

    let env = TodoEnvironment::new(Arc::new(store), Arc::new(feed), session, Arc::new(SystemClock))
        .with_collection(&config.firestore.collection)
        .with_feed_limit(config.feed.limit);
    Ok(TodoAggregator::new(env, config.pagination.page_size()?))
}

async fn run(command: Command, config: &AppConfig, session: AuthSession) -> anyhow::Result<()> {
    let todos = aggregator(config, session)?;

    match command {
        Command::List { page } => {
            todos.load(page).await;
            let state = todos.snapshot();
            if let Some(error) = &state.error {
                bail!("{error}");
            }
            print_page(&state);
        }
        Command::Add { title } => {
            let todo = todos.add(&title).await?;
            print_todo(&todo);
            print_status(&todos);
        }
        Command::Rename { id, title } => {
            load_quietly(&todos).await;
            let patched = todos.update(&id, TodoPatch::new().title(title)).await?;
            if let Some(todo) = patched {
                print_todo(&todo);
            }
            print_status(&todos);
        }
        Command::SetCompleted { id, completed } => {
            load_quietly(&todos).await;
            let patched = todos
                .update(&id, TodoPatch::new().completed(completed))
                .await?;
            if let Some(todo) = patched {
                print_todo(&todo);
            }
            print_status(&todos);
        }
        Command::Delete { id } => {
            todos.delete(&id).await?;
            print_status(&todos);
        }
        Command::Search { query } => {
            load_quietly(&todos).await;
            let hits = todos.search(&query);
            println!("{} match(es) for \"{query}\"", hits.len());
            for todo in &hits {
                print_todo(todo);
            }
        }
        Command::Show { id } => {
            load_quietly(&todos).await;
            let Some(todo) = todos.find(&id) else {
                bail!("Todo {id} not found");
            };
            print_details(&todo);
        }
        Command::Login { .. } | Command::SignUp { .. } | Command::Logout | Command::Help => {
            tracing::debug!(?command, "handled before the aggregator is built");
        }
    }
    Ok(())
}

/// Loads the first page so lookups see the merged list; a failed load is
/// logged and the command continues.
async fn load_quietly(todos: &TodoAggregator) {
    todos.load(1).await;
    if let Some(error) = todos.state(|s| s.error.clone()) {
        tracing::warn!(%error, "continuing without a loaded list");
    }
}

fn print_page(state: &TodoListState) {
    if state.todos.is_empty() {
        println!("No todos on this page.");
    }
    for todo in &state.todos {
        print_todo(todo);
    }
    let pagination = &state.pagination;
    println!(
        "\nPage {} of {} ({} todos)",
        pagination.current_page, pagination.total_pages, pagination.total_count
    );
}

fn print_todo(todo: &Todo) {
    let status = if todo.completed { "✓" } else { " " };
    let sample = match todo.source() {
        TodoSource::PublicFeed => "  (sample)",
        TodoSource::RemoteStore => "",
    };
    println!("  [{status}] {:>20}  {}{sample}", todo.id.to_string(), todo.title);
}

fn print_details(todo: &Todo) {
    println!("Id:        {}", todo.id);
    println!("Title:     {}", todo.title);
    println!("Completed: {}", if todo.completed { "yes" } else { "no" });
    if let Some(created_at) = todo.created_at {
        println!("Created:   {}", created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if todo.source() == TodoSource::PublicFeed {
        println!("Source:    public sample feed (changes are not persisted)");
    }
}

fn print_status(todos: &TodoAggregator) {
    if let Some(message) = todos.state(|s| s.success_message.clone()) {
        println!("{message}");
    }
}
