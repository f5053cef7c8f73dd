use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::Result;
use std::path::PathBuf;
use todostore::display::{self, parse_date};
use todostore::{
    Backend, Category, CompletionFilter, Config, Priority, Selector, SortKey, SortOrder, Status, Store, TaskOptions,
    TaskPatch, ViewState, now_ms,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "TodoStore CLI - personal task list with filters, statistics and local persistence")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to a YAML config file (default: <config dir>/todostore/config.yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding saved state (overrides config)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Storage backend: file or sqlite (overrides config)
    #[arg(short, long)]
    backend: Option<Backend>,

    /// Disable coloured output
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        text: String,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(short, long)]
        category: Option<Category>,
        #[arg(short, long)]
        status: Option<Status>,
        /// Due date, YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        due: Option<i64>,
        #[arg(long)]
        description: Option<String>,
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// List tasks; given flags also update the saved view
    List {
        /// all, active or completed
        #[arg(short, long)]
        filter: Option<CompletionFilter>,
        /// Case-insensitive search over text, description and tags ("" clears)
        #[arg(short, long)]
        search: Option<String>,
        /// Category or "all"
        #[arg(short, long)]
        category: Option<Selector<Category>>,
        /// Priority or "all"
        #[arg(short, long)]
        priority: Option<Selector<Priority>>,
        /// created_at, priority, due_date or alphabetical
        #[arg(long)]
        sort: Option<SortKey>,
        /// asc or desc
        #[arg(long)]
        order: Option<SortOrder>,
    },

    /// Toggle a task between complete and incomplete
    Toggle { id: String },

    /// Delete a task
    Rm { id: String },

    /// Replace a task's text
    Edit { id: String, text: String },

    /// Change other task fields
    Set {
        id: String,
        #[arg(long)]
        description: Option<String>,
        /// Due date, YYYY-MM-DD
        #[arg(long, value_parser = parse_date, conflicts_with = "clear_due")]
        due: Option<i64>,
        #[arg(long)]
        clear_due: bool,
        /// Replace tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Set a task's priority
    Priority { id: String, priority: Priority },

    /// Set a task's category
    Category { id: String, category: Category },

    /// Set a task's status
    Status { id: String, status: Status },

    /// Duplicate a task
    Dup { id: String },

    /// Complete all tasks, or reopen all if every task is complete
    ToggleAll,

    /// Remove completed tasks
    ClearCompleted,

    /// Remove every task
    ClearAll,

    /// Show statistics
    Stats,

    /// Reset filters, search and sorting to defaults
    ResetView,
}

fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if cli.no_color || !config.color {
        colored::control::set_override(false);
    }

    let mut store = Store::open(config.open_blob_store()?, config.key.clone());

    match cli.command {
        Commands::Add {
            text,
            priority,
            category,
            status,
            due,
            description,
            tags,
        } => {
            let options = TaskOptions {
                status,
                priority,
                category,
                due_date: due,
                description,
                tags: (!tags.is_empty()).then_some(tags),
            };
            match store.add(&text, options) {
                Some(id) => println!("Added {}", display::short_id(&id)),
                None => println!("Nothing added: task text is empty"),
            }
        }
        Commands::List {
            filter,
            search,
            category,
            priority,
            sort,
            order,
        } => {
            if let Some(filter) = filter {
                store.set_filter(filter);
            }
            if let Some(search) = search {
                store.set_search_query(search);
            }
            if let Some(category) = category {
                store.set_category(category);
            }
            if let Some(priority) = priority {
                store.set_priority(priority);
            }
            if let Some(sort) = sort {
                store.set_sort_by(sort);
            }
            if let Some(order) = order {
                store.set_sort_order(order);
            }
            print_list(&store);
        }
        Commands::Toggle { id } => {
            if let Some(id) = resolve(&store, &id) {
                store.toggle(&id);
                report(&store, &id);
            }
        }
        Commands::Rm { id } => {
            if let Some(id) = resolve(&store, &id) {
                store.remove(&id);
                println!("Removed {}", display::short_id(&id));
            }
        }
        Commands::Edit { id, text } => {
            if let Some(id) = resolve(&store, &id) {
                if store.update_text(&id, &text) {
                    report(&store, &id);
                } else {
                    println!("Unchanged: task text is empty");
                }
            }
        }
        Commands::Set {
            id,
            description,
            due,
            clear_due,
            tags,
        } => {
            if let Some(id) = resolve(&store, &id) {
                let patch = TaskPatch {
                    description,
                    due_date: if clear_due { Some(None) } else { due.map(Some) },
                    tags: (!tags.is_empty()).then_some(tags),
                    ..Default::default()
                };
                if patch.is_empty() {
                    println!("Nothing to change");
                } else {
                    store.update(&id, patch);
                    report(&store, &id);
                }
            }
        }
        Commands::Priority { id, priority } => {
            if let Some(id) = resolve(&store, &id) {
                store.update_priority(&id, priority);
                report(&store, &id);
            }
        }
        Commands::Category { id, category } => {
            if let Some(id) = resolve(&store, &id) {
                store.update_category(&id, category);
                report(&store, &id);
            }
        }
        Commands::Status { id, status } => {
            if let Some(id) = resolve(&store, &id) {
                store.update_status(&id, status);
                report(&store, &id);
            }
        }
        Commands::Dup { id } => {
            if let Some(id) = resolve(&store, &id)
                && let Some(copy) = store.duplicate(&id)
            {
                report(&store, &copy);
            }
        }
        Commands::ToggleAll => {
            if store.toggle_all() {
                let done = store.tasks().iter().all(|t| t.completed);
                println!("Marked {} tasks {}", store.len(), if done { "complete" } else { "incomplete" });
            } else {
                println!("No tasks");
            }
        }
        Commands::ClearCompleted => {
            let removed = store.clear_completed();
            println!("Removed {} completed tasks", removed);
        }
        Commands::ClearAll => {
            let removed = store.clear_all();
            println!("Removed {} tasks", removed);
        }
        Commands::Stats => print_stats(&store),
        Commands::ResetView => {
            store.set_view(ViewState::default());
            println!("View reset");
        }
    }

    Ok(())
}

/// Resolve a full id or id suffix to exactly one task id
fn resolve(store: &Store, needle: &str) -> Option<String> {
    let matches = store.find_matching(needle);
    match matches.as_slice() {
        [task] => Some(task.id.clone()),
        [] => {
            println!("No task matches '{}'", needle);
            None
        }
        _ => {
            println!("'{}' is ambiguous: {} tasks match", needle, matches.len());
            None
        }
    }
}

fn report(store: &Store, id: &str) {
    if let Some(task) = store.get(id) {
        println!("{}", display::render_task(task, now_ms()));
    }
}

fn print_list(store: &Store) {
    let now = now_ms();
    let view = store.view();
    let visible = store.visible();

    if visible.is_empty() {
        println!("{}", "No tasks".dimmed());
    }
    for task in &visible {
        println!("{}", display::render_task(task, now));
    }

    let mut summary = format!(
        "{} of {} shown | filter={} category={} priority={} sort={} {}",
        visible.len(),
        store.len(),
        view.filter,
        view.category,
        view.priority,
        view.sort_by,
        view.sort_order,
    );
    if !view.search_query.is_empty() {
        summary.push_str(&format!(" search={:?}", view.search_query));
    }
    println!("{}", summary.bright_black());
}

fn print_stats(store: &Store) {
    let stats = store.stats();

    println!("Total:         {}", stats.total);
    println!("Completed:     {} ({}%)", stats.completed, stats.completion_rate());
    println!("Active:        {}", stats.active);
    println!("High priority: {}", stats.high_priority);
    if stats.overdue > 0 {
        println!("Overdue:       {}", stats.overdue.to_string().red().bold());
    } else {
        println!("Overdue:       0");
    }

    println!("\nBy category:");
    for (category, count) in &stats.by_category {
        println!("  {:<10} {}", category.as_str(), count);
    }

    println!("\nBy priority:");
    for (priority, count) in stats.by_priority.iter().rev() {
        println!("  {:<10} {}", priority.as_str(), count);
    }
}
