use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use std::path::PathBuf;

use taskflow::account::{self, ProfileForm};
use taskflow::api::{Credentials, Task};
use taskflow::config::{Config, TOKEN_ENV};
use taskflow::store::Commit;
use taskflow::util::{display_width, strip_control_chars, truncate_to_width};
use taskflow::workspace::Workspace;

/// Widest title printed in task and category listings.
const TITLE_COLUMNS: usize = 40;

#[derive(Parser, Debug)]
#[command(name = "taskflow", about = "Command-line client for the TaskFlow todo-list API")]
struct Args {
    /// Config file (default: ~/.config/taskflow/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// API base URL, overriding the config file
    #[arg(long, value_name = "URL", global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and print the token to export as TASKFLOW_TOKEN
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TASKFLOW_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "TASKFLOW_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show, update, or delete the signed-in account
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Manage the tasks of one category
    Tasks {
        /// Category id
        #[arg(long, short = 'c')]
        category: i64,
        #[command(subcommand)]
        action: TaskAction,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    Show,
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, hide_env_values = true, env = "TASKFLOW_CURRENT_PASSWORD")]
        current_password: Option<String>,
        #[arg(long, hide_env_values = true, env = "TASKFLOW_NEW_PASSWORD")]
        new_password: Option<String>,
        #[arg(long, hide_env_values = true, env = "TASKFLOW_CONFIRM_PASSWORD")]
        confirm_password: Option<String>,
    },
    Delete {
        /// Required; deletion cannot be undone
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryAction {
    List,
    Add { name: String },
    Rm { id: i64 },
}

#[derive(Subcommand, Debug)]
enum TaskAction {
    List,
    Add { title: String },
    Toggle { id: i64 },
    Rm { id: i64 },
    Show { id: i64 },
    Rename { id: i64, title: String },
    /// Set the due date (YYYY-MM-DD or RFC 3339); an empty string clears it
    Due { id: i64, date: String },
    StepAdd { id: i64, step: String },
    /// Remove a step by its 1-based position
    StepRm { id: i64, position: usize },
    /// Move the task to another category
    Move { id: i64, to: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_path().context("HOME environment variable not set")?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }

    let mut ws = Workspace::from_config(&config)
        .with_context(|| format!("Cannot use API at {}", config.base_url))?;

    match args.command {
        Command::Login { email, password } => {
            let creds = Credentials {
                email,
                password,
                username: None,
            };
            let token = account::login(ws.api_mut(), &creds)
                .await
                .context("Sign-in failed")?;
            eprintln!("Signed in. Export the token to use it in later commands:");
            println!("export {}={}", TOKEN_ENV, token.expose_secret());
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let creds = Credentials {
                email,
                password,
                username: Some(username),
            };
            account::register(ws.api(), &creds)
                .await
                .context("Registration failed")?;
            println!("Account created. Sign in with `taskflow login`.");
        }
        Command::Profile { action } => run_profile(&mut ws, action).await?,
        Command::Categories { action } => run_categories(&mut ws, action).await?,
        Command::Tasks { category, action } => run_tasks(&mut ws, category, action).await?,
    }

    Ok(())
}

async fn run_profile(ws: &mut Workspace, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::Show => {
            let profile = account::profile(ws.api())
                .await
                .context("Failed to load profile")?;
            println!("Username: {}", strip_control_chars(&profile.username));
            println!("Email:    {}", strip_control_chars(&profile.email));
        }
        ProfileAction::Update {
            username,
            email,
            current_password,
            new_password,
            confirm_password,
        } => {
            let current = account::profile(ws.api())
                .await
                .context("Failed to load profile")?;
            let mut form = ProfileForm::from_profile(&current);
            if let Some(username) = username {
                form.username = username;
            }
            if let Some(email) = email {
                form.email = email;
            }
            form.current_password = current_password.unwrap_or_default();
            form.new_password = new_password.unwrap_or_default();
            form.confirm_password = confirm_password.unwrap_or_default();
            account::update_profile(ws.api(), &form)
                .await
                .context("Profile update failed")?;
            println!("Profile updated.");
        }
        ProfileAction::Delete { yes } => {
            if !yes {
                anyhow::bail!("Refusing to delete the account without --yes");
            }
            account::delete_account(ws.api_mut())
                .await
                .context("Account deletion failed")?;
            println!("Account deleted. Unset {TOKEN_ENV}.");
        }
    }
    Ok(())
}

async fn run_categories(ws: &mut Workspace, action: CategoryAction) -> Result<()> {
    ws.refresh_categories()
        .await
        .context("Failed to load categories")?;

    match action {
        CategoryAction::List => {
            for category in ws.categories().ordered() {
                println!(
                    "{:>6}  {}",
                    category.id,
                    column(&category.name)
                );
            }
        }
        CategoryAction::Add { name } => {
            let category = ws
                .add_category(&name)
                .await
                .context("Failed to create category")?;
            println!(
                "Created category {} ({})",
                strip_control_chars(&category.name),
                category.id
            );
        }
        CategoryAction::Rm { id } => {
            ws.delete_category(id)
                .await
                .with_context(|| format!("Failed to delete category {id}"))?;
            println!("Deleted category {id}.");
        }
    }
    Ok(())
}

async fn run_tasks(ws: &mut Workspace, category: i64, action: TaskAction) -> Result<()> {
    ws.refresh_categories()
        .await
        .context("Failed to load categories")?;
    let title = ws
        .categories()
        .get(category)
        .map(|c| c.name.clone())
        .with_context(|| format!("No category with id {category}"))?;
    ws.open_category(category, title)
        .await
        .context("Failed to load tasks")?;

    match action {
        TaskAction::List => {
            let tasks = ws.visible_tasks();
            if tasks.is_empty() {
                println!("No tasks.");
            }
            for task in tasks {
                println!("{}", task_line(task));
            }
        }
        TaskAction::Add { title } => {
            let task = ws.add_task(&title).await.context("Failed to add task")?;
            println!("{}", task_line(&task));
        }
        TaskAction::Toggle { id } => {
            let completed = ws
                .toggle_task(id)
                .await
                .with_context(|| format!("Failed to update task {id}"))?;
            let state = if completed { "done" } else { "open" };
            println!("Task {id} marked {state}.");
        }
        TaskAction::Rm { id } => {
            ws.delete_task(id)
                .await
                .with_context(|| format!("Failed to delete task {id}"))?;
            println!("Deleted task {id}.");
        }
        TaskAction::Show { id } => {
            ws.open_task(id)?;
            print_editor(ws);
        }
        TaskAction::Rename { id, title } => {
            ws.open_task(id)?;
            ws.edit_title(title)?;
            let outcome = ws.blur_title().await.context("Failed to rename task")?;
            report_commit(outcome);
            print_editor(ws);
        }
        TaskAction::Due { id, date } => {
            ws.open_task(id)?;
            let outcome = ws
                .set_due_date(&date)
                .await
                .context("Failed to set due date")?;
            report_commit(outcome);
            print_editor(ws);
        }
        TaskAction::StepAdd { id, step } => {
            ws.open_task(id)?;
            let outcome = ws.add_step(&step).await.context("Failed to add step")?;
            report_commit(outcome);
            print_editor(ws);
        }
        TaskAction::StepRm { id, position } => {
            ws.open_task(id)?;
            let index = position
                .checked_sub(1)
                .context("Step positions start at 1")?;
            let outcome = ws
                .remove_step(index)
                .await
                .context("Failed to remove step")?;
            report_commit(outcome);
            print_editor(ws);
        }
        TaskAction::Move { id, to } => {
            ws.open_task(id)?;
            let outcome = ws.move_task(to).await.context("Failed to move task")?;
            report_commit(outcome);
        }
    }
    Ok(())
}

/// Server text made safe for the terminal and cut to [`TITLE_COLUMNS`].
fn column(text: &str) -> String {
    truncate_to_width(&strip_control_chars(text), TITLE_COLUMNS).into_owned()
}

fn task_line(task: &Task) -> String {
    let mark = if task.completed { "[x]" } else { "[ ]" };
    let title = column(&task.title);
    let padding = TITLE_COLUMNS.saturating_sub(display_width(&title));
    let mut line = format!("{mark} {:>6}  {title}{}", task.id, " ".repeat(padding));
    if !task.due_date.is_empty() {
        line.push_str(&format!("  due {}", strip_control_chars(&task.due_date)));
    }
    if !task.steps.is_empty() {
        line.push_str(&format!("  ({} steps)", task.steps.len()));
    }
    line
}

fn print_editor(ws: &Workspace) {
    let Some(editor) = ws.editor() else {
        return;
    };
    let task = editor.task();
    println!("{}", task_line(task));
    if let Some(category) = ws.selection().title() {
        println!("  Category: {}", strip_control_chars(category));
    }
    for (i, step) in task.steps.iter().enumerate() {
        println!("  {}. {}", i + 1, strip_control_chars(step));
    }
}

fn report_commit(outcome: Commit) {
    match outcome {
        Commit::Unchanged => println!("Nothing to change."),
        Commit::Saved => println!("Saved."),
        Commit::Moved { to_category } => println!("Moved to category {to_category}."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn task(title: &str) -> Task {
        Task {
            id: 7,
            title: title.to_string(),
            completed: false,
            steps: vec!["call".to_string()],
            due_date: "2026-03-01\x1b[2J".to_string(),
            category_id: 2,
        }
    }

    #[test]
    fn test_task_line_drops_escape_sequences() {
        let line = task_line(&task("\x1b[31mRed\x1b[0m alert"));
        assert!(!line.contains('\x1b'));
        assert!(line.starts_with("[ ]      7  Red alert "));
        assert!(line.contains("  due 2026-03-01  "));
        assert!(line.ends_with("(1 steps)"));
    }

    #[test]
    fn test_column_strips_before_truncating() {
        let name = format!("\x1b[1m{}", "x".repeat(60));
        let cell = column(&name);
        assert!(!cell.contains('\x1b'));
        assert_eq!(display_width(&cell), TITLE_COLUMNS);
    }
}
