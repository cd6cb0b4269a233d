use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use apptrack::api::HttpApi;
use apptrack::config::AppConfig;
use apptrack::controller::{ApplicationController, Outcome};
use apptrack::models::{
    ApplicationDraft, ApplicationId, ApplicationRecord, StatusFilter, StatusSummary, parse_date,
};
use apptrack::notify::{ConsoleNotifier, MessageLog};
use apptrack::session::CurrentUser;
use apptrack::tui;

#[derive(Parser)]
#[command(name = "apptrack")]
#[command(about = "Job application tracker - list, filter, and manage your applications")]
struct Cli {
    /// Log requests and responses (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List applications
    List {
        /// Only show this exact status (Applied, Interview, Offer, Rejected)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show one application
    Show {
        /// Application ID
        id: String,
    },

    /// Add an application
    Add {
        /// Company name
        #[arg(short, long)]
        company: String,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Edit an application; omitted fields keep their current value
    Edit {
        /// Application ID
        id: String,

        /// Company name
        #[arg(short, long)]
        company: Option<String>,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Delete an application
    Delete {
        /// Application ID
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Browse applications interactively
    Browse {
        /// Initial status filter
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show config location and effective settings
    Config,
}

#[derive(Args)]
struct FieldArgs {
    /// Position / job title
    #[arg(short, long)]
    position: Option<String>,

    /// Status (Applied, Interview, Offer, Rejected, or anything else)
    #[arg(short, long)]
    status: Option<String>,

    /// Date applied (YYYY-MM-DD), defaults to today when adding
    #[arg(short, long)]
    date: Option<String>,

    /// Link to the resume sent
    #[arg(short, long)]
    resume: Option<String>,

    /// Free-form notes
    #[arg(short, long)]
    notes: Option<String>,
}

impl FieldArgs {
    fn apply(self, draft: &mut ApplicationDraft) -> Result<()> {
        if let Some(position) = self.position {
            draft.position = position;
        }
        if let Some(status) = self.status {
            draft.set_status(&status);
        }
        if let Some(date) = self.date {
            let parsed = parse_date(&date)
                .ok_or_else(|| anyhow!("Invalid date '{}', expected YYYY-MM-DD", date))?;
            draft.applied_date = Some(parsed);
        }
        if self.resume.is_some() {
            draft.resume_link = self.resume;
        }
        if self.notes.is_some() {
            draft.notes = self.notes;
        }
        Ok(())
    }
}

type CliController = ApplicationController<HttpApi, ConsoleNotifier>;

fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn http_api(config: &AppConfig, user: Option<&CurrentUser>) -> Result<HttpApi> {
    let token = user.and_then(|u| u.token.clone());
    HttpApi::new(&config.api.base_url, token, config.api.timeout())
}

/// Logs in from config and loads the collection. Exits non-zero if loading failed;
/// the failure has already been printed by the notifier.
fn connect(config: &AppConfig, config_path: &Path) -> Result<CliController> {
    let user = CurrentUser::from_config(&config.auth).ok_or_else(|| {
        anyhow!(
            "Not logged in. Set auth.user and auth.token in {}",
            config_path.display()
        )
    })?;

    let api = http_api(config, Some(&user))?;
    let mut ctl = ApplicationController::new(api, ConsoleNotifier);
    exit_on_failure(ctl.set_user(Some(user)));
    Ok(ctl)
}

fn exit_on_failure(outcome: Outcome) {
    if outcome == Outcome::Failed {
        std::process::exit(1);
    }
}

fn find_record(ctl: &CliController, id: &str) -> Result<ApplicationRecord> {
    ctl.find(&ApplicationId::from(id))
        .cloned()
        .ok_or_else(|| anyhow!("Application {} not found", id))
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = AppConfig::load()?;

    // The browse view owns the terminal; log lines would corrupt it.
    if !matches!(cli.command, Commands::Browse { .. }) {
        init_logging(cli.verbose);
    }

    match cli.command {
        Commands::List { status } => {
            let mut ctl = connect(&config, &config_path)?;
            if let Some(status) = status {
                ctl.set_filter(StatusFilter::parse(&status));
            }

            let apps = ctl.visible();
            if apps.is_empty() {
                println!("No applications found for this status.");
            } else {
                println!(
                    "{:<26} {:<11} {:<24} {:<24} {:<10}",
                    "ID", "STATUS", "COMPANY", "POSITION", "APPLIED"
                );
                println!("{}", "-".repeat(99));
                for app in &apps {
                    println!(
                        "{:<26} {:<11} {:<24} {:<24} {:<10}",
                        truncate(app.id.as_str(), 26),
                        truncate(&app.status, 11),
                        truncate(&app.company, 22),
                        truncate(&app.position, 22),
                        app.applied_display()
                    );
                }
            }
            println!("\n[{}] {}", ctl.filter(), StatusSummary::of(apps.iter().copied()));
        }

        Commands::Show { id } => {
            let ctl = connect(&config, &config_path)?;
            let app = find_record(&ctl, &id)?;
            println!("Application {}", app.id);
            println!("Company: {}", app.company);
            if !app.position.is_empty() {
                println!("Position: {}", app.position);
            }
            println!("Status: {} ({})", app.status, app.category().label());
            println!("Applied: {}", app.applied_display());
            if let Some(link) = app.resume_link.as_deref().filter(|l| !l.is_empty()) {
                println!("Resume: {}", link);
            }
            if let Some(notes) = app.notes.as_deref().filter(|n| !n.is_empty()) {
                println!("\n--- Notes ---\n{}", textwrap::fill(notes, 80));
            }
        }

        Commands::Add { company, fields } => {
            if company.trim().is_empty() {
                bail!("Company must not be empty");
            }
            let mut ctl = connect(&config, &config_path)?;

            let today = chrono::Local::now().date_naive();
            let mut draft = ApplicationDraft::new(&company, "", "Applied", today);
            fields.apply(&mut draft)?;

            ctl.open_compose();
            exit_on_failure(ctl.submit(&draft));
        }

        Commands::Edit { id, company, fields } => {
            let mut ctl = connect(&config, &config_path)?;
            let app = find_record(&ctl, &id)?;

            let mut draft = app.to_draft();
            if let Some(company) = company {
                if company.trim().is_empty() {
                    bail!("Company must not be empty");
                }
                draft.company = company;
            }
            fields.apply(&mut draft)?;

            ctl.begin_edit(app);
            exit_on_failure(ctl.submit(&draft));
        }

        Commands::Delete { id, yes } => {
            let mut ctl = connect(&config, &config_path)?;
            let app = find_record(&ctl, &id)?;

            ctl.request_delete(app.id.clone());
            let prompt = format!(
                "Are you sure you want to delete this application? ({} - {})",
                app.company, app.position
            );
            if yes || confirm(&prompt)? {
                exit_on_failure(ctl.confirm_delete());
            } else {
                ctl.cancel_delete();
                println!("Cancelled.");
            }
        }

        Commands::Browse { status } => {
            let user = CurrentUser::from_config(&config.auth);
            let api = http_api(&config, user.as_ref())?;
            let mut ctl = ApplicationController::new(api, MessageLog::default());
            if let Some(status) = status {
                ctl.set_filter(StatusFilter::parse(&status));
            }
            ctl.set_user(user);
            tui::run_browse(&mut ctl)?;
        }

        Commands::Config => {
            println!("Config file: {}", config_path.display());
            println!("API: {}", config.api.base_url);
            println!("Timeout: {}s", config.api.timeout_secs);
            match CurrentUser::from_config(&config.auth) {
                Some(user) => {
                    let token = if user.token.is_some() { "set" } else { "not set" };
                    println!("User: {} (token {})", user.name, token);
                }
                None => println!("User: (not logged in)"),
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
