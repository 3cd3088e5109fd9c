//! Course Reconciler CLI
//!
//! Local execution entry point. For AWS Lambda, use `course-reconciler-lambda`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use course_reconciler::{
    error::{AppError, Result},
    models::{Actor, Config, ModuleDraft, Role},
    pipeline,
    services::{CourseEditor, ModuleMigrator, ModuleResolver},
    storage::{self, DualWriteStore, paths},
};

/// Course Reconciler - e-learning data maintenance
#[derive(Parser, Debug)]
#[command(
    name = "course-reconciler",
    version,
    about = "Normalize, resolve and migrate e-learning course records"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "storage/config.toml")]
    config: PathBuf,

    /// Acting user ID for mutating commands
    #[arg(long, default_value = "system")]
    user: String,

    /// Role of the acting user (admin, instructor, student)
    #[arg(long, default_value = "admin", value_parser = parse_role)]
    role: Role,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Migrate module IDs of every course
    Reconcile {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Migrate module IDs of one course
    Migrate {
        course_id: String,

        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve a module reference and print the normalized module
    Resolve { course_id: String, module_ref: String },

    /// Append a module to a course
    AddModule {
        course_id: String,

        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Archive (soft-delete) a course
    Archive {
        course_id: String,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Validate the configuration file
    Validate,

    /// Show store and namespace info
    Info,
}

fn parse_role(value: &str) -> std::result::Result<Role, String> {
    match value.to_ascii_lowercase().as_str() {
        "admin" => Ok(Role::Admin),
        "instructor" => Ok(Role::Instructor),
        "student" => Ok(Role::Student),
        other => Err(format!("unknown role '{}'", other)),
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, default_level: &str) {
    let level = if verbose { "debug" } else { default_level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env()?;
    init_logging(cli.verbose, &config.logging.level);

    log::info!("Loaded configuration from {}", cli.config.display());

    if let Command::Validate = cli.command {
        log::info!("Validating configuration...");
        if let Err(e) = config.validate() {
            log::error!("Config validation failed: {}", e);
            return Err(e);
        }
        log::info!("✓ Config OK ({:?} backend)", config.store.backend);
        return Ok(());
    }

    config.validate()?;
    let backend = storage::open_store(&config.store).await?;
    let store = DualWriteStore::new(backend, &config.namespaces);
    let actor = Actor::new(cli.user, cli.role);

    match cli.command {
        Command::Reconcile { dry_run } => {
            config.reconcile.dry_run |= dry_run;
            let summary = pipeline::run_reconcile(&config, store, actor).await?;
            println!("{}", summary.message());
        }

        Command::Migrate { course_id, dry_run } => {
            let migrator = ModuleMigrator::new(store, actor)
                .dry_run(dry_run || config.reconcile.dry_run);
            let result = migrator.migrate_module_ids(&course_id).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Resolve {
            course_id,
            module_ref,
        } => {
            let resolver = ModuleResolver::new(store);
            match resolver.resolve(&course_id, &module_ref).await {
                Ok(found) => {
                    log::info!("Resolved via {} ({} namespace)", found.via, found.namespace);
                    for evaluation in found.module.evaluations_in_order() {
                        log::info!(
                            "  evaluation {} ({}, {} questions)",
                            evaluation.id,
                            evaluation.kind,
                            evaluation.questions.len()
                        );
                    }
                    println!("{}", serde_json::to_string_pretty(&found.module)?);
                }
                Err(diagnostics) => {
                    log::error!("Attempted paths:");
                    for path in &diagnostics.attempted_paths {
                        log::error!("  - {}", path);
                    }
                    for failure in &diagnostics.read_errors {
                        log::error!("  ! {}", failure);
                    }
                    return Err(AppError::from(diagnostics));
                }
            }
        }

        Command::AddModule {
            course_id,
            title,
            description,
        } => {
            let draft = ModuleDraft {
                title,
                description,
                status: None,
            };
            let module = CourseEditor::new(store)
                .add_module(&actor, &course_id, &draft)
                .await?;
            println!("{}", serde_json::to_string_pretty(&module)?);
        }

        Command::Archive { course_id, reason } => {
            let course = CourseEditor::new(store)
                .archive_course(&actor, &course_id, reason.as_deref())
                .await?;
            log::info!(
                "Course {} archived at {}",
                course.id,
                course.archived_at.as_deref().unwrap_or("-")
            );
        }

        Command::Info => {
            log::info!("Backend: {:?}", config.store.backend);
            for namespace in store.namespaces() {
                let path = store
                    .full_path(namespace, paths::COURSES)
                    .unwrap_or_default();
                let count = store.keys(namespace, paths::COURSES).await?.len();
                log::info!("{} namespace: {} courses at {}", namespace, count, path);
            }
            log::info!(
                "Dual write: {}",
                if config.namespaces.dual_write && config.namespaces.legacy_namespace().is_some() {
                    "on"
                } else {
                    "off"
                }
            );
        }

        Command::Validate => {}
    }

    log::info!("Done!");

    Ok(())
}
