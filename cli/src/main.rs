use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use petconnect_core::{telemetry, ClientConfig, FileStore, PetConnect};

mod commands;

use commands::{PetCommand, TutorCommand};

#[derive(Parser)]
#[command(name = "petconnect")]
#[command(about = "Manage pets and tutors in the PetConnect registry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in. `teste` / `teste123` opens the offline demo account.
    Login {
        username: String,
        #[arg(short, long)]
        password: String,
    },
    Logout,
    /// Show the signed-in user.
    Whoami,
    Pets {
        #[command(subcommand)]
        command: PetCommand,
    },
    Tutors {
        #[command(subcommand)]
        command: TutorCommand,
    },
    /// Create a tutor and, with --email and --password, sign in as them.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        cpf: Option<String>,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Generate a short biography for a pet.
    Bio {
        name: String,
        species: String,
        #[arg(short, long)]
        breed: Option<String>,
    },
}

fn session_path(config: &ClientConfig) -> PathBuf {
    config.storage.path.clone().unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("petconnect")
            .join("session.json")
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ClientConfig::from_env().context("invalid configuration")?;
    telemetry::init_telemetry(&config.logging);

    let path = session_path(&config);
    let storage = FileStore::open(&path)
        .with_context(|| format!("cannot open session file {}", path.display()))?;
    let app = PetConnect::new(config, Arc::new(storage))?;
    let mut events = app.subscribe();

    let outcome = match cli.command {
        Commands::Login { username, password } => commands::login(&app, username, password).await,
        Commands::Logout => {
            app.logout();
            println!("Signed out.");
            Ok(())
        }
        Commands::Whoami => commands::whoami(&app),
        Commands::Pets { command } => commands::pets(&app, command).await,
        Commands::Tutors { command } => commands::tutors(&app, command).await,
        Commands::Register {
            name,
            cpf,
            phone,
            address,
            email,
            password,
        } => {
            let tutor = petconnect_core::NewTutor {
                name,
                tax_id: cpf,
                phone,
                address,
                email,
            };
            commands::register(&app, tutor, password).await
        }
        Commands::Bio {
            name,
            species,
            breed,
        } => {
            println!("{}", app.bio().generate(&name, &species, breed.as_deref()).await);
            Ok(())
        }
    };

    commands::report_session_events(&mut events);
    outcome
}
