use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use petconnect_core::{NewPet, PetConnect, PetUpdate, PhotoFile, DEFAULT_PAGE_SIZE};

use super::{friendly, print_json, signed_in};

#[derive(Subcommand)]
pub(crate) enum PetCommand {
    List {
        /// Case-insensitive name filter.
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long, default_value_t = 0)]
        page: u32,
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        size: u32,
    },
    Get {
        id: i64,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        species: String,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        breed: Option<String>,
        #[arg(long)]
        tutor: Option<i64>,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        species: Option<String>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        breed: Option<String>,
    },
    /// Upload a photo from a local image file.
    Photo {
        id: i64,
        file: PathBuf,
    },
}

pub(crate) async fn run_pets(app: &PetConnect, command: PetCommand) -> Result<()> {
    let session = signed_in(app)?;
    let pets = session.pets();
    match command {
        PetCommand::List { name, page, size } => {
            let page = pets
                .list(name.as_deref(), page, size)
                .await
                .map_err(friendly)?;
            print_json(&page)
        }
        PetCommand::Get { id } => print_json(&pets.get(id).await.map_err(friendly)?),
        PetCommand::Create {
            name,
            species,
            age,
            breed,
            tutor,
        } => {
            let pet = NewPet {
                name,
                species,
                age,
                breed,
                owner_id: tutor,
            };
            print_json(&pets.create(&pet).await.map_err(friendly)?)
        }
        PetCommand::Update {
            id,
            name,
            species,
            age,
            breed,
        } => {
            let update = PetUpdate {
                name,
                species,
                age,
                breed,
            };
            print_json(&pets.update(id, &update).await.map_err(friendly)?)
        }
        PetCommand::Photo { id, file } => {
            pets.upload_photo(id, read_photo(&file)?)
                .await
                .map_err(friendly)?;
            println!("Photo uploaded.");
            Ok(())
        }
    }
}

pub(crate) fn read_photo(path: &Path) -> Result<PhotoFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("photo")
        .to_string();
    let content_type = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };
    Ok(PhotoFile {
        file_name,
        content_type: content_type.to_string(),
        bytes,
    })
}
