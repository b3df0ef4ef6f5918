use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use petconnect_core::{NewTutor, PetConnect, TutorUpdate, DEFAULT_PAGE_SIZE};

use super::pets::read_photo;
use super::{friendly, print_json, signed_in};

#[derive(Subcommand)]
pub(crate) enum TutorCommand {
    List {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long, default_value_t = 0)]
        page: u32,
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        size: u32,
    },
    /// Show a tutor with their linked pets.
    Get {
        id: i64,
    },
    Create {
        #[arg(long)]
        name: String,
        /// Formatted or digits only, e.g. 123.456.789-09.
        #[arg(long)]
        cpf: Option<String>,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        email: Option<String>,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        cpf: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Photo {
        id: i64,
        file: PathBuf,
    },
    Link {
        tutor_id: i64,
        pet_id: i64,
    },
    Unlink {
        tutor_id: i64,
        pet_id: i64,
    },
}

pub(crate) async fn run_tutors(app: &PetConnect, command: TutorCommand) -> Result<()> {
    let session = signed_in(app)?;
    let tutors = session.tutors();
    match command {
        TutorCommand::List { name, page, size } => {
            let page = tutors
                .list(name.as_deref(), page, size)
                .await
                .map_err(friendly)?;
            print_json(&page)
        }
        TutorCommand::Get { id } => print_json(&tutors.get(id).await.map_err(friendly)?),
        TutorCommand::Create {
            name,
            cpf,
            phone,
            address,
            email,
        } => {
            let tutor = NewTutor {
                name,
                tax_id: cpf,
                phone,
                address,
                email,
            };
            print_json(&tutors.create(&tutor).await.map_err(friendly)?)
        }
        TutorCommand::Update {
            id,
            name,
            cpf,
            phone,
            address,
            email,
        } => {
            let update = TutorUpdate {
                name,
                tax_id: cpf,
                phone,
                address,
                email,
            };
            print_json(&tutors.update(id, &update).await.map_err(friendly)?)
        }
        TutorCommand::Photo { id, file } => {
            tutors
                .upload_photo(id, read_photo(&file)?)
                .await
                .map_err(friendly)?;
            println!("Photo uploaded.");
            Ok(())
        }
        TutorCommand::Link { tutor_id, pet_id } => {
            tutors.link_pet(tutor_id, pet_id).await.map_err(friendly)?;
            println!("Pet {pet_id} linked to tutor {tutor_id}.");
            Ok(())
        }
        TutorCommand::Unlink { tutor_id, pet_id } => {
            tutors.unlink_pet(tutor_id, pet_id).await.map_err(friendly)?;
            println!("Pet {pet_id} unlinked from tutor {tutor_id}.");
            Ok(())
        }
    }
}
