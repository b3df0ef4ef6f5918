//! In-memory backend substitute for the demo account.
//!
//! Plain synchronous collections. Ids continue above the highest seed id.
//! A tutor's `pets` is never stored; [`MockStore::tutor`] joins it fresh on
//! every read.

use crate::types::{NewPet, NewTutor, Pet, PetUpdate, Tutor, TutorUpdate};

#[derive(Debug, Clone)]
pub struct MockStore {
    pets: Vec<Pet>,
    tutors: Vec<Tutor>,
    next_pet_id: i64,
    next_tutor_id: i64,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::seeded()
    }
}

impl MockStore {
    /// Store holding the two fixture pets and the demo tutor.
    pub fn seeded() -> Self {
        let pets = vec![
            Pet {
                id: Some(1),
                name: "Rex".to_string(),
                species: "CACHORRO".to_string(),
                age: Some(3),
                breed: Some("Golden Retriever".to_string()),
                photo_url: None,
                owner_id: None,
            },
            Pet {
                id: Some(2),
                name: "Luna".to_string(),
                species: "GATO".to_string(),
                age: Some(2),
                breed: Some("Siamese".to_string()),
                photo_url: None,
                owner_id: None,
            },
        ];
        let tutors = vec![Tutor {
            id: Some(1),
            name: "Demo User".to_string(),
            tax_id: None,
            phone: "(11) 99999-9999".to_string(),
            address: "123 Example Street".to_string(),
            email: Some(crate::auth::DEMO_EMAIL.to_string()),
            photo_url: None,
            pets: None,
        }];
        Self::with_records(pets, tutors)
    }

    /// Store holding exactly these records.
    pub fn with_records(pets: Vec<Pet>, tutors: Vec<Tutor>) -> Self {
        let next_pet_id = pets.iter().filter_map(|p| p.id).max().unwrap_or(0) + 1;
        let next_tutor_id = tutors.iter().filter_map(|t| t.id).max().unwrap_or(0) + 1;
        Self {
            pets,
            tutors,
            next_pet_id,
            next_tutor_id,
        }
    }

    // ---------------------------------------------------------------------
    // Pets
    // ---------------------------------------------------------------------

    pub fn pets(&self) -> Vec<Pet> {
        self.pets.clone()
    }

    pub fn pet(&self, id: i64) -> Option<Pet> {
        self.pets.iter().find(|p| p.id == Some(id)).cloned()
    }

    pub fn create_pet(&mut self, input: NewPet) -> Pet {
        let pet = Pet {
            id: Some(self.next_pet_id),
            name: input.name,
            species: input.species,
            age: input.age,
            breed: input.breed,
            photo_url: None,
            owner_id: input.owner_id,
        };
        self.next_pet_id += 1;
        self.pets.push(pet.clone());
        pet
    }

    /// Merge the set fields of `update`. `None` when the id is unknown.
    pub fn update_pet(&mut self, id: i64, update: &PetUpdate) -> Option<Pet> {
        let pet = self.pet_mut(id)?;
        if let Some(name) = &update.name {
            pet.name = name.clone();
        }
        if let Some(species) = &update.species {
            pet.species = species.clone();
        }
        if let Some(age) = update.age {
            pet.age = Some(age);
        }
        if let Some(breed) = &update.breed {
            pet.breed = Some(breed.clone());
        }
        Some(pet.clone())
    }

    pub fn set_pet_photo(&mut self, id: i64, url: String) -> Option<Pet> {
        let pet = self.pet_mut(id)?;
        pet.photo_url = Some(url);
        Some(pet.clone())
    }

    pub fn set_pet_owner(&mut self, id: i64, owner: Option<i64>) -> Option<Pet> {
        let pet = self.pet_mut(id)?;
        pet.owner_id = owner;
        Some(pet.clone())
    }

    fn pet_mut(&mut self, id: i64) -> Option<&mut Pet> {
        self.pets.iter_mut().find(|p| p.id == Some(id))
    }

    // ---------------------------------------------------------------------
    // Tutors
    // ---------------------------------------------------------------------

    /// Tutors without the pet join, as a listing returns them.
    pub fn tutors(&self) -> Vec<Tutor> {
        self.tutors.clone()
    }

    /// The tutor with every pet currently pointing at it.
    pub fn tutor(&self, id: i64) -> Option<Tutor> {
        let mut tutor = self.tutors.iter().find(|t| t.id == Some(id))?.clone();
        tutor.pets = Some(
            self.pets
                .iter()
                .filter(|p| p.owner_id == Some(id))
                .cloned()
                .collect(),
        );
        Some(tutor)
    }

    pub fn create_tutor(&mut self, input: NewTutor) -> Tutor {
        let tutor = Tutor {
            id: Some(self.next_tutor_id),
            name: input.name,
            tax_id: input.tax_id,
            phone: input.phone,
            address: input.address,
            email: input.email,
            photo_url: None,
            pets: None,
        };
        self.next_tutor_id += 1;
        self.tutors.push(tutor.clone());
        tutor
    }

    pub fn update_tutor(&mut self, id: i64, update: &TutorUpdate) -> Option<Tutor> {
        let tutor = self.tutor_mut(id)?;
        if let Some(name) = &update.name {
            tutor.name = name.clone();
        }
        if let Some(tax_id) = &update.tax_id {
            tutor.tax_id = Some(tax_id.clone());
        }
        if let Some(phone) = &update.phone {
            tutor.phone = phone.clone();
        }
        if let Some(address) = &update.address {
            tutor.address = address.clone();
        }
        if let Some(email) = &update.email {
            tutor.email = Some(email.clone());
        }
        Some(tutor.clone())
    }

    pub fn set_tutor_photo(&mut self, id: i64, url: String) -> Option<Tutor> {
        let tutor = self.tutor_mut(id)?;
        tutor.photo_url = Some(url);
        Some(tutor.clone())
    }

    fn tutor_mut(&mut self, id: i64) -> Option<&mut Tutor> {
        self.tutors.iter_mut().find(|t| t.id == Some(id))
    }
}
