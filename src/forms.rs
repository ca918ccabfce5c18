//! Form input checks done before anything reaches the repository.
//!
//! Only presence is checked: blank required fields are reported, but no
//! format rules (email shape, phone shape, tax-id checksum) are applied.

use chrono::NaiveDate;

use crate::error::{AppError, ValidationError};
use crate::models::{Dog, DogPatch, LifeStage, NewDog, NewUser, NewVisit, Sex, User, UserPatch};

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn require(fields: &[(&'static str, bool)]) -> Result<(), ValidationError> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { missing })
    }
}

fn require_user(user: Option<&User>) -> Result<&User, AppError> {
    user.ok_or(AppError::NotLoggedIn)
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&[("email", !blank(&self.email)), ("password", !blank(&self.password))])
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
    pub phone: String,
    pub tax_id: String,
    pub birthdate: String,
}

impl RegistrationForm {
    pub fn validate(self) -> Result<NewUser, ValidationError> {
        require(&[
            ("name", !blank(&self.name)),
            ("email", !blank(&self.email)),
            ("password", !blank(&self.password)),
        ])?;
        Ok(NewUser {
            name: self.name,
            email: self.email,
            password: self.password,
            address: self.address,
            phone: self.phone,
            tax_id: self.tax_id,
            birthdate: self.birthdate,
        })
    }
}

/// Account page edits; name and email cannot be cleared.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
    pub birthdate: Option<String>,
    pub password: Option<String>,
}

impl ProfileForm {
    pub fn validate(self) -> Result<UserPatch, ValidationError> {
        require(&[
            ("name", !self.name.as_deref().is_some_and(blank)),
            ("email", !self.email.as_deref().is_some_and(blank)),
        ])?;
        Ok(UserPatch {
            name: self.name,
            email: self.email,
            phone: self.phone,
            tax_id: self.tax_id,
            birthdate: self.birthdate,
            // An empty password field means "keep the current one"
            password: self.password.filter(|p| !blank(p)),
            address: None,
        })
    }
}

/// Search-region page: only the address changes.
pub fn location_patch(address: &str) -> Result<UserPatch, ValidationError> {
    require(&[("address", !blank(address))])?;
    Ok(UserPatch {
        address: Some(address.to_string()),
        ..UserPatch::default()
    })
}

#[derive(Debug, Clone, Default)]
pub struct DogForm {
    pub name: String,
    pub breed: String,
    pub life_stage: LifeStage,
    pub sex: Sex,
    pub age: String,
    pub color: String,
    pub address: String,
    pub description: String,
    pub image: String,
    pub house_trained: bool,
    pub pet_friendly: bool,
}

impl DogForm {
    fn check(&self) -> Result<(), ValidationError> {
        require(&[
            ("name", !blank(&self.name)),
            ("breed", !blank(&self.breed)),
            ("age", !blank(&self.age)),
        ])
    }

    /// New listing owned by the logged-in user. An empty address falls back
    /// to the owner's own address.
    pub fn into_new_dog(self, owner: Option<&User>) -> Result<NewDog, AppError> {
        let owner = require_user(owner)?;
        self.check()?;
        let address = if blank(&self.address) {
            owner.address.clone()
        } else {
            self.address
        };
        Ok(NewDog {
            name: self.name,
            breed: self.breed,
            life_stage: self.life_stage,
            sex: self.sex,
            age: self.age,
            color: self.color,
            address,
            description: self.description,
            image: self.image,
            house_trained: self.house_trained,
            pet_friendly: self.pet_friendly,
            owner_id: owner.id.clone(),
        })
    }

    /// Full replacement of the editable fields; ownership is kept.
    pub fn into_patch(self) -> Result<DogPatch, ValidationError> {
        self.check()?;
        Ok(DogPatch {
            name: Some(self.name),
            breed: Some(self.breed),
            life_stage: Some(self.life_stage),
            sex: Some(self.sex),
            age: Some(self.age),
            color: Some(self.color),
            address: Some(self.address),
            description: Some(self.description),
            image: Some(self.image),
            house_trained: Some(self.house_trained),
            pet_friendly: Some(self.pet_friendly),
            owner_id: None,
        })
    }
}

impl From<&Dog> for DogForm {
    fn from(dog: &Dog) -> Self {
        Self {
            name: dog.name.clone(),
            breed: dog.breed.clone(),
            life_stage: dog.life_stage,
            sex: dog.sex,
            age: dog.age.clone(),
            color: dog.color.clone(),
            address: dog.address.clone(),
            description: dog.description.clone(),
            image: dog.image.clone(),
            house_trained: dog.house_trained,
            pet_friendly: dog.pet_friendly,
        }
    }
}

/// Only the owner may edit or delete a listing.
pub fn authorize_owner(dog: &Dog, user: Option<&User>) -> Result<(), AppError> {
    let user = require_user(user)?;
    if dog.owner_id == user.id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VisitForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub tax_id: String,
    pub date: Option<NaiveDate>,
    pub notes: String,
}

impl VisitForm {
    /// Form pre-filled with the requester's contact details.
    pub fn prefilled(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            tax_id: user.tax_id.clone(),
            ..Self::default()
        }
    }

    pub fn into_new_visit(self, dog_id: &str, requester: Option<&User>) -> Result<NewVisit, AppError> {
        let requester = require_user(requester)?;
        require(&[
            ("name", !blank(&self.name)),
            ("email", !blank(&self.email)),
            ("date", self.date.is_some()),
        ])?;
        let date = self.date.ok_or(ValidationError {
            missing: vec!["date"],
        })?;
        Ok(NewVisit {
            dog_id: dog_id.to_string(),
            name: self.name,
            email: self.email,
            phone: self.phone,
            tax_id: self.tax_id,
            date,
            notes: self.notes,
            user_id: requester.id.clone(),
        })
    }
}
