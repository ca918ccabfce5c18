//! Marketplace entities as they are persisted in the JSON collections.
//!
//! Each entity comes in three shapes:
//! - the stored record (`User`, `Dog`, ...) carrying its assigned `id`
//! - a draft (`NewUser`, `NewDog`, ...) with every field except the id
//! - a patch (`UserPatch`, `DogPatch`, ...) where every field is optional,
//!   applied as a shallow merge over an existing record

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::events::Collection;

/// A record stored in one of the collections, addressable by its string id.
pub trait Entity: Serialize + for<'de> Deserialize<'de> + Clone {
    /// Collection this record lives in (also selects the storage key).
    const COLLECTION: Collection;

    fn id(&self) -> &str;
}

/// Partial update merged over an existing record.
pub trait Patch<T> {
    /// Overwrite only the fields present in the patch.
    fn apply(&self, target: &mut T);
}

macro_rules! merge_fields {
    ($patch:expr, $target:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$patch.$field {
                $target.$field = value.clone();
            }
        )+
    };
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    // Stored and compared as plain text; there is no hashing here
    pub password: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub tax_id: String,
    #[serde(default)]
    pub birthdate: String,
}

impl Entity for User {
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
    pub phone: String,
    pub tax_id: String,
    pub birthdate: String,
}

impl NewUser {
    pub fn with_id(self, id: String) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            password: self.password,
            address: self.address,
            phone: self.phone,
            tax_id: self.tax_id,
            birthdate: self.birthdate,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
    pub birthdate: Option<String>,
}

impl Patch<User> for UserPatch {
    fn apply(&self, target: &mut User) {
        merge_fields!(self, target, name, email, password, address, phone, tax_id, birthdate);
    }
}

/// Life stage shown on a listing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LifeStage {
    #[default]
    Puppy,
    Adult,
    Senior,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[default]
    Male,
    Female,
}

impl std::fmt::Display for LifeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LifeStage::Puppy => "puppy",
            LifeStage::Adult => "adult",
            LifeStage::Senior => "senior",
        })
    }
}

impl std::str::FromStr for LifeStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "puppy" => Ok(LifeStage::Puppy),
            "adult" => Ok(LifeStage::Adult),
            "senior" => Ok(LifeStage::Senior),
            other => Err(format!("unknown life stage `{other}` (expected puppy, adult or senior)")),
        }
    }
}

impl std::str::FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            other => Err(format!("unknown sex `{other}` (expected male or female)")),
        }
    }
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Sex::Male => "male",
            Sex::Female => "female",
        })
    }
}

/// A dog listed for adoption.
///
/// `owner_id` is a weak reference to the donating [`User`]; nothing cascades
/// when that user goes away.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Dog {
    pub id: String,
    pub name: String,
    pub breed: String,
    pub life_stage: LifeStage,
    pub sex: Sex,
    // Free text, e.g. "5 months"
    pub age: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub house_trained: bool,
    #[serde(default)]
    pub pet_friendly: bool,
    pub owner_id: String,
}

impl Entity for Dog {
    const COLLECTION: Collection = Collection::Dogs;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NewDog {
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
    pub owner_id: String,
}

impl NewDog {
    pub fn with_id(self, id: String) -> Dog {
        Dog {
            id,
            name: self.name,
            breed: self.breed,
            life_stage: self.life_stage,
            sex: self.sex,
            age: self.age,
            color: self.color,
            address: self.address,
            description: self.description,
            image: self.image,
            house_trained: self.house_trained,
            pet_friendly: self.pet_friendly,
            owner_id: self.owner_id,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DogPatch {
    pub name: Option<String>,
    pub breed: Option<String>,
    pub life_stage: Option<LifeStage>,
    pub sex: Option<Sex>,
    pub age: Option<String>,
    pub color: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub house_trained: Option<bool>,
    pub pet_friendly: Option<bool>,
    pub owner_id: Option<String>,
}

impl Patch<Dog> for DogPatch {
    fn apply(&self, target: &mut Dog) {
        merge_fields!(
            self,
            target,
            name,
            breed,
            life_stage,
            sex,
            age,
            color,
            address,
            description,
            image,
            house_trained,
            pet_friendly,
            owner_id,
        );
    }
}

/// A scheduled visit to meet a dog.
///
/// Duplicate bookings for the same dog and date are allowed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: String,
    pub dog_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub tax_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: String,
    pub user_id: String,
}

impl Entity for Visit {
    const COLLECTION: Collection = Collection::Visits;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewVisit {
    pub dog_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub tax_id: String,
    pub date: NaiveDate,
    pub notes: String,
    pub user_id: String,
}

impl NewVisit {
    pub fn with_id(self, id: String) -> Visit {
        Visit {
            id,
            dog_id: self.dog_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            tax_id: self.tax_id,
            date: self.date,
            notes: self.notes,
            user_id: self.user_id,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitPatch {
    pub dog_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub user_id: Option<String>,
}

impl Patch<Visit> for VisitPatch {
    fn apply(&self, target: &mut Visit) {
        merge_fields!(self, target, dog_id, name, email, phone, tax_id, date, notes, user_id);
    }
}

/// One chat line about a listing. Messages are append-only.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub dog_id: String,
    pub sender_id: String,
    // Snapshot of the sender's name at send time
    pub sender_name: String,
    pub text: String,
    // Epoch milliseconds
    pub timestamp: i64,
}

impl Entity for Message {
    const COLLECTION: Collection = Collection::Messages;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NewMessage {
    pub dog_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
}

impl NewMessage {
    pub fn stamped(self, id: String, timestamp: i64) -> Message {
        Message {
            id,
            dog_id: self.dog_id,
            sender_id: self.sender_id,
            sender_name: self.sender_name,
            text: self.text,
            timestamp,
        }
    }
}
