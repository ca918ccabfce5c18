//! Data access layer over the key-value store.
//!
//! Each collection lives as one JSON array under one key. Every operation
//! reads the entire array, works on it in memory, and writes the entire
//! array back. There is no partial update, no index beyond a linear scan,
//! and no referential integrity between collections: deleting a dog leaves
//! its visits and messages in place.
//!
//! The repository is built once and handed to consumers by reference. After
//! each successful write it publishes a [`ChangeEvent`] so that views holding
//! a cached copy can reload.

use std::cmp::Reverse;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::error::{StoreError, StoreResult};
use crate::events::{ChangeEvent, ChangeFeed, ChangeKind, ChangeSubscription, Collection};
use crate::models::{
    Dog, DogPatch, Entity, LifeStage, Message, NewDog, NewMessage, NewUser, NewVisit, Patch, Sex,
    User, UserPatch, Visit, VisitPatch,
};
use crate::storage::KvStore;

pub const DEFAULT_NAMESPACE: &str = "adotadog";

pub struct Repository<S: KvStore> {
    store: S,
    namespace: String,
    clock: Box<dyn Clock>,
    feed: ChangeFeed,
    seed: bool,
}

impl<S: KvStore> Repository<S> {
    /// Repository over `store` with the default namespace and the wall clock.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, DEFAULT_NAMESPACE, SystemClock)
    }

    pub fn with_clock(store: S, namespace: impl Into<String>, clock: impl Clock + 'static) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            clock: Box::new(clock),
            feed: ChangeFeed::new(),
            seed: true,
        }
    }

    /// Turn first-run seeding on or off; with it off, `bootstrap` writes nothing.
    pub fn with_seeding(mut self, seed: bool) -> Self {
        self.seed = seed;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn subscribe(&self) -> ChangeSubscription {
        self.feed.subscribe()
    }

    /// Namespaced key for a collection, e.g. `adotadog_dogs`.
    pub fn storage_key(&self, collection: Collection) -> String {
        format!("{}_{}", self.namespace, collection.key())
    }

    // --- Bootstrap ---

    /// Seed sample users and dogs, and empty visit/message arrays, for every
    /// key that is still absent. Existing data is never merged or replaced.
    /// Returns true if anything was written.
    pub fn bootstrap(&self) -> StoreResult<bool> {
        if !self.store.is_available() {
            debug!("store unavailable; bootstrap skipped");
            return Ok(false);
        }
        if !self.seed {
            return Ok(false);
        }

        let mut seeded = false;
        seeded |= self.seed_if_absent(&sample_users())?;
        seeded |= self.seed_if_absent(&sample_dogs())?;
        seeded |= self.seed_if_absent::<Visit>(&[])?;
        seeded |= self.seed_if_absent::<Message>(&[])?;
        Ok(seeded)
    }

    fn seed_if_absent<T: Entity>(&self, records: &[T]) -> StoreResult<bool> {
        let key = self.storage_key(T::COLLECTION);
        if self.store.get(&key)?.is_some() {
            return Ok(false);
        }
        self.write_all(records)?;
        info!(key = %key, records = records.len(), "collection seeded");
        self.feed
            .publish(ChangeEvent::new(T::COLLECTION, ChangeKind::Seeded, None));
        Ok(true)
    }

    // --- Generic collection plumbing ---

    /// Deserialize the whole collection; an absent key reads as empty.
    fn read_all<T: Entity>(&self) -> StoreResult<Vec<T>> {
        let key = self.storage_key(T::COLLECTION);
        let records: Vec<T> = match self.store.get(&key)? {
            Some(json) => {
                serde_json::from_str(&json).map_err(|source| StoreError::Json { key: key.clone(), source })?
            }
            None => Vec::new(),
        };
        debug!(key = %key, records = records.len(), "collection loaded");
        Ok(records)
    }

    fn write_all<T: Entity>(&self, records: &[T]) -> StoreResult<()> {
        let key = self.storage_key(T::COLLECTION);
        let json = serde_json::to_string(records)
            .map_err(|source| StoreError::Json { key: key.clone(), source })?;
        self.store.set(&key, &json)?;
        debug!(key = %key, records = records.len(), "collection saved");
        Ok(())
    }

    fn find<T: Entity>(&self, id: &str) -> StoreResult<Option<T>> {
        Ok(self.read_all::<T>()?.into_iter().find(|record| record.id() == id))
    }

    /// Epoch-millisecond id, bumped forward past any id already taken in
    /// this collection so two records created in the same millisecond
    /// still get distinct ids.
    fn next_id<T: Entity>(&self, existing: &[T]) -> (String, i64) {
        let mut millis = self.clock.now_millis();
        while existing.iter().any(|record| record.id() == millis.to_string()) {
            millis += 1;
        }
        (millis.to_string(), millis)
    }

    fn append<T: Entity>(&self, build: impl FnOnce(String, i64) -> T) -> StoreResult<T> {
        let mut records = self.read_all::<T>()?;
        let (id, millis) = self.next_id(&records);
        let record = build(id, millis);
        records.push(record.clone());
        self.write_all(&records)?;
        info!(collection = ?T::COLLECTION, id = record.id(), "record created");
        self.feed
            .publish(ChangeEvent::new(T::COLLECTION, ChangeKind::Created, Some(record.id())));
        Ok(record)
    }

    fn merge<T: Entity, P: Patch<T>>(&self, id: &str, patch: &P) -> StoreResult<Option<T>> {
        let mut records = self.read_all::<T>()?;
        let Some(record) = records.iter_mut().find(|record| record.id() == id) else {
            debug!(collection = ?T::COLLECTION, id, "update target not found");
            return Ok(None);
        };
        patch.apply(record);
        let updated = record.clone();
        self.write_all(&records)?;
        self.feed
            .publish(ChangeEvent::new(T::COLLECTION, ChangeKind::Updated, Some(id)));
        Ok(Some(updated))
    }

    // --- Users ---

    pub fn list_users(&self) -> StoreResult<Vec<User>> {
        self.read_all()
    }

    pub fn get_user(&self, id: &str) -> StoreResult<Option<User>> {
        self.find(id)
    }

    /// Append a user. Email uniqueness is not enforced.
    pub fn create_user(&self, draft: NewUser) -> StoreResult<User> {
        self.append(|id, _| draft.with_id(id))
    }

    /// First user whose email matches exactly.
    pub fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .list_users()?
            .into_iter()
            .find(|user| user.email == email))
    }

    /// Merge `patch` over the user; the session copy is refreshed when it
    /// belongs to the same user.
    pub fn update_user(&self, id: &str, patch: &UserPatch) -> StoreResult<Option<User>> {
        let Some(updated) = self.merge::<User, _>(id, patch)? else {
            return Ok(None);
        };
        if self.current_user()?.is_some_and(|current| current.id == id) {
            self.write_session(&updated)?;
        }
        Ok(Some(updated))
    }

    // --- Session ---

    pub fn current_user(&self) -> StoreResult<Option<User>> {
        let key = self.storage_key(Collection::Session);
        match self.store.get(&key)? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|source| StoreError::Json { key, source }),
            None => Ok(None),
        }
    }

    pub(crate) fn write_session(&self, user: &User) -> StoreResult<()> {
        let key = self.storage_key(Collection::Session);
        let json =
            serde_json::to_string(user).map_err(|source| StoreError::Json { key: key.clone(), source })?;
        self.store.set(&key, &json)?;
        self.feed.publish(ChangeEvent::new(
            Collection::Session,
            ChangeKind::Updated,
            Some(&user.id),
        ));
        Ok(())
    }

    pub(crate) fn clear_session(&self) -> StoreResult<()> {
        self.store.remove(&self.storage_key(Collection::Session))?;
        self.feed
            .publish(ChangeEvent::new(Collection::Session, ChangeKind::Deleted, None));
        Ok(())
    }

    // --- Dogs ---

    pub fn list_dogs(&self) -> StoreResult<Vec<Dog>> {
        self.read_all()
    }

    pub fn get_dog(&self, id: &str) -> StoreResult<Option<Dog>> {
        self.find(id)
    }

    pub fn create_dog(&self, draft: NewDog) -> StoreResult<Dog> {
        self.append(|id, _| draft.with_id(id))
    }

    pub fn update_dog(&self, id: &str, patch: &DogPatch) -> StoreResult<Option<Dog>> {
        self.merge(id, patch)
    }

    /// Remove a dog listing. Returns false (and writes nothing) when no dog
    /// has that id. Visits and messages pointing at it are left orphaned.
    pub fn delete_dog(&self, id: &str) -> StoreResult<bool> {
        let dogs = self.list_dogs()?;
        let before = dogs.len();
        let remaining: Vec<Dog> = dogs.into_iter().filter(|dog| dog.id != id).collect();
        if remaining.len() == before {
            return Ok(false);
        }
        self.write_all(&remaining)?;
        info!(id, "dog deleted");
        self.feed
            .publish(ChangeEvent::new(Collection::Dogs, ChangeKind::Deleted, Some(id)));
        Ok(true)
    }

    /// Case-insensitive substring match on name OR breed OR address.
    /// A blank query returns every dog.
    pub fn search_dogs(&self, query: &str) -> StoreResult<Vec<Dog>> {
        let dogs = self.list_dogs()?;
        if query.trim().is_empty() {
            return Ok(dogs);
        }
        let needle = query.to_lowercase();
        Ok(dogs
            .into_iter()
            .filter(|dog| {
                dog.name.to_lowercase().contains(&needle)
                    || dog.breed.to_lowercase().contains(&needle)
                    || dog.address.to_lowercase().contains(&needle)
            })
            .collect())
    }

    pub fn list_dogs_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Dog>> {
        Ok(self
            .list_dogs()?
            .into_iter()
            .filter(|dog| dog.owner_id == owner_id)
            .collect())
    }

    // --- Visits ---

    pub fn list_visits(&self) -> StoreResult<Vec<Visit>> {
        self.read_all()
    }

    pub fn get_visit(&self, id: &str) -> StoreResult<Option<Visit>> {
        self.find(id)
    }

    /// Book a visit. Duplicate bookings for the same dog and date are fine.
    pub fn create_visit(&self, draft: NewVisit) -> StoreResult<Visit> {
        self.append(|id, _| draft.with_id(id))
    }

    pub fn update_visit(&self, id: &str, patch: &VisitPatch) -> StoreResult<Option<Visit>> {
        self.merge(id, patch)
    }

    /// Visits a user either requested or received for a dog they own,
    /// most recent date first.
    pub fn list_visits_for_user(&self, user_id: &str) -> StoreResult<Vec<Visit>> {
        let owned: Vec<String> = self
            .list_dogs_by_owner(user_id)?
            .into_iter()
            .map(|dog| dog.id)
            .collect();
        let mut visits: Vec<Visit> = self
            .list_visits()?
            .into_iter()
            .filter(|visit| visit.user_id == user_id || owned.contains(&visit.dog_id))
            .collect();
        // Stable sort keeps booking order among visits on the same day
        visits.sort_by_key(|visit| Reverse(visit.date));
        Ok(visits)
    }

    // --- Messages ---

    pub fn list_messages(&self) -> StoreResult<Vec<Message>> {
        self.read_all()
    }

    /// Thread for one dog, in the order the messages were sent.
    pub fn list_messages_by_dog(&self, dog_id: &str) -> StoreResult<Vec<Message>> {
        Ok(self
            .list_messages()?
            .into_iter()
            .filter(|message| message.dog_id == dog_id)
            .collect())
    }

    /// Append a message stamped with the current time. Fails with
    /// [`StoreError::Unavailable`] when there is no store to write to.
    pub fn send_message(&self, draft: NewMessage) -> StoreResult<Message> {
        if !self.store.is_available() {
            return Err(StoreError::Unavailable);
        }
        self.append(|id, millis| draft.stamped(id, millis))
    }

    /// Whether `date` is today or later according to the repository clock.
    pub fn is_upcoming(&self, date: NaiveDate) -> bool {
        date >= self.clock.today()
    }
}

fn sample_users() -> Vec<User> {
    vec![User {
        id: "1".to_string(),
        name: "João Silva".to_string(),
        email: "joao@email.com".to_string(),
        password: "123456".to_string(),
        address: "Rua das Flores, 123".to_string(),
        phone: "(11) 98765-4321".to_string(),
        tax_id: "123.456.789-00".to_string(),
        birthdate: "1990-01-01".to_string(),
    }]
}

fn sample_dogs() -> Vec<Dog> {
    vec![
        Dog {
            id: "1".to_string(),
            name: "Toby".to_string(),
            breed: "Golden Retriever".to_string(),
            life_stage: LifeStage::Puppy,
            sex: Sex::Male,
            age: "5 months".to_string(),
            color: "Spotted".to_string(),
            address: "São Paulo, SP".to_string(),
            description: "Playful puppy who loves long walks and meeting new people.".to_string(),
            image: "/images/adoption-banner.png".to_string(),
            house_trained: true,
            pet_friendly: true,
            owner_id: "1".to_string(),
        },
        Dog {
            id: "2".to_string(),
            name: "Luna".to_string(),
            breed: "Golden Retriever".to_string(),
            life_stage: LifeStage::Adult,
            sex: Sex::Female,
            age: "3 years".to_string(),
            color: "Golden".to_string(),
            address: "Rio de Janeiro, RJ".to_string(),
            description: "Very affectionate and loves to play. Perfect for families with children."
                .to_string(),
            image: "/images/main-banner-2.png".to_string(),
            house_trained: true,
            pet_friendly: true,
            owner_id: "1".to_string(),
        },
    ]
}
