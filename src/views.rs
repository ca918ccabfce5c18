//! Cached, self-refreshing views over the repository for front ends.
//!
//! A view starts out [`ViewState::Loading`]. `mount` bootstraps the store,
//! loads the view's data and flips it to [`ViewState::Ready`]. Every
//! mutation made through a view is followed by a full reload of the
//! collection it caches; there are no optimistic or incremental updates.
//! Changes made elsewhere reach a view through its change subscription and
//! are picked up by `sync`.
//!
//! Load failures are logged and leave the cache empty: an unreadable
//! collection looks the same as an empty one.

use chrono::NaiveDate;
use tracing::warn;

use crate::error::StoreResult;
use crate::events::{ChangeSubscription, Collection};
use crate::models::{Dog, DogPatch, Message, NewDog, NewMessage, NewUser, User, UserPatch, Visit};
use crate::repository::Repository;
use crate::storage::KvStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Ready,
}

fn bootstrap_quietly<S: KvStore>(repo: &Repository<S>) {
    if let Err(err) = repo.bootstrap() {
        warn!(error = %err, "bootstrap failed");
    }
}

fn or_empty<T>(result: StoreResult<Vec<T>>, what: &str) -> Vec<T> {
    result.unwrap_or_else(|err| {
        warn!(error = %err, view = what, "load failed; showing nothing");
        Vec::new()
    })
}

// --- Dogs ---

pub struct DogsView<'r, S: KvStore> {
    repo: &'r Repository<S>,
    changes: ChangeSubscription,
    dogs: Vec<Dog>,
    state: ViewState,
}

impl<'r, S: KvStore> DogsView<'r, S> {
    pub fn new(repo: &'r Repository<S>) -> Self {
        Self {
            repo,
            changes: repo.subscribe(),
            dogs: Vec::new(),
            state: ViewState::Loading,
        }
    }

    pub fn mount(repo: &'r Repository<S>) -> Self {
        let mut view = Self::new(repo);
        view.reload();
        view
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn dogs(&self) -> &[Dog] {
        &self.dogs
    }

    /// Bootstrap and re-read the whole dog collection.
    pub fn reload(&mut self) {
        bootstrap_quietly(self.repo);
        self.dogs = or_empty(self.repo.list_dogs(), "dogs");
        // Our own reload already reflects everything pending
        self.changes.drain();
        self.state = ViewState::Ready;
    }

    /// Replace the cached list with search results (everything when blank).
    pub fn search(&mut self, query: &str) {
        self.dogs = or_empty(self.repo.search_dogs(query), "dogs");
    }

    pub fn add_dog(&mut self, draft: NewDog) -> StoreResult<Dog> {
        let dog = self.repo.create_dog(draft)?;
        self.reload();
        Ok(dog)
    }

    pub fn edit_dog(&mut self, id: &str, patch: &DogPatch) -> StoreResult<Option<Dog>> {
        let updated = self.repo.update_dog(id, patch)?;
        if updated.is_some() {
            self.reload();
        }
        Ok(updated)
    }

    pub fn remove_dog(&mut self, id: &str) -> StoreResult<bool> {
        let removed = self.repo.delete_dog(id)?;
        if removed {
            self.reload();
        }
        Ok(removed)
    }

    /// Direct lookup; does not touch the cached list.
    pub fn get_dog(&self, id: &str) -> StoreResult<Option<Dog>> {
        self.repo.get_dog(id)
    }

    pub fn owned_by(&self, user_id: &str) -> Vec<Dog> {
        self.dogs
            .iter()
            .filter(|dog| dog.owner_id == user_id)
            .cloned()
            .collect()
    }

    /// Reload if some other consumer changed the dogs. Returns whether it did.
    pub fn sync(&mut self) -> bool {
        if self.changes.touched(&[Collection::Dogs]) {
            self.reload();
            return true;
        }
        false
    }
}

// --- Session ---

pub struct SessionView<'r, S: KvStore> {
    repo: &'r Repository<S>,
    changes: ChangeSubscription,
    user: Option<User>,
    state: ViewState,
}

impl<'r, S: KvStore> SessionView<'r, S> {
    pub fn new(repo: &'r Repository<S>) -> Self {
        Self {
            repo,
            changes: repo.subscribe(),
            user: None,
            state: ViewState::Loading,
        }
    }

    pub fn mount(repo: &'r Repository<S>) -> Self {
        let mut view = Self::new(repo);
        view.reload();
        view
    }

    pub fn reload(&mut self) {
        bootstrap_quietly(self.repo);
        self.user = self.repo.current_user().unwrap_or_else(|err| {
            warn!(error = %err, "session load failed; treating as logged out");
            None
        });
        self.changes.drain();
        self.state = ViewState::Ready;
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn login(&mut self, email: &str, password: &str) -> StoreResult<bool> {
        match self.repo.login(email, password)? {
            Some(user) => {
                self.user = Some(user);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn logout(&mut self) -> StoreResult<()> {
        self.repo.logout()?;
        self.user = None;
        Ok(())
    }

    pub fn register(&mut self, draft: NewUser) -> StoreResult<User> {
        let user = self.repo.register(draft)?;
        self.user = Some(user.clone());
        Ok(user)
    }

    /// Patch the logged-in user. `None` when nobody is logged in or the
    /// account no longer exists.
    pub fn update_profile(&mut self, patch: &UserPatch) -> StoreResult<Option<User>> {
        let Some(current) = &self.user else {
            return Ok(None);
        };
        let updated = self.repo.update_user(&current.id, patch)?;
        if let Some(user) = &updated {
            self.user = Some(user.clone());
        }
        Ok(updated)
    }

    pub fn sync(&mut self) -> bool {
        if self.changes.touched(&[Collection::Session, Collection::Users]) {
            self.reload();
            return true;
        }
        false
    }
}

// --- Chat ---

/// Message thread about one listing.
pub struct ChatView<'r, S: KvStore> {
    repo: &'r Repository<S>,
    changes: ChangeSubscription,
    dog_id: String,
    messages: Vec<Message>,
}

impl<'r, S: KvStore> ChatView<'r, S> {
    pub fn open(repo: &'r Repository<S>, dog_id: &str) -> Self {
        let mut view = Self {
            repo,
            changes: repo.subscribe(),
            dog_id: dog_id.to_string(),
            messages: Vec::new(),
        };
        view.reload();
        view
    }

    pub fn dog_id(&self) -> &str {
        &self.dog_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn reload(&mut self) {
        self.messages = or_empty(self.repo.list_messages_by_dog(&self.dog_id), "chat");
        self.changes.drain();
    }

    /// Send `text` as `sender`. Blank text or no sender sends nothing.
    pub fn send(&mut self, sender: Option<&User>, text: &str) -> StoreResult<Option<Message>> {
        let text = text.trim();
        let Some(sender) = sender else {
            return Ok(None);
        };
        if text.is_empty() {
            return Ok(None);
        }
        let message = self.repo.send_message(NewMessage {
            dog_id: self.dog_id.clone(),
            sender_id: sender.id.clone(),
            sender_name: sender.name.clone(),
            text: text.to_string(),
        })?;
        self.reload();
        Ok(Some(message))
    }

    pub fn sync(&mut self) -> bool {
        if self.changes.touched(&[Collection::Messages]) {
            self.reload();
            return true;
        }
        false
    }
}

// --- Visits ---

/// A visit together with the listing it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitEntry {
    pub visit: Visit,
    // None once the dog has been deleted
    pub dog: Option<Dog>,
    // True when the viewing user owns the dog (a visit they received)
    pub received: bool,
}

/// Visits a user requested or received, newest date first.
pub struct VisitsView<'r, S: KvStore> {
    repo: &'r Repository<S>,
    changes: ChangeSubscription,
    user_id: String,
    entries: Vec<VisitEntry>,
    state: ViewState,
}

impl<'r, S: KvStore> VisitsView<'r, S> {
    pub fn mount(repo: &'r Repository<S>, user_id: &str) -> Self {
        let mut view = Self {
            repo,
            changes: repo.subscribe(),
            user_id: user_id.to_string(),
            entries: Vec::new(),
            state: ViewState::Loading,
        };
        view.reload();
        view
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn entries(&self) -> &[VisitEntry] {
        &self.entries
    }

    pub fn reload(&mut self) {
        bootstrap_quietly(self.repo);
        let visits = or_empty(self.repo.list_visits_for_user(&self.user_id), "visits");
        let dogs = or_empty(self.repo.list_dogs(), "visits");
        self.entries = visits
            .into_iter()
            .map(|visit| {
                let dog = dogs.iter().find(|dog| dog.id == visit.dog_id).cloned();
                let received = dog.as_ref().is_some_and(|dog| dog.owner_id == self.user_id);
                VisitEntry { visit, dog, received }
            })
            .collect();
        self.changes.drain();
        self.state = ViewState::Ready;
    }

    /// Visits dated `today` or later.
    pub fn upcoming(&self, today: NaiveDate) -> Vec<&VisitEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.visit.date >= today)
            .collect()
    }

    pub fn past(&self, today: NaiveDate) -> Vec<&VisitEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.visit.date < today)
            .collect()
    }

    pub fn sync(&mut self) -> bool {
        if self.changes.touched(&[Collection::Visits, Collection::Dogs]) {
            self.reload();
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::NewVisit;
    use crate::repository::DEFAULT_NAMESPACE;
    use crate::storage::{DetachedStore, MemoryStore};

    fn repo() -> Repository<MemoryStore> {
        Repository::with_clock(MemoryStore::new(), DEFAULT_NAMESPACE, FixedClock::new(1_000))
    }

    fn draft(name: &str, owner: &str) -> NewDog {
        NewDog {
            name: name.to_string(),
            breed: "Mixed".to_string(),
            age: "1 year".to_string(),
            owner_id: owner.to_string(),
            ..NewDog::default()
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_dogs_view_mounts_with_seed_data() {
        let repo = repo();
        let view = DogsView::new(&repo);
        assert_eq!(view.state(), ViewState::Loading);
        assert!(view.dogs().is_empty());

        let view = DogsView::mount(&repo);
        assert_eq!(view.state(), ViewState::Ready);
        assert_eq!(view.dogs().len(), 2);
    }

    #[test]
    fn test_dogs_view_reloads_after_each_mutation() {
        let repo = repo();
        let mut view = DogsView::mount(&repo);

        let dog = view.add_dog(draft("Rex", "9")).unwrap();
        assert_eq!(view.dogs().len(), 3);

        let patch = DogPatch {
            name: Some("Rexy".to_string()),
            ..DogPatch::default()
        };
        view.edit_dog(&dog.id, &patch).unwrap();
        assert!(view.dogs().iter().any(|d| d.name == "Rexy"));
        assert_eq!(view.owned_by("9").len(), 1);

        assert!(view.remove_dog(&dog.id).unwrap());
        assert_eq!(view.dogs().len(), 2);
        assert!(!view.remove_dog(&dog.id).unwrap());
        assert_eq!(view.edit_dog(&dog.id, &patch).unwrap(), None);
    }

    #[test]
    fn test_dogs_view_search_narrows_and_blank_restores() {
        let repo = repo();
        let mut view = DogsView::mount(&repo);
        view.search("luna");
        assert_eq!(view.dogs().len(), 1);
        view.search("  ");
        assert_eq!(view.dogs().len(), 2);
    }

    #[test]
    fn test_dogs_view_syncs_changes_made_elsewhere() {
        let repo = repo();
        let mut view = DogsView::mount(&repo);
        assert!(!view.sync());

        repo.create_dog(draft("Pipoca", "1")).unwrap();
        assert_eq!(view.dogs().len(), 2);
        assert!(view.sync());
        assert_eq!(view.dogs().len(), 3);

        // Unrelated collections do not trigger a reload
        repo.send_message(NewMessage {
            dog_id: "1".to_string(),
            ..NewMessage::default()
        })
        .unwrap();
        assert!(!view.sync());
    }

    #[test]
    fn test_dogs_view_on_detached_store_is_ready_and_empty() {
        let repo = Repository::new(DetachedStore);
        let mut view = DogsView::mount(&repo);
        assert_eq!(view.state(), ViewState::Ready);
        assert!(view.dogs().is_empty());
        assert!(view.add_dog(draft("Rex", "1")).is_err());
    }

    #[test]
    fn test_session_view_login_logout_and_profile() {
        let repo = repo();
        let mut session = SessionView::mount(&repo);
        assert_eq!(session.user(), None);
        assert_eq!(session.update_profile(&UserPatch::default()).unwrap(), None);

        assert!(!session.login("joao@email.com", "wrong").unwrap());
        assert!(session.login("joao@email.com", "123456").unwrap());
        assert_eq!(session.user().map(|u| u.id.as_str()), Some("1"));

        let patch = UserPatch {
            phone: Some("(11) 90000-0000".to_string()),
            ..UserPatch::default()
        };
        let updated = session.update_profile(&patch).unwrap().unwrap();
        assert_eq!(updated.phone, "(11) 90000-0000");
        assert_eq!(repo.current_user().unwrap(), Some(updated));

        session.logout().unwrap();
        assert_eq!(session.user(), None);
    }

    #[test]
    fn test_session_view_register_and_sync_across_views() {
        let repo = repo();
        let mut first = SessionView::mount(&repo);
        let mut second = SessionView::mount(&repo);

        let user = first
            .register(NewUser {
                name: "Bia".to_string(),
                email: "bia@email.com".to_string(),
                password: "pw".to_string(),
                ..NewUser::default()
            })
            .unwrap();
        assert_eq!(first.user(), Some(&user));

        assert_eq!(second.user(), None);
        assert!(second.sync());
        assert_eq!(second.user(), Some(&user));
    }

    #[test]
    fn test_chat_view_trims_and_ignores_blank_or_anonymous() {
        let repo = repo();
        repo.bootstrap().unwrap();
        let joao = repo.get_user("1").unwrap().unwrap();
        let mut chat = ChatView::open(&repo, "2");

        assert_eq!(chat.send(None, "hello").unwrap(), None);
        assert_eq!(chat.send(Some(&joao), "   ").unwrap(), None);
        assert!(chat.messages().is_empty());

        let sent = chat.send(Some(&joao), "  Is Luna vaccinated?  ").unwrap().unwrap();
        assert_eq!(sent.text, "Is Luna vaccinated?");
        assert_eq!(sent.sender_name, "João Silva");
        assert_eq!(chat.messages(), &[sent]);
        assert_eq!(chat.dog_id(), "2");
    }

    #[test]
    fn test_chat_view_picks_up_messages_from_other_views() {
        let repo = repo();
        repo.bootstrap().unwrap();
        let joao = repo.get_user("1").unwrap().unwrap();
        let mut mine = ChatView::open(&repo, "1");
        let mut theirs = ChatView::open(&repo, "1");

        mine.send(Some(&joao), "first").unwrap();
        assert!(theirs.sync());
        assert_eq!(theirs.messages().len(), 1);
    }

    #[test]
    fn test_visits_view_enriches_and_splits_by_date() {
        let repo = repo();
        repo.bootstrap().unwrap();
        let orphan_target = repo.create_dog(draft("Gone", "other")).unwrap();

        let book = |dog_id: &str, user_id: &str, date: NaiveDate| {
            repo.create_visit(NewVisit {
                dog_id: dog_id.to_string(),
                name: "Visitor".to_string(),
                email: "v@email.com".to_string(),
                phone: String::new(),
                tax_id: String::new(),
                date,
                notes: String::new(),
                user_id: user_id.to_string(),
            })
            .unwrap()
        };
        // João owns dogs 1 and 2
        book("1", "guest", ymd(2026, 6, 1));
        book(&orphan_target.id, "1", ymd(2026, 1, 5));
        book("2", "guest", ymd(2025, 12, 24));
        repo.delete_dog(&orphan_target.id).unwrap();

        let view = VisitsView::mount(&repo, "1");
        assert_eq!(view.state(), ViewState::Ready);
        let entries = view.entries();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].received);
        assert_eq!(entries[0].dog.as_ref().map(|d| d.name.as_str()), Some("Toby"));
        assert!(!entries[1].received);
        assert_eq!(entries[1].dog, None);

        let today = ymd(2026, 1, 5);
        assert_eq!(view.upcoming(today).len(), 2);
        assert_eq!(view.past(today).len(), 1);
    }

    #[test]
    fn test_visits_view_syncs_on_new_booking() {
        let repo = repo();
        repo.bootstrap().unwrap();
        let mut view = VisitsView::mount(&repo, "guest");
        assert!(view.entries().is_empty());

        repo.create_visit(NewVisit {
            dog_id: "1".to_string(),
            name: "Visitor".to_string(),
            email: "v@email.com".to_string(),
            phone: String::new(),
            tax_id: String::new(),
            date: ymd(2026, 2, 2),
            notes: String::new(),
            user_id: "guest".to_string(),
        })
        .unwrap();
        assert!(view.sync());
        assert_eq!(view.entries().len(), 1);
    }
}
