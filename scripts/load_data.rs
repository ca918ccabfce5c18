//! Load demo data into the local adotadog store.
//!
//! Seeds the sample user and dogs, then adds a second user, a few visits
//! in both directions and a short chat thread so every CLI screen has
//! something to show.
//! Run: cargo run --bin load_data

use adotadog::clock::SystemClock;
use adotadog::config::AppConfig;
use adotadog::models::{LifeStage, NewDog, NewMessage, NewUser, NewVisit, Sex, User};
use adotadog::{telemetry, Repository, SledStore};
use chrono::{Days, NaiveDate};
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let _guard = telemetry::init(&config.log);

    let store = SledStore::open(&config.data_dir)?;
    let repo = Repository::with_clock(store, config.namespace.clone(), SystemClock);
    repo.bootstrap()?;

    let joao = repo
        .get_user("1")?
        .ok_or("sample user missing after bootstrap")?;

    let maria = match repo.find_user_by_email("maria@email.com")? {
        Some(user) => user,
        None => repo.create_user(NewUser {
            name: "Maria Souza".to_string(),
            email: "maria@email.com".to_string(),
            password: "123456".to_string(),
            address: "Olinda, PE".to_string(),
            phone: "(81) 98888-7777".to_string(),
            tax_id: "987.654.321-00".to_string(),
            birthdate: "1992-03-14".to_string(),
        })?,
    };

    let pipoca = match repo
        .list_dogs_by_owner(&maria.id)?
        .into_iter()
        .find(|dog| dog.name == "Pipoca")
    {
        Some(dog) => dog,
        None => repo.create_dog(NewDog {
            name: "Pipoca".to_string(),
            breed: "Vira-lata".to_string(),
            life_stage: LifeStage::Adult,
            sex: Sex::Female,
            age: "3 anos".to_string(),
            color: "Caramelo".to_string(),
            address: maria.address.clone(),
            description: "Calm, loves long walks and sleeping in the sun.".to_string(),
            image: "/images/main-banner.png".to_string(),
            house_trained: true,
            pet_friendly: true,
            owner_id: maria.id.clone(),
        })?,
    };

    // Only add visits and messages on the first load
    if repo.list_visits()?.is_empty() {
        let today = repo.clock().today();
        let past = today.checked_sub_days(Days::new(10)).unwrap_or(today);
        let soon = today.checked_add_days(Days::new(7)).unwrap_or(today);

        book(&repo, "1", &maria, soon, "Weekend afternoon works best")?;
        book(&repo, &pipoca.id, &joao, past, "")?;
        book(&repo, "2", &maria, past, "Second visit")?;

        for (sender, text) in [
            (&maria, "Hi! Is Toby still available?"),
            (&joao, "He is! Want to come meet him?"),
            (&maria, "Yes, I booked a visit for next week."),
        ] {
            repo.send_message(NewMessage {
                dog_id: "1".to_string(),
                sender_id: sender.id.clone(),
                sender_name: sender.name.clone(),
                text: text.to_string(),
            })?;
        }
    }

    info!("demo data loaded");
    println!("✅ Demo data loaded into {}", config.data_dir.display());
    println!("  users:    {}", repo.list_users()?.len());
    println!("  dogs:     {}", repo.list_dogs()?.len());
    println!("  visits:   {}", repo.list_visits()?.len());
    println!("  messages: {}", repo.list_messages()?.len());
    println!("Log in with joao@email.com / 123456 or maria@email.com / 123456");

    Ok(())
}

fn book(
    repo: &Repository<SledStore>,
    dog_id: &str,
    requester: &User,
    date: NaiveDate,
    notes: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    repo.create_visit(NewVisit {
        dog_id: dog_id.to_string(),
        name: requester.name.clone(),
        email: requester.email.clone(),
        phone: requester.phone.clone(),
        tax_id: requester.tax_id.clone(),
        date,
        notes: notes.to_string(),
        user_id: requester.id.clone(),
    })?;
    Ok(())
}
