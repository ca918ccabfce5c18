use std::path::PathBuf;

use adotadog::clock::SystemClock;
use adotadog::config::AppConfig;
use adotadog::forms::{
    authorize_owner, location_patch, DogForm, LoginForm, ProfileForm, RegistrationForm, VisitForm,
};
use adotadog::models::{Dog, LifeStage, Sex, User};
use adotadog::views::{ChatView, DogsView, SessionView, VisitsView};
use adotadog::{telemetry, AppError, KvStore, Repository, SledStore};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "adotadog-cli")]
#[command(about = "Local dog adoption marketplace", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Sled data directory (overrides ADOTADOG_DATA_DIR)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in as it
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        tax_id: String,
        #[arg(long, default_value = "")]
        birthdate: String,
    },
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    Logout,
    Whoami,
    /// Edit account details of the logged-in user
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        tax_id: Option<String>,
        #[arg(long)]
        birthdate: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Change the address used as the default search region
    Location { address: String },
    /// List every dog
    Dogs,
    /// Search by name, breed or address
    Search {
        #[arg(default_value = "")]
        query: String,
    },
    Show { id: String },
    AddDog {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        breed: String,
        #[arg(long, default_value = "puppy")]
        stage: LifeStage,
        #[arg(long, default_value = "male")]
        sex: Sex,
        #[arg(short, long)]
        age: String,
        #[arg(long, default_value = "")]
        color: String,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "/images/main-banner.png")]
        image: String,
        #[arg(long)]
        house_trained: bool,
        #[arg(long)]
        pet_friendly: bool,
    },
    EditDog {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        breed: Option<String>,
        #[arg(long)]
        stage: Option<LifeStage>,
        #[arg(long)]
        sex: Option<Sex>,
        #[arg(long)]
        age: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        house_trained: Option<bool>,
        #[arg(long)]
        pet_friendly: Option<bool>,
    },
    RemoveDog { id: String },
    /// Dogs listed by the logged-in user
    MyDogs,
    /// Book a visit; contact fields default to the logged-in user's
    Schedule {
        dog_id: String,
        /// YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        tax_id: Option<String>,
    },
    /// Visits requested by or received by the logged-in user
    Visits,
    /// Show the message thread for a dog
    Chat { dog_id: String },
    Send { dog_id: String, text: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let _guard = telemetry::init(&config.log);

    let store = SledStore::open(&config.data_dir)?;
    let repo =
        Repository::with_clock(store, config.namespace.clone(), SystemClock).with_seeding(config.seed);

    if let Err(err) = run(&repo, cli.command) {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
    Ok(())
}

fn run<S: KvStore>(repo: &Repository<S>, command: Commands) -> Result<(), AppError> {
    let mut session = SessionView::mount(repo);

    match command {
        Commands::Register {
            name,
            email,
            password,
            address,
            phone,
            tax_id,
            birthdate,
        } => {
            let draft = RegistrationForm {
                name,
                email,
                password,
                address,
                phone,
                tax_id,
                birthdate,
            }
            .validate()?;
            let user = session.register(draft)?;
            println!("✅ Account created, logged in as {} (id {})", user.name, user.id);
        }
        Commands::Login { email, password } => {
            LoginForm {
                email: email.clone(),
                password: password.clone(),
            }
            .validate()?;
            if !session.login(&email, &password)? {
                return Err(AppError::InvalidCredentials);
            }
            if let Some(user) = session.user() {
                println!("✅ Logged in as {}", user.name);
            }
        }
        Commands::Logout => {
            session.logout()?;
            println!("Logged out.");
        }
        Commands::Whoami => match session.user() {
            Some(user) => print_user(user),
            None => println!("Not logged in."),
        },
        Commands::Profile {
            name,
            email,
            phone,
            tax_id,
            birthdate,
            password,
        } => {
            let patch = ProfileForm {
                name,
                email,
                phone,
                tax_id,
                birthdate,
                password,
            }
            .validate()?;
            let user = session.update_profile(&patch)?.ok_or(AppError::NotLoggedIn)?;
            println!("✅ Profile updated");
            print_user(&user);
        }
        Commands::Location { address } => {
            let patch = location_patch(&address)?;
            let user = session.update_profile(&patch)?.ok_or(AppError::NotLoggedIn)?;
            println!("✅ Search region set to {}", user.address);
        }
        Commands::Dogs => {
            let dogs = DogsView::mount(repo);
            print_dogs(dogs.dogs());
        }
        Commands::Search { query } => {
            let mut dogs = DogsView::mount(repo);
            dogs.search(&query);
            print_dogs(dogs.dogs());
        }
        Commands::Show { id } => {
            let dogs = DogsView::mount(repo);
            let dog = dogs.get_dog(&id)?.ok_or(AppError::NotFound { what: "dog", id })?;
            let owner = repo.get_user(&dog.owner_id)?;
            print_dog_details(&dog, owner.as_ref());
        }
        Commands::AddDog {
            name,
            breed,
            stage,
            sex,
            age,
            color,
            address,
            description,
            image,
            house_trained,
            pet_friendly,
        } => {
            let draft = DogForm {
                name,
                breed,
                life_stage: stage,
                sex,
                age,
                color,
                address,
                description,
                image,
                house_trained,
                pet_friendly,
            }
            .into_new_dog(session.user())?;
            let mut dogs = DogsView::mount(repo);
            let dog = dogs.add_dog(draft)?;
            println!("✅ Listed {} (id {})", dog.name, dog.id);
        }
        Commands::EditDog {
            id,
            name,
            breed,
            stage,
            sex,
            age,
            color,
            address,
            description,
            image,
            house_trained,
            pet_friendly,
        } => {
            let mut dogs = DogsView::mount(repo);
            let dog = dogs
                .get_dog(&id)?
                .ok_or_else(|| AppError::NotFound { what: "dog", id: id.clone() })?;
            authorize_owner(&dog, session.user())?;

            // The edit form starts from the stored listing; flags replace fields
            let mut form = DogForm::from(&dog);
            if let Some(v) = name {
                form.name = v;
            }
            if let Some(v) = breed {
                form.breed = v;
            }
            if let Some(v) = stage {
                form.life_stage = v;
            }
            if let Some(v) = sex {
                form.sex = v;
            }
            if let Some(v) = age {
                form.age = v;
            }
            if let Some(v) = color {
                form.color = v;
            }
            if let Some(v) = address {
                form.address = v;
            }
            if let Some(v) = description {
                form.description = v;
            }
            if let Some(v) = image {
                form.image = v;
            }
            if let Some(v) = house_trained {
                form.house_trained = v;
            }
            if let Some(v) = pet_friendly {
                form.pet_friendly = v;
            }
            let patch = form.into_patch()?;
            let updated = dogs
                .edit_dog(&id, &patch)?
                .ok_or(AppError::NotFound { what: "dog", id })?;
            println!("✅ Updated {}", updated.name);
        }
        Commands::RemoveDog { id } => {
            let mut dogs = DogsView::mount(repo);
            let dog = dogs
                .get_dog(&id)?
                .ok_or_else(|| AppError::NotFound { what: "dog", id: id.clone() })?;
            authorize_owner(&dog, session.user())?;
            if dogs.remove_dog(&id)? {
                println!("🗑️  Removed {}", dog.name);
            }
        }
        Commands::MyDogs => {
            let user = session.user().ok_or(AppError::NotLoggedIn)?;
            let dogs = DogsView::mount(repo);
            print_dogs(&dogs.owned_by(&user.id));
        }
        Commands::Schedule {
            dog_id,
            date,
            notes,
            name,
            email,
            phone,
            tax_id,
        } => {
            let user = session.user().ok_or(AppError::NotLoggedIn)?;
            let dog = repo
                .get_dog(&dog_id)?
                .ok_or_else(|| AppError::NotFound { what: "dog", id: dog_id.clone() })?;

            let mut form = VisitForm::prefilled(user);
            if let Some(v) = name {
                form.name = v;
            }
            if let Some(v) = email {
                form.email = v;
            }
            if let Some(v) = phone {
                form.phone = v;
            }
            if let Some(v) = tax_id {
                form.tax_id = v;
            }
            form.date = date;
            form.notes = notes;

            let draft = form.into_new_visit(&dog.id, Some(user))?;
            let visit = repo.create_visit(draft)?;
            println!("✅ Visit to meet {} booked for {}", dog.name, visit.date);
        }
        Commands::Visits => {
            let user = session.user().ok_or(AppError::NotLoggedIn)?;
            let visits = VisitsView::mount(repo, &user.id);
            let today = repo.clock().today();

            let upcoming = visits.upcoming(today);
            let past = visits.past(today);
            if upcoming.is_empty() && past.is_empty() {
                println!("No visits yet.");
            }
            for (title, entries) in [("Upcoming", upcoming), ("Past", past)] {
                if entries.is_empty() {
                    continue;
                }
                println!("{title}:");
                for entry in entries {
                    let dog_name = entry.dog.as_ref().map_or("(removed listing)", |d| d.name.as_str());
                    let direction = if entry.received { "received" } else { "requested" };
                    println!(
                        "  {}  {:<18} {:<10} {} <{}> {}",
                        entry.visit.date,
                        dog_name,
                        direction,
                        entry.visit.name,
                        entry.visit.email,
                        entry.visit.notes
                    );
                }
            }
        }
        Commands::Chat { dog_id } => {
            let chat = ChatView::open(repo, &dog_id);
            if chat.messages().is_empty() {
                println!("No messages about this dog yet.");
            }
            for message in chat.messages() {
                let when = DateTime::<Utc>::from_timestamp_millis(message.timestamp)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!("[{when}] {}: {}", message.sender_name, message.text);
            }
        }
        Commands::Send { dog_id, text } => {
            let user = session.user().ok_or(AppError::NotLoggedIn)?;
            let mut chat = ChatView::open(repo, &dog_id);
            match chat.send(Some(user), &text)? {
                Some(message) => println!(
                    "📨 Sent to thread {} ({} messages)",
                    message.dog_id,
                    chat.messages().len()
                ),
                None => println!("Nothing to send."),
            }
        }
    }

    Ok(())
}

fn print_user(user: &User) {
    println!("{} <{}> (id {})", user.name, user.email, user.id);
    println!("  address:   {}", user.address);
    println!("  phone:     {}", user.phone);
    println!("  tax id:    {}", user.tax_id);
    println!("  birthdate: {}", user.birthdate);
}

fn print_dogs(dogs: &[Dog]) {
    if dogs.is_empty() {
        println!("No dogs found.");
        return;
    }
    for dog in dogs {
        println!(
            "{:>14}  {:<12} {:<20} {:<7} {:<6} {}",
            dog.id, dog.name, dog.breed, dog.life_stage, dog.sex, dog.address
        );
    }
}

fn print_dog_details(dog: &Dog, owner: Option<&User>) {
    println!("{} (id {})", dog.name, dog.id);
    println!("  breed:         {}", dog.breed);
    println!("  stage / sex:   {} / {}", dog.life_stage, dog.sex);
    println!("  age:           {}", dog.age);
    println!("  color:         {}", dog.color);
    println!("  location:      {}", dog.address);
    println!("  house trained: {}", if dog.house_trained { "yes" } else { "no" });
    println!("  pet friendly:  {}", if dog.pet_friendly { "yes" } else { "no" });
    println!("  image:         {}", dog.image);
    match owner {
        Some(owner) => println!("  donor:         {} <{}>", owner.name, owner.email),
        None => println!("  donor:         (unknown user {})", dog.owner_id),
    }
    if !dog.description.is_empty() {
        println!();
        println!("{}", dog.description);
    }
}
