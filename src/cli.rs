//! Command-line interface definitions using clap

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::api::models::{
    Activity, ActivityFilter, ActivityUpdate, NewActivity, OrganizerProfile, ProfileUpdate,
    TimeOfDay,
};
use crate::error::Result;
use crate::ClientState;

/// BrightTimes - online activities for kids
#[derive(Parser, Debug)]
#[command(name = "brighttimes")]
#[command(version)]
#[command(about = "Browse and manage BrightTimes activities", long_about = None)]
pub struct Cli {
    /// Override the backend base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List upcoming activities
    Activities {
        #[arg(long)]
        topic: Option<String>,

        #[arg(long)]
        age_group: Option<String>,

        /// morning, afternoon or evening
        #[arg(long)]
        time: Option<TimeOfDay>,
    },

    /// List known topics
    Topics,

    /// List known age groups
    AgeGroups,

    /// Show one activity
    Show { id: i64 },

    /// Log in as an organizer
    Login {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,
    },

    /// Sign out and forget stored tokens
    Logout,

    /// Show who is logged in
    Whoami,

    /// List your own activities
    Mine,

    /// Create an activity
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        topic: String,

        #[arg(long)]
        age_group: String,

        /// YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,

        /// e.g. "10:00 AM"
        #[arg(long)]
        time: String,

        /// Zoom or Google Meet link
        #[arg(long)]
        join_link: String,
    },

    /// Change fields of an activity
    Edit {
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        topic: Option<String>,

        #[arg(long)]
        age_group: Option<String>,

        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        time: Option<String>,

        #[arg(long)]
        join_link: Option<String>,
    },

    /// Delete an activity
    Delete { id: i64 },

    /// Show your organizer profile
    Profile,

    /// Update your organizer profile
    UpdateProfile {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        bio: Option<String>,

        #[arg(long)]
        avatar: Option<String>,
    },
}

fn print_activity(activity: &Activity) {
    println!(
        "#{} {} [{} | {}] {} {} -> {}",
        activity.id,
        activity.title,
        activity.topic,
        activity.age_group,
        activity.date.format("%A, %B %-d, %Y"),
        activity.time,
        activity.join_link
    );
    if let Some(organizer) = &activity.organizer {
        println!("    by {}", organizer.username);
    }
    if let Some(description) = &activity.description {
        println!("    {}", description);
    }
}

fn print_activities(activities: &[Activity]) {
    if activities.is_empty() {
        println!("No activities found.");
    }
    for activity in activities {
        print_activity(activity);
    }
}

fn print_profile(profile: &OrganizerProfile) {
    println!("{}", profile.username);
    let fields = [
        ("Name", &profile.name),
        ("Email", &profile.email),
        ("Phone", &profile.phone),
        ("Location", &profile.location),
        ("Bio", &profile.bio),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {}: {}", label, value);
        }
    }
    if !profile.specialties.is_empty() {
        println!("  Specialties: {}", profile.specialties.join(", "));
    }
}

impl Commands {
    pub async fn execute(self, state: &ClientState) -> Result<()> {
        match self {
            Commands::Activities {
                topic,
                age_group,
                time,
            } => {
                let mut filter = ActivityFilter::default();
                if let Some(topic) = topic {
                    filter = filter.topic(&topic);
                }
                if let Some(age_group) = age_group {
                    filter = filter.age_group(&age_group);
                }
                if let Some(time) = time {
                    filter = filter.time_of_day(time);
                }
                print_activities(&state.catalog().list(&filter).await?);
            }
            Commands::Topics => {
                for topic in state.catalog().topics().await? {
                    println!("{}", topic);
                }
            }
            Commands::AgeGroups => {
                for age_group in state.catalog().age_groups().await? {
                    println!("{}", age_group);
                }
            }
            Commands::Show { id } => print_activity(&state.catalog().get(id).await?),
            Commands::Login { username, password } => {
                let credentials = state.auth()?.login(&username, &password).await?;
                println!("Welcome, {}!", credentials.username);
            }
            Commands::Logout => {
                state.auth()?.logout().await?;
                println!("Signed out.");
            }
            Commands::Whoami => match state.auth()?.current_user().await? {
                Some(username) => println!("{}", username),
                None => println!("Not logged in."),
            },
            Commands::Mine => print_activities(&state.organizer().my_activities().await?),
            Commands::Add {
                title,
                description,
                topic,
                age_group,
                date,
                time,
                join_link,
            } => {
                let activity = NewActivity {
                    title,
                    description,
                    topic,
                    age_group,
                    date,
                    time,
                    join_link,
                };
                let created = state.organizer().create_activity(&activity).await?;
                println!("{} (id {})", created.message, created.id);
            }
            Commands::Edit {
                id,
                title,
                description,
                topic,
                age_group,
                date,
                time,
                join_link,
            } => {
                let update = ActivityUpdate {
                    title,
                    description,
                    topic,
                    age_group,
                    date,
                    time,
                    join_link,
                };
                let response = state.organizer().update_activity(id, &update).await?;
                println!("{}", response.message);
            }
            Commands::Delete { id } => {
                state.organizer().delete_activity(id).await?;
                println!("Activity {} deleted.", id);
            }
            Commands::Profile => print_profile(&state.organizer().profile().await?),
            Commands::UpdateProfile {
                name,
                email,
                phone,
                location,
                bio,
                avatar,
            } => {
                let update = ProfileUpdate {
                    name,
                    email,
                    phone,
                    location,
                    bio,
                    avatar,
                };
                let response = state.organizer().update_profile(&update).await?;
                println!("{}", response.message);
            }
        }
        Ok(())
    }
}
