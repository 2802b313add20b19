use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::api::links::validate_join_link;
use crate::error::{ClientError, Result};

pub const ALL_TOPICS: &str = "All Topics";
pub const ALL_AGES: &str = "All Ages";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizerRef {
    pub username: String,
}

/// An activity as listed by the catalog endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub topic: String,
    pub age_group: String,
    pub date: NaiveDate,
    pub time: String,
    pub join_link: String,
    #[serde(default)]
    pub organizer: Option<OrganizerRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewActivity {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub topic: String,
    pub age_group: String,
    pub date: NaiveDate,
    pub time: String,
    pub join_link: String,
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClientError::ValidationError(format!(
            "Missing required field: {}",
            field
        )));
    }
    Ok(())
}

impl NewActivity {
    pub fn validate(&self) -> Result<()> {
        require("title", &self.title)?;
        require("topic", &self.topic)?;
        require("age_group", &self.age_group)?;
        require("time", &self.time)?;
        require("join_link", &self.join_link)?;
        validate_join_link(&self.join_link)?;
        Ok(())
    }
}

/// Partial update; only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_link: Option<String>,
}

impl ActivityUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(ClientError::ValidationError("Nothing to update".into()));
        }

        let required = [
            ("title", &self.title),
            ("topic", &self.topic),
            ("age_group", &self.age_group),
            ("time", &self.time),
            ("join_link", &self.join_link),
        ];
        for (field, value) in required {
            if let Some(value) = value {
                require(field, value)?;
            }
        }

        if let Some(link) = &self.join_link {
            validate_join_link(link)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedActivity {
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizerProfile {
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub specialties: Vec<String>,
    #[serde(alias = "joinedDate")]
    pub joined_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    pub fn matches(&self, time: &str) -> bool {
        let Some(hour) = hour_of_day(time) else {
            return false;
        };
        match self {
            TimeOfDay::Morning => hour < 12,
            TimeOfDay::Afternoon => (12..17).contains(&hour),
            TimeOfDay::Evening => hour >= 17,
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(TimeOfDay::Morning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "evening" => Ok(TimeOfDay::Evening),
            other => Err(ClientError::ValidationError(format!(
                "Unknown time of day: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Evening => "Evening",
        };
        f.write_str(name)
    }
}

/// 24-hour clock hour of a display time such as `"10:00 AM"` or `"14:30"`.
fn hour_of_day(time: &str) -> Option<u32> {
    let hour: u32 = time.split(':').next()?.trim().parse().ok()?;
    let upper = time.to_ascii_uppercase();
    let (am, pm) = (upper.contains("AM"), upper.contains("PM"));
    if am || pm {
        if !(1..=12).contains(&hour) {
            return None;
        }
        Some(match (pm, hour) {
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, 12) => 0,
            (false, h) => h,
        })
    } else {
        (hour < 24).then_some(hour)
    }
}

/// Catalog filter. Topic and age group are applied by the server, time of day
/// locally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityFilter {
    pub topic: Option<String>,
    pub age_group: Option<String>,
    pub time_of_day: Option<TimeOfDay>,
}

fn selection(value: &str, everything: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty() && value != everything).then(|| value.to_string())
}

impl ActivityFilter {
    pub fn topic(mut self, topic: &str) -> Self {
        self.topic = selection(topic, ALL_TOPICS);
        self
    }

    pub fn age_group(mut self, age_group: &str) -> Self {
        self.age_group = selection(age_group, ALL_AGES);
        self
    }

    pub fn time_of_day(mut self, time_of_day: TimeOfDay) -> Self {
        self.time_of_day = Some(time_of_day);
        self
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        if let Some(topic) = &self.topic {
            pairs.push(("topic", topic.as_str()));
        }
        if let Some(age_group) = &self.age_group {
            pairs.push(("age_group", age_group.as_str()));
        }
        pairs
    }

    pub fn matches(&self, activity: &Activity) -> bool {
        let topic = self.topic.as_ref().map_or(true, |t| *t == activity.topic);
        let age = self
            .age_group
            .as_ref()
            .map_or(true, |a| *a == activity.age_group);
        let time = self
            .time_of_day
            .map_or(true, |slot| slot.matches(&activity.time));
        topic && age && time
    }
}
