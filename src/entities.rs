use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::list::query::{MONTH, ROLE, SEARCH, STATUS};

/// A record managed through one of the admin tables
pub trait Entity: DeserializeOwned + Send + Sync + 'static {
    /// Path segment of the collection, relative to the API base
    const ENDPOINT: &'static str;
    /// Key of the items array inside the list envelope
    const ITEMS_KEY: &'static str;
    /// Filter keys the backend accepts for this collection
    const FILTERS: &'static [&'static str];
    /// Column headings, matching `row`
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> i64;
    fn row(&self) -> Vec<String>;
}

#[derive(AsRefStr, EnumIter, EnumString, Debug, Display, PartialEq, Eq, Copy, Clone)]
#[strum(serialize_all = "kebab-case")]
pub enum EntityKind {
    Users,
    Branches,
    HodLeaves,
    Batches,
}

impl EntityKind {
    pub fn filters(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Users => User::FILTERS,
            EntityKind::Branches => Branch::FILTERS,
            EntityKind::HodLeaves => HodLeave::FILTERS,
            EntityKind::Batches => Batch::FILTERS,
        }
    }

    pub fn long_name(&self) -> &'static str {
        match self {
            EntityKind::Users => "Users",
            EntityKind::Branches => "Branches",
            EntityKind::HodLeaves => "HOD Leaves",
            EntityKind::Batches => "Batches",
        }
    }
}

#[derive(AsRefStr, EnumString, Debug, Display, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Admin,
    Hod,
    Faculty,
    FeesManager,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Role,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

impl Entity for User {
    const ENDPOINT: &'static str = "users";
    const ITEMS_KEY: &'static str = "users";
    const FILTERS: &'static [&'static str] = &[ROLE, SEARCH];
    const COLUMNS: &'static [&'static str] = &["ID", "Username", "Name", "Email", "Role", "Active"];

    fn id(&self) -> i64 {
        self.id
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.username.clone(),
            self.full_name(),
            self.email.clone(),
            self.role.to_string(),
            if self.is_active { "yes" } else { "no" }.to_owned(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub hod_name: Option<String>,
}

impl Entity for Branch {
    const ENDPOINT: &'static str = "branches";
    const ITEMS_KEY: &'static str = "branches";
    const FILTERS: &'static [&'static str] = &[SEARCH];
    const COLUMNS: &'static [&'static str] = &["ID", "Code", "Name", "HOD"];

    fn id(&self) -> i64 {
        self.id
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.code.clone(),
            self.name.clone(),
            self.hod_name.clone().unwrap_or_else(|| "-".to_owned()),
        ]
    }
}

#[derive(AsRefStr, EnumString, Debug, Display, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HodLeave {
    pub id: i64,
    pub hod_name: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub reason: String,
    pub status: LeaveStatus,
}

impl HodLeave {
    /// Inclusive length of the leave in days
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

impl Entity for HodLeave {
    const ENDPOINT: &'static str = "hod-leaves";
    const ITEMS_KEY: &'static str = "leaves";
    const FILTERS: &'static [&'static str] = &[STATUS, MONTH, SEARCH];
    const COLUMNS: &'static [&'static str] = &["ID", "HOD", "Branch", "From", "To", "Days", "Status"];

    fn id(&self) -> i64 {
        self.id
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.hod_name.clone(),
            self.branch.clone().unwrap_or_else(|| "-".to_owned()),
            self.start_date.to_string(),
            self.end_date.to_string(),
            self.days().to_string(),
            self.status.to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: i64,
    pub name: String,
    pub start_year: i32,
    pub end_year: i32,
    #[serde(default)]
    pub branch: Option<String>,
}

impl Entity for Batch {
    const ENDPOINT: &'static str = "batches";
    const ITEMS_KEY: &'static str = "batches";
    const FILTERS: &'static [&'static str] = &[SEARCH];
    const COLUMNS: &'static [&'static str] = &["ID", "Name", "Years", "Branch"];

    fn id(&self) -> i64 {
        self.id
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            format!("{}-{}", self.start_year, self.end_year),
            self.branch.clone().unwrap_or_else(|| "-".to_owned()),
        ]
    }
}

fn default_true() -> bool {
    true
}
