use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnimalKind {
    Sow,
    Boar,
    Piglet,
}

impl AnimalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnimalKind::Sow => "sow",
            AnimalKind::Boar => "boar",
            AnimalKind::Piglet => "piglet",
        }
    }

    pub fn default_status(self) -> AnimalStatus {
        match self {
            AnimalKind::Sow => AnimalStatus::Open,
            AnimalKind::Boar => AnimalStatus::Active,
            AnimalKind::Piglet => AnimalStatus::Nursing,
        }
    }
}

impl std::str::FromStr for AnimalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sow" | "sows" => Ok(AnimalKind::Sow),
            "boar" | "boars" => Ok(AnimalKind::Boar),
            "piglet" | "piglets" => Ok(AnimalKind::Piglet),
            other => Err(format!("unknown animal kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnimalStatus {
    Active,
    Open,
    Bred,
    Pregnant,
    Lactating,
    Nursing,
    Weaned,
    Growing,
    Retired,
    Culled,
    Sold,
    Deceased,
}

impl AnimalStatus {
    /// Animals in a terminal status are kept for history but can't be bred, housed or treated.
    pub fn is_terminal(self) -> bool {
        matches!(self, AnimalStatus::Culled | AnimalStatus::Sold | AnimalStatus::Deceased)
    }

    pub fn allowed_for(self, kind: AnimalKind) -> bool {
        use AnimalStatus::*;
        if self.is_terminal() {
            return true;
        }
        match kind {
            AnimalKind::Sow => matches!(self, Open | Bred | Pregnant | Lactating | Retired),
            AnimalKind::Boar => matches!(self, Active | Retired),
            AnimalKind::Piglet => matches!(self, Nursing | Weaned | Growing),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Female,
    Male,
    Barrow,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Animal {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub kind: AnimalKind,
    pub ear_tag: String,
    pub name: Option<String>,
    pub breed: Option<String>,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
    pub status: AnimalStatus,
    pub dam_id: Option<Uuid>,
    pub sire_id: Option<Uuid>,
    pub farrowing_id: Option<Uuid>,
    pub weight_kg: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Animal {
    /// Human label used in reminders and exports, e.g. `Sow #A-102 (Daisy)`.
    pub fn label(&self) -> String {
        let kind = match self.kind {
            AnimalKind::Sow => "Sow",
            AnimalKind::Boar => "Boar",
            AnimalKind::Piglet => "Piglet",
        };
        match &self.name {
            Some(name) if !name.trim().is_empty() => format!("{} #{} ({})", kind, self.ear_tag, name),
            _ => format!("{} #{}", kind, self.ear_tag),
        }
    }
}

/// Body of `POST /animals`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAnimal {
    pub kind: AnimalKind,
    pub ear_tag: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<AnimalStatus>,
    #[serde(default)]
    pub dam_id: Option<Uuid>,
    #[serde(default)]
    pub sire_id: Option<Uuid>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of `PATCH /animals/:id`; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnimalUpdate {
    pub ear_tag: Option<String>,
    pub name: Option<String>,
    pub breed: Option<String>,
    pub sex: Option<Sex>,
    pub birth_date: Option<NaiveDate>,
    pub status: Option<AnimalStatus>,
    pub weight_kg: Option<f64>,
    pub notes: Option<String>,
}

impl AnimalUpdate {
    pub fn apply(self, animal: &mut Animal) {
        if let Some(ear_tag) = self.ear_tag {
            animal.ear_tag = ear_tag.trim().to_string();
        }
        if self.name.is_some() {
            animal.name = self.name;
        }
        if self.breed.is_some() {
            animal.breed = self.breed;
        }
        if self.sex.is_some() {
            animal.sex = self.sex;
        }
        if self.birth_date.is_some() {
            animal.birth_date = self.birth_date;
        }
        if let Some(status) = self.status {
            animal.status = status;
        }
        if self.weight_kg.is_some() {
            animal.weight_kg = self.weight_kg;
        }
        if self.notes.is_some() {
            animal.notes = self.notes;
        }
    }
}
