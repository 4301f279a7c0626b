use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Structured submission describing the applicant's circumstances.
///
/// Each domain lives in its own optional section; the classifier inspects
/// which sections are populated. An intake is never edited in place, a new
/// submission replaces the vaulted copy wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intake {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent1: Option<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent2: Option<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baby: Option<Baby>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant: Option<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment: Option<Employment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banking: Option<Banking>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disaster: Option<Disaster>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub housing: Option<Housing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carer: Option<CarerDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default = "default_language")]
    pub preferred_language: String,
    #[serde(default)]
    pub accessibility: Vec<String>,
}

impl Default for Intake {
    fn default() -> Self {
        Self {
            parent1: None,
            parent2: None,
            baby: None,
            applicant: None,
            employment: None,
            banking: None,
            disaster: None,
            housing: None,
            carer: None,
            address: None,
            preferred_language: default_language(),
            accessibility: Vec::new(),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

/// Named intake sections, used for presence checks and validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntakeSection {
    Parent1,
    Parent2,
    Baby,
    Applicant,
    Employment,
    Banking,
    Disaster,
    Housing,
    Carer,
}

impl IntakeSection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Parent1 => "parent1",
            Self::Parent2 => "parent2",
            Self::Baby => "baby",
            Self::Applicant => "applicant",
            Self::Employment => "employment",
            Self::Banking => "banking",
            Self::Disaster => "disaster",
            Self::Housing => "housing",
            Self::Carer => "carer",
        }
    }
}

impl Intake {
    pub fn has_section(&self, section: IntakeSection) -> bool {
        match section {
            IntakeSection::Parent1 => self.parent1.is_some(),
            IntakeSection::Parent2 => self.parent2.is_some(),
            IntakeSection::Baby => self.baby.is_some(),
            IntakeSection::Applicant => self.applicant.is_some(),
            IntakeSection::Employment => self.employment.is_some(),
            IntakeSection::Banking => self.banking.is_some(),
            IntakeSection::Disaster => self.disaster.is_some(),
            IntakeSection::Housing => self.housing.is_some(),
            IntakeSection::Carer => self.carer.is_some(),
        }
    }

    /// Persons included in the intake, paired with their section.
    pub fn persons(&self) -> impl Iterator<Item = (IntakeSection, &Person)> {
        [
            (IntakeSection::Parent1, self.parent1.as_ref()),
            (IntakeSection::Parent2, self.parent2.as_ref()),
            (IntakeSection::Applicant, self.applicant.as_ref()),
        ]
        .into_iter()
        .filter_map(|(section, person)| person.map(|person| (section, person)))
    }

    /// Checks the structural rules every intake must satisfy before planning.
    pub fn validate(&self) -> Result<(), IntakeViolation> {
        for (section, person) in self.persons() {
            if person.full_name.trim().is_empty() {
                return Err(IntakeViolation::BlankName { section });
            }
        }
        if let Some(housing) = &self.housing {
            if housing.household_size == Some(0) {
                return Err(IntakeViolation::EmptyHousehold);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeViolation {
    #[error("{} full_name must not be blank", section.label())]
    BlankName { section: IntakeSection },
    #[error("housing household_size must be at least 1")]
    EmptyHousehold,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub suburb: String,
    pub state: String,
    pub postcode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub full_name: String,
    pub dob: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "X")]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baby {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<Sex>,
    pub dob: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_employer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_work_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_for_unemployment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_assessment: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub training_interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub work_preferences: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banking {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bsb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disaster {
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_damage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Housing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub household_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub special_needs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary_accommodation_needed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarerDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub care_recipient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_per_week: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}
