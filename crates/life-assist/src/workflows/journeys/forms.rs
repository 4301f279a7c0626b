//! Declarative form schemas and the read-only mapper that prefills them from
//! a vaulted intake.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::intake::Intake;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    /// Dotted lookup path into the serialized intake, e.g. `parent1.full_name`.
    pub source: String,
    #[serde(default)]
    pub default: Option<Value>,
    pub required: bool,
}

impl FormField {
    fn new(name: &str, label: &str, source: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            source: source.to_string(),
            default: None,
            required,
        }
    }

    fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    pub id: String,
    pub title: String,
    pub description: String,
    pub review_text: String,
    pub fields: Vec<FormField>,
}

/// Immutable set of form schemas keyed by the step's `form_schema_ref`.
#[derive(Debug, Clone, Default)]
pub struct FormCatalog {
    forms: BTreeMap<String, FormSchema>,
}

impl FormCatalog {
    pub fn new(forms: impl IntoIterator<Item = FormSchema>) -> Self {
        Self {
            forms: forms
                .into_iter()
                .map(|form| (form.id.clone(), form))
                .collect(),
        }
    }

    pub fn standard() -> Self {
        Self::new(standard_forms())
    }

    pub fn get(&self, form_id: &str) -> Option<&FormSchema> {
        self.forms.get(form_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Resolved,
    Defaulted,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResolution {
    pub field: String,
    pub label: String,
    pub status: FieldStatus,
    pub required: bool,
}

/// Mapper output for one form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormPrefill {
    pub form_id: String,
    pub data: BTreeMap<String, Value>,
    pub fields: Vec<FieldResolution>,
    pub missing_required: Vec<String>,
    pub review_text: String,
}

impl FormPrefill {
    pub fn count(&self, status: FieldStatus) -> usize {
        self.fields
            .iter()
            .filter(|field| field.status == status)
            .count()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("no form schema registered for '{0}'")]
    UnknownForm(String),
    #[error("intake could not be encoded for mapping: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Resolves declared fields against the intake. Never mutates its inputs.
#[derive(Debug, Clone)]
pub struct FieldMapper {
    catalog: FormCatalog,
}

impl FieldMapper {
    pub fn new(catalog: FormCatalog) -> Self {
        Self { catalog }
    }

    pub fn prefill(&self, form_id: &str, intake: &Intake) -> Result<FormPrefill, MappingError> {
        let schema = self
            .catalog
            .get(form_id)
            .ok_or_else(|| MappingError::UnknownForm(form_id.to_string()))?;
        let document = serde_json::to_value(intake)?;
        Ok(map_schema(schema, &document))
    }
}

fn map_schema(schema: &FormSchema, document: &Value) -> FormPrefill {
    let mut data = BTreeMap::new();
    let mut fields = Vec::with_capacity(schema.fields.len());
    let mut missing_required = Vec::new();

    for field in &schema.fields {
        let (value, status) = match lookup(document, &field.source) {
            Some(value) => (value.clone(), FieldStatus::Resolved),
            None => match &field.default {
                Some(default) if !default.is_null() => (default.clone(), FieldStatus::Defaulted),
                _ => (Value::Null, FieldStatus::Missing),
            },
        };

        if field.required && status == FieldStatus::Missing {
            missing_required.push(field.name.clone());
        }

        data.insert(field.name.clone(), value);
        fields.push(FieldResolution {
            field: field.name.clone(),
            label: field.label.clone(),
            status,
            required: field.required,
        });
    }

    let review_text = if missing_required.is_empty() {
        schema.review_text.clone()
    } else {
        format!(
            "{} Required fields still missing: {}.",
            schema.review_text,
            missing_required.join(", ")
        )
    };

    FormPrefill {
        form_id: schema.id.clone(),
        data,
        fields,
        missing_required,
        review_text,
    }
}

/// Walks a dotted path; absent segments and explicit nulls both yield `None`.
pub(crate) fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

fn standard_forms() -> Vec<FormSchema> {
    vec![
        FormSchema {
            id: "birth_registry".to_string(),
            title: "Birth Registration".to_string(),
            description: "Register the birth of your baby with the Registry of Births, Deaths and Marriages.".to_string(),
            review_text: "Please review the birth registration details above before consenting to submission.".to_string(),
            fields: vec![
                FormField::new("parent1_full_name", "Parent 1 Full Name", "parent1.full_name", true),
                FormField::new("parent1_dob", "Parent 1 Date of Birth", "parent1.dob", true),
                FormField::new("parent2_full_name", "Parent 2 Full Name", "parent2.full_name", false),
                FormField::new("baby_name", "Baby's Name", "baby.name", false),
                FormField::new("baby_sex", "Baby's Sex", "baby.sex", false),
                FormField::new("baby_dob", "Baby's Date of Birth", "baby.dob", true),
                FormField::new("place_of_birth", "Place of Birth", "baby.place_of_birth", false),
                FormField::new("preferred_language", "Preferred Language", "preferred_language", false)
                    .with_default(Value::String("en".to_string())),
            ],
        },
        FormSchema {
            id: "medicare_newborn".to_string(),
            title: "Medicare Newborn Enrolment".to_string(),
            description: "Enrol your newborn baby for Medicare coverage.".to_string(),
            review_text: "Please review the Medicare enrolment details above before consenting to submission.".to_string(),
            fields: vec![
                FormField::new("parent1_full_name", "Parent 1 Full Name", "parent1.full_name", true),
                FormField::new("parent1_email", "Parent 1 Email", "parent1.email", false),
                FormField::new("baby_name", "Baby's Name", "baby.name", false),
                FormField::new("baby_dob", "Baby's Date of Birth", "baby.dob", true),
            ],
        },
        FormSchema {
            id: "jobseeker_payment".to_string(),
            title: "Centrelink JobSeeker Payment".to_string(),
            description: "Apply for income support after losing your job.".to_string(),
            review_text: "Please review your JobSeeker Payment application details above before consenting to submission.".to_string(),
            fields: vec![
                FormField::new("applicant_full_name", "Full Name", "applicant.full_name", true),
                FormField::new("applicant_dob", "Date of Birth", "applicant.dob", true),
                FormField::new("last_employer", "Last Employer Name", "employment.last_employer", false),
                FormField::new("last_work_date", "Last Day of Work", "employment.last_work_date", false),
                FormField::new("reason_for_unemployment", "Reason for Unemployment", "employment.reason_for_unemployment", false),
                FormField::new("bank_bsb", "BSB", "banking.bsb", true),
                FormField::new("bank_account_number", "Account Number", "banking.account_number", true),
                FormField::new("bank_account_name", "Account Name", "banking.account_name", false),
            ],
        },
        FormSchema {
            id: "job_service_provider".to_string(),
            title: "Job Service Provider Registration".to_string(),
            description: "Register with a job service provider for employment assistance.".to_string(),
            review_text: "Please review your Job Service Provider registration details above before consenting to submission.".to_string(),
            fields: vec![
                FormField::new("applicant_full_name", "Full Name", "applicant.full_name", true),
                FormField::new("applicant_dob", "Date of Birth", "applicant.dob", true),
                FormField::new("preferred_provider", "Preferred Provider", "employment.preferred_provider", false),
                FormField::new("skills_assessment", "Skills Assessment Required", "employment.skills_assessment", false)
                    .with_default(Value::Bool(false)),
                FormField::new("training_interests", "Training Interests", "employment.training_interests", false),
            ],
        },
        FormSchema {
            id: "emergency_disaster_payment".to_string(),
            title: "Emergency Disaster Payment".to_string(),
            description: "Apply for emergency financial assistance after a disaster.".to_string(),
            review_text: "Please review your Emergency Disaster Payment application details above before consenting to submission.".to_string(),
            fields: vec![
                FormField::new("applicant_full_name", "Full Name", "applicant.full_name", true),
                FormField::new("applicant_dob", "Date of Birth", "applicant.dob", true),
                FormField::new("disaster_type", "Type of Disaster", "disaster.type", false),
                FormField::new("disaster_date", "Date of Disaster", "disaster.date", false),
                FormField::new("disaster_location", "Location", "disaster.location", false),
                FormField::new("bank_bsb", "BSB", "banking.bsb", false),
                FormField::new("bank_account_number", "Account Number", "banking.account_number", false),
            ],
        },
        FormSchema {
            id: "emergency_housing_assistance".to_string(),
            title: "Emergency Housing Assistance".to_string(),
            description: "Apply for emergency housing support after a disaster.".to_string(),
            review_text: "Please review your Emergency Housing Assistance application details above before consenting to submission.".to_string(),
            fields: vec![
                FormField::new("applicant_full_name", "Full Name", "applicant.full_name", true),
                FormField::new("applicant_dob", "Date of Birth", "applicant.dob", true),
                FormField::new("disaster_type", "Type of Disaster", "disaster.type", false),
                FormField::new("housing_status", "Current Housing Status", "housing.status", false)
                    .with_default(Value::String("unknown".to_string())),
                FormField::new("household_size", "Household Size", "housing.household_size", false),
                FormField::new("temporary_accommodation_needed", "Temporary Accommodation Needed", "housing.temporary_accommodation_needed", false),
            ],
        },
        FormSchema {
            id: "carer_payment".to_string(),
            title: "Carer Payment Application".to_string(),
            description: "Apply for income support while providing full-time care.".to_string(),
            review_text: "Please review your Carer Payment application details above before consenting to submission.".to_string(),
            fields: vec![
                FormField::new("applicant_full_name", "Full Name", "applicant.full_name", true),
                FormField::new("applicant_dob", "Date of Birth", "applicant.dob", true),
                FormField::new("care_recipient_name", "Care Recipient", "carer.care_recipient_name", true),
                FormField::new("relationship", "Relationship to Care Recipient", "carer.relationship", false),
                FormField::new("hours_per_week", "Hours of Care per Week", "carer.hours_per_week", false),
                FormField::new("bank_bsb", "BSB", "banking.bsb", false),
                FormField::new("bank_account_number", "Account Number", "banking.account_number", false),
            ],
        },
        FormSchema {
            id: "carer_allowance".to_string(),
            title: "Carer Allowance Application".to_string(),
            description: "Apply for the supplementary carer allowance.".to_string(),
            review_text: "Please review your Carer Allowance application details above before consenting to submission.".to_string(),
            fields: vec![
                FormField::new("applicant_full_name", "Full Name", "applicant.full_name", true),
                FormField::new("care_recipient_name", "Care Recipient", "carer.care_recipient_name", true),
                FormField::new("condition", "Care Recipient Condition", "carer.condition", false),
            ],
        },
    ]
}
