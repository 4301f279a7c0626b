use std::collections::BTreeSet;

use super::domain::LifeEvent;
use super::intake::{Intake, IntakeSection};

/// Intake sections that must all be present for a life event to apply.
pub const fn required_sections(event: LifeEvent) -> &'static [IntakeSection] {
    match event {
        LifeEvent::Birth => &[IntakeSection::Baby, IntakeSection::Parent1],
        LifeEvent::Unemployment => &[IntakeSection::Employment, IntakeSection::Applicant],
        LifeEvent::DisasterRecovery => &[IntakeSection::Disaster, IntakeSection::Applicant],
        LifeEvent::CarerSupport => &[IntakeSection::Carer, IntakeSection::Applicant],
    }
}

/// Every life event whose required sections are populated. Presence only.
pub fn classify(intake: &Intake) -> BTreeSet<LifeEvent> {
    LifeEvent::by_priority()
        .into_iter()
        .filter(|event| {
            required_sections(*event)
                .iter()
                .all(|section| intake.has_section(*section))
        })
        .collect()
}

/// Highest-priority matching life event, if any.
pub fn primary_life_event(intake: &Intake) -> Option<LifeEvent> {
    let matched = classify(intake);
    LifeEvent::by_priority()
        .into_iter()
        .find(|event| matched.contains(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::journeys::intake::{
        Baby, CarerDetails, Disaster, Employment, Person,
    };
    use chrono::NaiveDate;

    fn person() -> Person {
        Person {
            full_name: "Riley Park".to_string(),
            dob: NaiveDate::from_ymd_opt(1985, 1, 9).expect("valid date"),
            email: None,
            phone: None,
            address: None,
        }
    }

    fn baby() -> Baby {
        Baby {
            name: None,
            sex: None,
            dob: NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date"),
            place_of_birth: None,
        }
    }

    #[test]
    fn empty_intake_matches_nothing() {
        assert!(classify(&Intake::default()).is_empty());
        assert_eq!(primary_life_event(&Intake::default()), None);
    }

    #[test]
    fn baby_without_parent_is_not_birth() {
        let intake = Intake {
            baby: Some(baby()),
            applicant: Some(person()),
            ..Intake::default()
        };
        assert!(classify(&intake).is_empty());
    }

    #[test]
    fn multiple_events_match_independently() {
        let intake = Intake {
            applicant: Some(person()),
            employment: Some(Employment::default()),
            disaster: Some(Disaster::default()),
            carer: Some(CarerDetails::default()),
            ..Intake::default()
        };

        let matched = classify(&intake);
        assert_eq!(
            matched.into_iter().collect::<Vec<_>>(),
            vec![
                LifeEvent::Unemployment,
                LifeEvent::DisasterRecovery,
                LifeEvent::CarerSupport
            ]
        );
        assert_eq!(primary_life_event(&intake), Some(LifeEvent::Unemployment));
    }

    #[test]
    fn birth_outranks_other_events() {
        let intake = Intake {
            baby: Some(baby()),
            parent1: Some(person()),
            applicant: Some(person()),
            disaster: Some(Disaster::default()),
            ..Intake::default()
        };
        assert_eq!(primary_life_event(&intake), Some(LifeEvent::Birth));
    }
}
