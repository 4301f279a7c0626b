use crate::infra::InMemoryJourneyRepository;
use chrono::{Local, NaiveDate};
use clap::Args;
use life_assist::config::JourneyConfig;
use life_assist::error::AppError;
use life_assist::workflows::journeys::{
    Banking, Employment, Intake, JourneyPlanView, JourneyRequest, JourneyService, Person,
    SimulatedExecutor, StepId,
};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Jurisdiction recorded on the journey (defaults to the configured one)
    #[arg(long)]
    pub(crate) jurisdiction: Option<String>,
    /// Stop after consent is recorded for the first step only
    #[arg(long)]
    pub(crate) partial_consent: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        jurisdiction,
        partial_consent,
    } = args;

    let config = JourneyConfig::default();
    let consent_ttl = config.consent_ttl;
    let service = JourneyService::new(
        Arc::new(InMemoryJourneyRepository::default()),
        Arc::new(SimulatedExecutor::new()),
        config,
    );

    println!("Life-event journey demo (personal details are never printed)");

    let journey = service.create_journey(JourneyRequest {
        intake: demo_intake(),
        life_event: None,
        jurisdiction,
    })?;
    render_plan(&journey.plan_view());

    println!("\nPrefill");
    for step in &journey.steps {
        let review = service.prefill(&journey.id, &step.id).await?;
        let missing = if review.missing_required.is_empty() {
            "none".to_string()
        } else {
            review.missing_required.join(", ")
        };
        println!(
            "- {} [{}]: {} fields mapped, missing required: {}",
            review.title,
            review.form_id,
            review.fields.len(),
            missing
        );
    }

    let scope: BTreeSet<StepId> = if partial_consent {
        journey.steps.iter().take(1).map(|step| step.id.clone()).collect()
    } else {
        journey.steps.iter().map(|step| step.id.clone()).collect()
    };
    let grant = service
        .grant_consent(&journey.id, scope, consent_ttl, Some("demo-signature".to_string()))
        .await?;
    println!(
        "\nConsent {} covers {} step(s), expires {}",
        grant.grant_id,
        grant.scope.len(),
        grant.expires_at().format("%Y-%m-%d %H:%M UTC")
    );

    println!("\nSubmission");
    for step in &journey.steps {
        match service.submit(&journey.id, &step.id).await {
            Ok(receipt) => println!(
                "- {}: receipt {} ({:?})",
                step.title, receipt.receipt_id, receipt.status
            ),
            Err(err) => println!("- {}: not submitted ({})", step.title, err.kind().label()),
        }
    }

    render_plan(&service.get_plan(&journey.id)?);

    println!("\nAudit trail");
    for entry in service.get_audit_trail(&journey.id)? {
        let step = entry
            .step_id
            .as_ref()
            .map(StepId::as_str)
            .unwrap_or("-");
        println!(
            "  #{:<3} {:<16} {:<28} {:?}",
            entry.sequence,
            entry.action.label(),
            step,
            entry.outcome
        );
    }

    let chain = service.verify_audit_chain()?;
    println!(
        "\nAudit chain: {} ({} of {} entries verified)",
        if chain.valid { "intact" } else { "BROKEN" },
        chain.verified_entries,
        chain.total_entries
    );

    Ok(())
}

fn render_plan(view: &JourneyPlanView) {
    println!(
        "\n{} journey {} ({}): {} ({}/{} steps completed)",
        view.life_event_label,
        view.journey.id,
        view.journey.jurisdiction,
        view.status_label,
        view.completed_steps,
        view.total_steps
    );
    for step in &view.journey.steps {
        println!("  {:<36} {}", step.title, step.status);
    }
    if let Some(next) = &view.next_step {
        println!("  Next step: {}", next);
    }
}

fn demo_intake() -> Intake {
    let today = Local::now().date_naive();
    Intake {
        applicant: Some(Person {
            full_name: "Demo Applicant".to_string(),
            dob: NaiveDate::from_ymd_opt(1990, 1, 15).unwrap_or(today),
            email: Some("applicant@example.test".to_string()),
            phone: None,
            address: None,
        }),
        employment: Some(Employment {
            last_employer: Some("Example Manufacturing".to_string()),
            last_work_date: today.checked_sub_signed(chrono::Duration::days(7)),
            reason_for_unemployment: Some("redundancy".to_string()),
            ..Employment::default()
        }),
        banking: Some(Banking {
            bsb: Some("000-000".to_string()),
            account_number: Some("00000000".to_string()),
            account_name: Some("Demo Applicant".to_string()),
        }),
        ..Intake::default()
    }
}
