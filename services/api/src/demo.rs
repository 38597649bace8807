use crate::infra::{
    InMemoryDocumentRepository, InMemoryShareRepository, InMemorySubmissionRepository,
    InMemoryWorkflowRepository,
};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Utc};
use clap::Args;
use permitflow::approvals::{ApprovalEngine, CompletionPolicy, NewStep, StepAction};
use permitflow::calendar::project_completion_date;
use permitflow::directory::{
    import, Authority, AuthorityDirectory, AuthorityId, CategoryId, SubmissionCategory,
};
use permitflow::documents::{
    DocumentId, DocumentOwner, DocumentStore, NewDocument, NewShare, NewVersion, PermissionLevel,
    ShareManager, ShareRecipient,
};
use permitflow::error::AppError;
use permitflow::submissions::{
    calculate_fees, total_amount, AuthorityStatus, FeeContext, FeeKind, NewSubmission, ProjectId,
    StatusUpdate, SubmissionLifecycle,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Draft creation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) created_on: Option<NaiveDate>,
    /// Request expedited handling for the demo submission.
    #[arg(long)]
    pub(crate) expedited: bool,
    /// Authority reference CSV replacing the builtin directory
    #[arg(long, requires = "categories_csv")]
    pub(crate) authorities_csv: Option<PathBuf>,
    /// Category reference CSV replacing the builtin directory
    #[arg(long, requires = "authorities_csv")]
    pub(crate) categories_csv: Option<PathBuf>,
    /// Skip the internal review portion of the demo.
    #[arg(long)]
    pub(crate) skip_review: bool,
}

#[derive(Args, Debug)]
pub(crate) struct FeeQuoteArgs {
    /// Authority handling the submission
    #[arg(long)]
    pub(crate) authority: String,
    /// Submission category to price
    #[arg(long)]
    pub(crate) category: String,
    /// Draft creation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) created_on: Option<NaiveDate>,
    /// Submission date (YYYY-MM-DD). Defaults to the creation date.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) submission_date: Option<NaiveDate>,
    /// Price expedited handling
    #[arg(long)]
    pub(crate) expedited: bool,
    /// Authority reference CSV replacing the builtin directory
    #[arg(long, requires = "categories_csv")]
    pub(crate) authorities_csv: Option<PathBuf>,
    /// Category reference CSV replacing the builtin directory
    #[arg(long, requires = "authorities_csv")]
    pub(crate) categories_csv: Option<PathBuf>,
}

pub(crate) fn run_fee_quote(args: FeeQuoteArgs) -> Result<(), AppError> {
    let FeeQuoteArgs {
        authority,
        category,
        created_on,
        submission_date,
        expedited,
        authorities_csv,
        categories_csv,
    } = args;

    let directory = load_directory(authorities_csv, categories_csv)?;
    let authority_id = AuthorityId(authority.clone());
    let category_id = CategoryId(category.clone());

    let Some(authority) = directory.authority(&authority_id) else {
        println!(
            "Unknown authority '{}'. Known authorities: {}",
            authority,
            known_ids(directory.authorities().map(|entry| entry.id.0.as_str()))
        );
        return Ok(());
    };
    let Some(category) = directory.category(&category_id) else {
        println!(
            "Unknown category '{}'. Known categories: {}",
            category,
            known_ids(directory.categories().map(|entry| entry.id.0.as_str()))
        );
        return Ok(());
    };
    if !authority.accepts(&category_id) {
        println!(
            "{} does not accept '{}' submissions",
            authority.name, category.id.0
        );
        return Ok(());
    }

    let created_on = created_on.unwrap_or_else(|| Local::now().date_naive());
    let submission_date = submission_date.unwrap_or(created_on);
    let context = FeeContext {
        created_on,
        submission_date,
        expedited,
    };
    let fees = calculate_fees(&category.fees, &context);
    let processing_days = directory
        .processing_days(&authority_id, &category_id)
        .unwrap_or(category.typical_processing_days);

    println!("Fee quote: {} at {}", category.name, authority.name);
    println!(
        "Submission on {} -> expected completion {} ({} business days)",
        submission_date,
        project_completion_date(submission_date, processing_days),
        processing_days
    );
    for fee in &fees {
        println!("- {}: {} {}", fee.description, fee.amount, fee.currency);
    }
    println!(
        "Total due: {} {}",
        total_amount(&fees),
        category.fees.currency
    );

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        created_on,
        expedited,
        authorities_csv,
        categories_csv,
        skip_review,
    } = args;

    let created_on = created_on.unwrap_or_else(|| Local::now().date_naive());
    let directory = Arc::new(load_directory(authorities_csv, categories_csv)?);

    println!("Permit tracking demo");
    println!(
        "Authority directory: {} authorities / {} categories",
        directory.authorities().count(),
        directory.categories().count()
    );
    let Some((authority, category)) = demo_pair(&directory) else {
        println!("The directory holds no authority/category pair to walk through");
        return Ok(());
    };
    println!(
        "Walking a '{}' submission through {}",
        category.id.0, authority.name
    );

    let submissions = Arc::new(InMemorySubmissionRepository::default());
    let documents = Arc::new(InMemoryDocumentRepository::default());
    let workflows = Arc::new(InMemoryWorkflowRepository::default());
    let shares = Arc::new(InMemoryShareRepository::default());
    let lifecycle = SubmissionLifecycle::new(
        submissions,
        documents.clone(),
        workflows.clone(),
        directory.clone(),
    );
    let store = DocumentStore::new(documents);
    let share_manager = ShareManager::new(shares);
    let engine = ApprovalEngine::new(workflows);

    println!("\nDrafting");
    let draft = NewSubmission {
        project_id: ProjectId("proj-riverside".to_string()),
        authority_id: authority.id.clone(),
        category_id: category.id.clone(),
        title: "Riverside community hall".to_string(),
        expedited,
        created_by: "arch.noor".to_string(),
    };
    let submission = match lifecycle.create(draft, at(created_on, 9)) {
        Ok(versioned) => versioned.record,
        Err(err) => {
            println!("  Draft rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- Draft {} created as {} for project {}",
        submission.id.0, submission.internal_reference, submission.project_id.0
    );

    println!("\nRequired document gate");
    if let Err(err) = lifecycle.submit(&submission.id, "arch.noor", at(created_on, 10)) {
        println!("- Submit refused before uploads: {err}");
    }
    let mut shared_document: Option<DocumentId> = None;
    for kind in &category.required_documents {
        let upload = NewDocument {
            title: format!("{} set", kind.label()),
            kind: *kind,
            owner: DocumentOwner::Submission(submission.id.clone()),
            tags: vec!["demo".to_string()],
            content: NewVersion {
                content_reference: format!("blob://demo/{}/{}", submission.id.0, kind.label()),
                content_type: "application/pdf".to_string(),
                uploaded_by: "arch.noor".to_string(),
                notes: None,
            },
        };
        match store.create(upload, at(created_on, 10)) {
            Ok(versioned) => {
                println!(
                    "- Uploaded {} as {} (version 1)",
                    kind.label(),
                    versioned.record.id.0
                );
                shared_document.get_or_insert(versioned.record.id);
            }
            Err(err) => println!("  Upload of {} failed: {err}", kind.label()),
        }
    }

    println!("\nSubmission");
    let submission = match lifecycle.submit(&submission.id, "arch.noor", at(created_on, 11)) {
        Ok(versioned) => versioned.record,
        Err(err) => {
            println!("  Submit failed: {err}");
            return Ok(());
        }
    };
    if let (Some(date), Some(expected)) = (
        submission.submission_date,
        submission.expected_completion_date,
    ) {
        println!(
            "- Submitted on {} -> expected completion {}",
            date, expected
        );
    }
    for fee in &submission.fees {
        println!(
            "- Fee [{}] {}: {} {}",
            fee.status.label(),
            fee.description,
            fee.amount,
            fee.currency
        );
    }
    println!(
        "- Total due: {} {}",
        total_amount(&submission.fees),
        category.fees.currency
    );

    println!("\nFee settlement");
    match lifecycle.record_fee_payment(
        &submission.id,
        FeeKind::Base,
        Some("receipt FIN-2024-081".to_string()),
        at(created_on, 12),
    ) {
        Ok(versioned) => {
            let outstanding = versioned
                .record
                .fees
                .iter()
                .filter(|fee| !fee.status.is_settled())
                .count();
            println!("- Base fee paid ({outstanding} fee lines still outstanding)");
        }
        Err(err) => println!("  Fee settlement failed: {err}"),
    }

    println!("\nAuthority processing");
    let acknowledgement = StatusUpdate {
        status: AuthorityStatus::UnderReview,
        comments: Some("Logged at the counter".to_string()),
        submission_number: None,
    };
    match lifecycle.update_status(
        &submission.id,
        acknowledgement,
        "authority.clerk",
        at(created_on, 13),
    ) {
        Ok(versioned) => println!("- Authority status: {}", versioned.record.status.label()),
        Err(err) => println!("  Status update failed: {err}"),
    }

    if !skip_review {
        println!("\nInternal review gate");
        let steps = vec![
            NewStep {
                name: "Drafting check".to_string(),
                assignee: "eng.raj".to_string(),
            },
            NewStep {
                name: "Principal sign-off".to_string(),
                assignee: "principal.tan".to_string(),
            },
        ];
        match lifecycle.begin_internal_review(
            &submission.id,
            CompletionPolicy::Sequential,
            steps,
            "arch.noor",
            at(created_on, 13),
        ) {
            Ok(review) => {
                println!(
                    "- Review {} started with {} sequential steps",
                    review.record.id.0,
                    review.record.steps.len()
                );

                let premature = StatusUpdate {
                    status: AuthorityStatus::Approved,
                    comments: None,
                    submission_number: None,
                };
                if let Err(err) = lifecycle.update_status(
                    &submission.id,
                    premature,
                    "authority.clerk",
                    at(created_on, 14),
                ) {
                    println!("- Approval refused while the review is open: {err}");
                }

                for (hour, step) in (15..).zip(&review.record.steps) {
                    match engine.complete_step(
                        &step.id,
                        StepAction::Approved,
                        None,
                        &step.assignee,
                        at(created_on, hour),
                    ) {
                        Ok(versioned) => println!(
                            "- Step '{}' approved by {} (review {})",
                            step.name,
                            step.assignee,
                            versioned.record.status.label()
                        ),
                        Err(err) => println!("  Step '{}' failed: {err}", step.name),
                    }
                }
            }
            Err(err) => println!("  Review could not start: {err}"),
        }
    }

    println!("\nDecision");
    let decision = StatusUpdate {
        status: AuthorityStatus::Approved,
        comments: Some("Approved with standard conditions".to_string()),
        submission_number: Some(format!(
            "{}-{}-0113",
            authority.id.0.to_uppercase(),
            created_on.format("%Y")
        )),
    };
    match lifecycle.update_status(
        &submission.id,
        decision,
        "authority.clerk",
        at(created_on, 18),
    ) {
        Ok(versioned) => {
            let submission = versioned.record;
            match &submission.submission_number {
                Some(number) => println!(
                    "- {} is {} under authority number {}",
                    submission.internal_reference,
                    submission.status.label(),
                    number
                ),
                None => println!(
                    "- {} is {}",
                    submission.internal_reference,
                    submission.status.label()
                ),
            }
            println!("- Status history:");
            for change in &submission.status_history {
                println!(
                    "    {} -> {} by {}",
                    change.previous.label(),
                    change.next.label(),
                    change.actor
                );
            }
        }
        Err(err) => println!("  Decision failed: {err}"),
    }

    if let Some(document_id) = shared_document {
        println!("\nClient sharing");
        let grant = NewShare {
            recipient: ShareRecipient::Email("client@example.com".to_string()),
            level: PermissionLevel::View,
            expires_at: None,
            password: Some("letmein".to_string()),
            granted_by: "arch.noor".to_string(),
        };
        match share_manager.grant(&document_id, grant, at(created_on, 19)) {
            Ok(share) => {
                let share_id = share.record.id;
                match share_manager.check_access(&share_id, Some("letmein"), at(created_on, 19)) {
                    Ok(access) => println!(
                        "- client@example.com holds {} access to {}",
                        access.level.label(),
                        access.document_id.0
                    ),
                    Err(err) => println!("  Access check failed: {err}"),
                }
                match share_manager.revoke(
                    &share_id,
                    Some("project closed".to_string()),
                    at(created_on, 20),
                ) {
                    Ok(_) => match share_manager.check_access(
                        &share_id,
                        Some("letmein"),
                        at(created_on, 20),
                    ) {
                        Err(err) => println!("- After revocation: {err}"),
                        Ok(_) => println!("  Revoked share unexpectedly still grants access"),
                    },
                    Err(err) => println!("  Revocation failed: {err}"),
                }
            }
            Err(err) => println!("  Share grant failed: {err}"),
        }
    }

    Ok(())
}

fn load_directory(
    authorities: Option<PathBuf>,
    categories: Option<PathBuf>,
) -> Result<AuthorityDirectory, AppError> {
    match (authorities, categories) {
        (Some(authorities), Some(categories)) => {
            Ok(import::directory_from_paths(&authorities, &categories)?)
        }
        _ => Ok(AuthorityDirectory::builtin()),
    }
}

/// First authority with an accepted category the directory can resolve.
fn demo_pair(directory: &AuthorityDirectory) -> Option<(&Authority, &SubmissionCategory)> {
    directory.authorities().find_map(|authority| {
        authority
            .accepted_categories
            .iter()
            .find_map(|id| directory.category(id))
            .map(|category| (authority, category))
    })
}

fn known_ids<'a>(ids: impl Iterator<Item = &'a str>) -> String {
    ids.collect::<Vec<_>>().join(", ")
}

fn at(day: NaiveDate, hour: i64) -> DateTime<Utc> {
    (day.and_time(NaiveTime::MIN) + Duration::hours(hour)).and_utc()
}
