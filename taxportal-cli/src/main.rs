mod cli;
mod prompts;

use anyhow::{Context, Result};
use clap::Parser;
use colored::{ColoredString, Colorize};
use std::path::PathBuf;

use taxportal_core::db::{self, DatabaseConfig};
use taxportal_core::{
    filter, ActivityLog, AttachmentPolicy, Authenticator, DemoAuthenticator, Document,
    FileCandidate, FlowStep, Identity, LoginFlow, PortalConfig, PortalError, RecordStore,
    RegistrationFlow, RegistrationForm, ReturnController, ReturnInput, ReturnPatch, ReturnStatus,
    ReturnType, Session, TaxReturn,
};

use crate::cli::{Cli, Command, DbCommand, DocCommand, ReturnsCommand};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let config = PortalConfig::load_or_create()?;
    let db_config = config.database_config(cli.data.as_deref())?;
    log::debug!(
        "Using {} data file {:?}",
        db_config.backend_type,
        db_config.path
    );
    let store = RecordStore::from_config(&db_config)?;
    let mut session = Session::restore(&store)?;
    let auth = DemoAuthenticator::new();
    let policy = config.attachment_policy();

    let result = dispatch(&cli.command, &store, &mut session, &auth, &policy, &db_config);
    report(result)
}

fn dispatch(
    command: &Command,
    store: &RecordStore,
    session: &mut Session,
    auth: &dyn Authenticator,
    policy: &AttachmentPolicy,
    db_config: &DatabaseConfig,
) -> Result<()> {
    match command {
        Command::Login {
            email,
            phone,
            password,
            otp,
        } => login(store, session, auth, email, phone, password, otp),
        Command::Register {
            first_name,
            last_name,
            email,
            phone,
            password,
            confirm_password,
            agree_terms,
            otp,
        } => {
            let form = RegistrationForm {
                first_name: prompts::text_or_prompt(first_name, "First name:")?,
                last_name: prompts::text_or_prompt(last_name, "Last name:")?,
                email: email.clone().unwrap_or_default(),
                phone_number: phone.clone().unwrap_or_default(),
                use_phone: phone.is_some(),
                password: prompts::password_or_prompt(password, "Password:")?,
                confirm_password: prompts::password_or_prompt(
                    confirm_password,
                    "Confirm password:",
                )?,
                agreed_to_terms: prompts::confirm_terms(*agree_terms)?,
            };
            register(store, session, auth, form, otp)
        }
        Command::Logout => {
            session.logout(store)?;
            println!("{}", "Logged out.".green());
            Ok(())
        }
        Command::Whoami => whoami(session),
        Command::Returns(cmd) => {
            session.require_user().map_err(PortalError::from)?;
            handle_returns_command(cmd, store, policy)
        }
        Command::Doc(cmd) => {
            session.require_user().map_err(PortalError::from)?;
            handle_doc_command(cmd, store)
        }
        Command::Activity { limit } => show_activity(store, *limit),
        Command::Db(cmd) => handle_db_command(cmd, store, db_config),
    }
}

/// Prints user-facing errors as plain messages; anything else propagates
fn report(result: Result<()>) -> Result<()> {
    let Err(err) = result else {
        return Ok(());
    };

    match err.downcast_ref::<PortalError>() {
        Some(portal_err) if portal_err.is_user_facing() => {
            eprintln!("{}", portal_err.to_string().red());
            std::process::exit(1);
        }
        _ => Err(err),
    }
}

fn identity_from_args(email: &Option<String>, phone: &Option<String>) -> Result<Identity> {
    match (email, phone) {
        (_, Some(p)) => Ok(Identity::Phone(p.clone())),
        (Some(e), None) => Ok(Identity::Email(e.clone())),
        (None, None) => Ok(Identity::Email(prompts::text_or_prompt(&None, "Email address:")?)),
    }
}

fn login(
    store: &RecordStore,
    session: &mut Session,
    auth: &dyn Authenticator,
    email: &Option<String>,
    phone: &Option<String>,
    password: &Option<String>,
    otp: &Option<String>,
) -> Result<()> {
    let identity = identity_from_args(email, phone)?;
    let password = prompts::password_or_prompt(password, "Password:")?;

    let mut flow = LoginFlow::new(auth);
    let message = flow.submit_credentials(identity, &password)?;
    println!("{}", message.green());

    let code = prompts::otp_or_prompt(otp)?;
    let user = flow.submit_code(store, session, &code)?;
    println!("{} {}", "Welcome,".green(), user.display_name.bold());
    Ok(())
}

fn register(
    store: &RecordStore,
    session: &mut Session,
    auth: &dyn Authenticator,
    form: RegistrationForm,
    otp: &Option<String>,
) -> Result<()> {
    let mut flow = RegistrationFlow::new(auth);
    let message = flow.submit(form)?;
    println!("{}", message.green());

    if let FlowStep::Verify { identity, .. } = flow.step() {
        println!("Code sent to {}", identity);
    }

    let code = prompts::otp_or_prompt(otp)?;
    let user = flow.submit_code(store, session, &code)?;
    println!(
        "{} {}",
        "Account created. Welcome,".green(),
        user.display_name.bold()
    );
    Ok(())
}

fn whoami(session: &Session) -> Result<()> {
    match session.current_user() {
        Some(user) => {
            println!("{}: {}", "Name".blue(), user.display_name);
            println!("{}: {}", "Signed in with".blue(), user.identity_label());
            println!("{}: {}", "UID".blue(), user.uid);
        }
        None => println!("{}", "Not logged in.".yellow()),
    }
    Ok(())
}

fn status_colored(status: ReturnStatus) -> ColoredString {
    match status {
        ReturnStatus::Pending => status.label().yellow(),
        ReturnStatus::InReview => status.label().blue(),
        ReturnStatus::Completed => status.label().green(),
    }
}

fn parse_type(s: &str) -> Result<ReturnType> {
    ReturnType::parse(s).with_context(|| format!("Unknown return type '{}' (use 1040 or 1065)", s))
}

fn parse_status(s: &str) -> Result<ReturnStatus> {
    ReturnStatus::parse(s).with_context(|| {
        format!(
            "Unknown status '{}' (use Pending, \"In Review\" or Completed)",
            s
        )
    })
}

/// Validates files from disk; rejected ones are reported, accepted ones returned
fn collect_documents(policy: &AttachmentPolicy, files: &[PathBuf]) -> Result<Vec<Document>> {
    let mut candidates = Vec::new();
    for path in files {
        candidates.push(FileCandidate::from_path(path)?);
    }

    let outcome = policy.accept_batch(&candidates);
    if let Some(message) = outcome.error_message() {
        if outcome.accepted.is_empty() {
            return Err(PortalError::Attachments(message).into());
        }
        eprintln!("{} {}", "Skipped:".yellow(), message);
    }
    Ok(outcome.accepted)
}

fn handle_returns_command(
    cmd: &ReturnsCommand,
    store: &RecordStore,
    policy: &AttachmentPolicy,
) -> Result<()> {
    let controller = ReturnController::new(store);

    match cmd {
        ReturnsCommand::New {
            r#type,
            name,
            notes,
            files,
        } => {
            let input = ReturnInput {
                name: name.clone(),
                return_type: parse_type(r#type)?,
                documents: collect_documents(policy, files)?,
                notes: notes.clone(),
            };
            let created = controller.create(input)?;
            println!("{}", "Tax return created successfully!".green());
            println!("ID: {}", created.id.green());
        }
        ReturnsCommand::List { search } => {
            let returns = controller.list()?;
            list_returns(&filter(&returns, search), !search.is_empty());
        }
        ReturnsCommand::Show { id } => {
            show_return(&controller.get(id)?);
        }
        ReturnsCommand::Edit {
            id,
            r#type,
            name,
            notes,
        } => {
            let patch = ReturnPatch {
                name: name.clone(),
                return_type: r#type.as_deref().map(parse_type).transpose()?,
                documents: None,
                notes: notes.clone(),
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to change. Use --type, --name or --notes.");
            }
            controller.update(id, patch)?;
            println!("{}", "Tax return updated.".green());
        }
        ReturnsCommand::Attach { id, files } => {
            let mut documents = controller.get(id)?.documents;
            let added = collect_documents(policy, files)?;
            let count = added.len();
            documents.extend(added);
            controller.update(
                id,
                ReturnPatch {
                    documents: Some(documents),
                    ..Default::default()
                },
            )?;
            println!("{} {} document(s) attached.", "Done.".green(), count);
        }
        ReturnsCommand::Status { id, status } => {
            let status = parse_status(status)?;
            let updated = controller.set_status(id, status)?;
            println!(
                "{} is now {}",
                updated.display_name(),
                status_colored(updated.status)
            );
        }
        ReturnsCommand::Delete { id, yes } => {
            let existing = controller.get(id)?;
            if !*yes && !prompts::confirm_delete(&existing.display_name())? {
                println!("{}", "Deletion cancelled.".yellow());
                return Ok(());
            }
            controller.delete(id)?;
            println!("{}", "Tax return deleted.".green());
        }
        ReturnsCommand::Stats => {
            let stats = controller.stats()?;
            println!("{}: {}", "Total Returns".blue(), stats.total);
            println!("{}: {}", "Pending".yellow(), stats.pending);
            println!("{}: {}", "In Review".blue(), stats.in_review);
            println!("{}: {}", "Completed".green(), stats.completed);
        }
    }

    Ok(())
}

fn list_returns(returns: &[&TaxReturn], searching: bool) {
    if returns.is_empty() {
        if searching {
            println!("{}", "No returns found. Try adjusting your search terms.".yellow());
        } else {
            println!("{}", "No returns found. Get started by adding a new return.".yellow());
        }
        return;
    }

    println!(
        "{:<36} | {:<30} | {:<6} | {:<10} | {:<5} | {:<10}",
        "ID", "Name", "Type", "Status", "Docs", "Updated"
    );
    println!("{}", "-".repeat(112));

    for r in returns {
        println!(
            "{:<36} | {:<30} | {:<6} | {:<10} | {:<5} | {:<10}",
            r.id,
            r.name.as_deref().unwrap_or("-"),
            r.return_type.code(),
            status_colored(r.status),
            r.document_count,
            r.last_updated
        );
    }
}

fn show_return(r: &TaxReturn) {
    println!("{}: {}", "ID".blue(), r.id);
    println!("{}: {}", "Name".blue(), r.display_name());
    println!(
        "{}: Form {} ({})",
        "Type".blue(),
        r.return_type,
        r.return_type.description()
    );
    println!("{}: {}", "Status".blue(), status_colored(r.status));
    println!("{}: {}", "Created".blue(), r.created_date);
    println!("{}: {}", "Last Updated".blue(), r.last_updated);
    if !r.notes.is_empty() {
        println!("{}: {}", "Notes".blue(), r.notes);
    }

    println!("\n{} ({}):", "Documents".green(), r.documents.len());
    for doc in &r.documents {
        println!(
            "  {} {} - {} - {} - uploaded {}",
            doc.id.dimmed(),
            doc.name,
            doc.kind.to_string().cyan(),
            doc.size_display(),
            doc.upload_date
        );
        if !doc.comments.is_empty() {
            println!("      {}", doc.comments.italic());
        }
    }
}

fn handle_doc_command(cmd: &DocCommand, store: &RecordStore) -> Result<()> {
    let controller = ReturnController::new(store);

    match cmd {
        DocCommand::Remove {
            return_id,
            document_id,
        } => {
            let mut tax_return = controller.get(return_id)?;
            let removed = tax_return
                .remove_document(document_id)
                .with_context(|| format!("Document not found: {}", document_id))?;
            controller.update(
                return_id,
                ReturnPatch {
                    documents: Some(tax_return.documents),
                    ..Default::default()
                },
            )?;
            println!("{} {}", "Removed".green(), removed.name);
        }
        DocCommand::Comment {
            return_id,
            document_id,
            comment,
        } => {
            let mut tax_return = controller.get(return_id)?;
            if !tax_return.set_document_comment(document_id, comment) {
                anyhow::bail!("Document not found: {}", document_id);
            }
            controller.update(
                return_id,
                ReturnPatch {
                    documents: Some(tax_return.documents),
                    ..Default::default()
                },
            )?;
            println!("{}", "Comment saved.".green());
        }
    }

    Ok(())
}

fn show_activity(store: &RecordStore, limit: usize) -> Result<()> {
    let entries = ActivityLog::new(store).recent(limit)?;
    if entries.is_empty() {
        println!("{}", "No activity yet.".yellow());
        return Ok(());
    }

    for entry in entries {
        println!(
            "{} {} [{}] {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            entry.action.bold(),
            entry.entity_type,
            entry.description
        );
    }
    Ok(())
}

fn handle_db_command(cmd: &DbCommand, store: &RecordStore, db_config: &DatabaseConfig) -> Result<()> {
    match cmd {
        DbCommand::Path => {
            println!("{} ({})", db_config.path.display(), db_config.backend_type);
        }
        DbCommand::Stats => {
            let stats = store.backend().stats()?;
            println!("{}: {}", "Backend".blue(), stats.backend_type);
            println!("{}: {}", "Keys".blue(), stats.key_count);
            println!("{}: {} bytes", "Size".blue(), stats.total_bytes);
        }
        DbCommand::Migrate { to } => {
            let target = db::create_backend(to, None)?;
            let count = db::copy_all(store.backend(), target.as_ref())?;
            println!(
                "{} {} keys copied to {} ({})",
                "Done.".green(),
                count,
                to.display(),
                target.backend_type()
            );
        }
        DbCommand::Export { output } => {
            let count = db::export_to_json(store.backend(), output)?;
            println!("{} {} keys exported to {}", "Done.".green(), count, output.display());
        }
        DbCommand::Import { input } => {
            let count = db::import_from_json(store.backend(), input)?;
            println!("{} {} keys imported from {}", "Done.".green(), count, input.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logged_out_returns_command_is_user_facing() {
        let store = RecordStore::in_memory();
        let mut session = Session::anonymous();
        let auth = DemoAuthenticator::new();

        let err = dispatch(
            &Command::Returns(ReturnsCommand::Stats),
            &store,
            &mut session,
            &auth,
            &AttachmentPolicy::default(),
            &DatabaseConfig::default(),
        )
        .unwrap_err();

        let portal_err = err.downcast_ref::<PortalError>().unwrap();
        assert!(portal_err.is_user_facing());
        assert_eq!(
            portal_err.to_string(),
            "Not logged in. Run `taxportal login` first."
        );
    }
}
