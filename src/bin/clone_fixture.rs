//! Clone Fixture Binary
//!
//! Loads a JSON fixture of project trees into the in-memory organization
//! service, clones one project, and prints the outcome as JSON.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs (default: compact text)
//! - `CLONE_*`: see `project_clone_kernel::config`
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin clone_fixture -- fixture.json 00000000-0000-0000-0000-000000000001
//! ```
//!
//! The fixture is an array of `Record` trees with identities, e.g. a
//! `bolt_rentalproject` whose cost sheet slot holds cost sheets with leaf slots.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use project_clone_kernel::config::{policy_from_env, CloneSettings};
use project_clone_kernel::{CloneProjectOperation, EntityRef, InMemoryOrganizationService, Record, RecordId};

/// Logs go to stderr so stdout carries only the outcome JSON.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "clone_fixture=info,project_clone_kernel=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => registry
            .with(fmt::layer().json().flatten_event(true).with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let (fixture_path, project_id) = match (args.next(), args.next()) {
        (Some(path), Some(id)) => (path, id),
        _ => return Err("usage: clone_fixture <fixture.json> <project-id>".into()),
    };

    let settings = CloneSettings::from_env()?;
    let policy = policy_from_env()?;

    let fixture = std::fs::read_to_string(&fixture_path)?;
    let records: Vec<Record> = serde_json::from_str(&fixture)?;

    let service = Arc::new(InMemoryOrganizationService::rental());
    for record in records {
        service.seed(record)?;
    }
    info!(
        fixture = %fixture_path,
        records = service.num_records(),
        "Fixture loaded"
    );

    let target = EntityRef::new(settings.root_kind.clone(), RecordId::from_str(&project_id)?);
    let operation = CloneProjectOperation::new(Arc::clone(&service))
        .with_settings(settings)
        .with_policy(policy);

    match operation.execute(&target).await? {
        Some(outcome) => println!("{}", serde_json::to_string_pretty(&outcome)?),
        None => info!(target_ref = %target, "Target is not a project; nothing cloned"),
    }

    Ok(())
}
