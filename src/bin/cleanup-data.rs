use anyhow::Result;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use farmstead::config::AppConfig;
use farmstead::infra::build_storage;
use farmstead::logging;
use farmstead::storage::Storage;
use std::io::Write;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cleanup-data")]
#[command(about = "Maintenance jobs for farmstead data")]
struct Args {
    /// Skip the confirmation prompt
    #[arg(long, global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Job,
}

#[derive(Subcommand)]
enum Job {
    /// Delete scheduled notifications that were sent more than N days ago
    StaleNotifications {
        #[arg(long, default_value_t = 30)]
        older_than_days: i64,
    },
    /// End open housing assignments of sold, culled or deceased animals
    CloseAssignments,
    /// Delete invites that expired without being accepted
    PruneInvites,
}

fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim(), "y" | "Y" | "yes"))
}

async fn stale_notifications(storage: &dyn Storage, days: i64, yes: bool) -> Result<()> {
    let cutoff = Utc::now() - Duration::days(days.max(0));
    if !confirm(&format!("Delete sent notifications older than {}?", cutoff.format("%Y-%m-%d")), yes)? {
        return Ok(());
    }
    let deleted = storage.delete_sent_notifications_before(cutoff).await?;
    println!("Deleted {} sent notification(s)", deleted);
    Ok(())
}

async fn close_assignments(storage: &dyn Storage, yes: bool) -> Result<()> {
    let now = Utc::now();
    let mut stale = Vec::new();
    for assignment in storage.list_assignments(None, true).await? {
        match storage.get_animal(assignment.organization_id, assignment.animal_id).await? {
            Some(animal) if animal.status.is_terminal() => stale.push(assignment),
            Some(_) => {}
            None => {
                warn!("Assignment {} points at missing animal {}", assignment.id, assignment.animal_id);
                stale.push(assignment);
            }
        }
    }
    if stale.is_empty() {
        println!("No open assignments to close");
        return Ok(());
    }
    if !confirm(&format!("Close {} assignment(s)?", stale.len()), yes)? {
        return Ok(());
    }
    for mut assignment in stale {
        assignment.end_at = Some(now.max(assignment.start_at));
        storage.update_assignment(&assignment).await?;
        info!("Closed assignment {} for animal {}", assignment.id, assignment.animal_id);
    }
    Ok(())
}

async fn prune_invites(storage: &dyn Storage, yes: bool) -> Result<()> {
    let now = Utc::now();
    let expired: Vec<_> = storage
        .list_invites(None)
        .await?
        .into_iter()
        .filter(|invite| invite.accepted_at.is_none() && invite.is_expired(now))
        .collect();
    for invite in &expired {
        println!("{}  {}  expired {}", invite.id, invite.email, invite.expires_at.format("%Y-%m-%d"));
    }
    if expired.is_empty() || !confirm(&format!("Delete {} expired invite(s)?", expired.len()), yes)? {
        return Ok(());
    }
    let mut deleted = 0;
    for invite in &expired {
        if storage.delete_invite(invite.id).await? {
            deleted += 1;
        }
    }
    println!("Deleted {} invite(s)", deleted);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_cli_logging();
    let args = Args::parse();
    let config = AppConfig::load()?;
    let storage = build_storage(&config);

    match args.command {
        Job::StaleNotifications { older_than_days } => {
            stale_notifications(storage.as_ref(), older_than_days, args.yes).await
        }
        Job::CloseAssignments => close_assignments(storage.as_ref(), args.yes).await,
        Job::PruneInvites => prune_invites(storage.as_ref(), args.yes).await,
    }
}
