use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use report_review::workflow::{Principal, RecordId, Role};
use report_review::{ReportStatus, ReviewAction};

#[derive(Parser)]
#[command(name = "report-review")]
#[command(about = "Multi-stage approval workflow for forestry report records")]
#[command(long_about = "Moves report records through draft -> waiting_kasi -> waiting_cdk -> final, \
                       gated by organizational role. Pass one --id for a single-record action or \
                       several for a bulk action.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ActorArgs {
    /// Acting user id
    #[arg(long)]
    actor: String,
    /// Organizational role (admin, kasi, kacdk, operator); repeatable
    #[arg(long = "role")]
    roles: Vec<Role>,
    /// Granted permission such as reforestation.approve; repeatable
    #[arg(long = "permission")]
    permissions: Vec<String>,
}

impl ActorArgs {
    fn principal(&self) -> Principal {
        self.roles
            .iter()
            .fold(Principal::new(&self.actor), |actor, role| actor.with_role(*role))
            .with_permissions(self.permissions.iter().cloned())
    }
}

#[derive(Args)]
struct TargetArgs {
    /// Record type key, e.g. reforestation or forest_fire
    #[arg(long = "type")]
    record_type: String,
    /// Record id; give several for a bulk action
    #[arg(long = "id", required = true, num_args = 1..)]
    ids: Vec<RecordId>,
    /// Force the bulk executor even for a single id
    #[arg(long)]
    bulk: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a draft report record
    Create {
        #[arg(long = "type")]
        record_type: String,
        /// Reporting year
        #[arg(long)]
        year: i32,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Submit draft or rejected records for review
    Submit {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Approve records at the actor's review stage
    Approve {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Reject records back to the submitter
    Reject {
        #[command(flatten)]
        target: TargetArgs,
        /// Reason shown to the submitter (required)
        #[arg(long)]
        note: Option<String>,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Soft-delete records
    Delete {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Show which actions the actor may take on a record
    Actions {
        #[arg(long = "type")]
        record_type: String,
        #[arg(long)]
        id: RecordId,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// List active records, reviewer's pending stage first on ties
    List {
        #[arg(long = "type")]
        record_type: String,
        #[arg(long)]
        status: Option<ReportStatus>,
        #[arg(long)]
        year: Option<i32>,
        /// Sort column: created_at, updated_at, year, status, id
        #[arg(long, default_value = "created_at")]
        sort: report_review::workflow::SortColumn,
        /// Sort ascending instead of descending
        #[arg(long)]
        asc: bool,
        #[arg(long)]
        limit: Option<u32>,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Run database migrations
    Migrate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tokio::runtime::Runtime::new()?.block_on(async { run(cli).await })
}

#[cfg(not(feature = "database"))]
async fn run(_cli: Cli) -> Result<()> {
    anyhow::bail!("report-review was built without the `database` feature")
}

#[cfg(feature = "database")]
async fn run(cli: Cli) -> Result<()> {
    use report_review::workflow::ordering::{order_terms, SortDirection, SortSpec};
    use report_review::workflow::ExtraData;
    use report_review::{
        config, init_config, init_telemetry, DerivedCache, ListQuery, NewRecord, RecordStore,
        RecordType, ReviewEngine, SqliteAuditLog, SqliteStore, WorkflowHooks,
    };
    use std::sync::Arc;

    init_config()?;
    let settings = config()?;
    init_telemetry(&settings.observability)?;

    let store = Arc::new(
        SqliteStore::connect(
            &settings.database.url,
            settings.database.max_connections,
            settings.database.auto_migrate,
        )
        .await
        .with_context(|| format!("opening database {}", settings.database.url))?,
    );
    let hooks = WorkflowHooks::new(
        Arc::new(DerivedCache::new(&settings.cache)),
        Arc::new(SqliteAuditLog::new(store.pool().clone())),
    );
    let engine = ReviewEngine::new(store.clone(), hooks);

    let (action, target, actor, extra) = match cli.command {
        Commands::Migrate => {
            store.migrate().await?;
            println!("✅ Migrations applied");
            store.shutdown().await;
            return Ok(());
        }
        Commands::Create {
            record_type,
            year,
            actor,
        } => {
            let record_type = RecordType::from_key(&record_type)?;
            let actor = actor.principal();
            let record = store
                .create_draft(
                    record_type,
                    NewRecord {
                        year,
                        created_by: actor.id().to_string(),
                    },
                )
                .await?;
            println!("📝 Created {} #{} ({})", record_type.key, record.id, record.status);
            store.shutdown().await;
            return Ok(());
        }
        Commands::Actions {
            record_type,
            id,
            actor,
        } => {
            let record_type = RecordType::from_key(&record_type)?;
            let record = store
                .load(record_type, id)
                .await?
                .with_context(|| format!("{} #{id} not found", record_type.key))?;
            let actions = ReviewEngine::available_actions(record_type, &record, &actor.principal());
            if actions.is_empty() {
                println!("No actions available for {} #{id} ({})", record_type.key, record.status);
            } else {
                let names: Vec<&str> = actions.iter().map(|a| a.as_str()).collect();
                println!("{} #{id} ({}): {}", record_type.key, record.status, names.join(", "));
            }
            store.shutdown().await;
            return Ok(());
        }
        Commands::List {
            record_type,
            status,
            year,
            sort,
            asc,
            limit,
            actor,
        } => {
            let record_type = RecordType::from_key(&record_type)?;
            let spec = SortSpec {
                column: sort,
                direction: if asc { SortDirection::Asc } else { SortDirection::Desc },
            };
            let query = ListQuery {
                status,
                year,
                order: order_terms(&actor.principal(), spec),
                limit,
            };
            for record in store.list(record_type, &query).await? {
                println!(
                    "#{:<6} {:<5} {:<13} created {}{}",
                    record.id,
                    record.year,
                    record.status.as_str(),
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    record
                        .rejection_note
                        .as_deref()
                        .map(|note| format!("  note: {note}"))
                        .unwrap_or_default()
                );
            }
            store.shutdown().await;
            return Ok(());
        }
        Commands::Submit { target, actor } => (ReviewAction::Submit, target, actor, ExtraData::none()),
        Commands::Approve { target, actor } => (ReviewAction::Approve, target, actor, ExtraData::none()),
        Commands::Reject {
            target,
            note,
            actor,
        } => (
            ReviewAction::Reject,
            target,
            actor,
            ExtraData {
                rejection_note: note,
            },
        ),
        Commands::Delete { target, actor } => (ReviewAction::Delete, target, actor, ExtraData::none()),
    };

    let record_type = RecordType::from_key(&target.record_type)?;
    let actor = actor.principal();

    let result = if target.ids.len() == 1 && !target.bulk {
        let id = target.ids[0];
        match store.load(record_type, id).await? {
            Some(record) => engine
                .execute_single(record_type, &record, action, &actor, &extra)
                .await
                .map(u64::from),
            None => {
                println!("❌ {} #{id} not found", record_type.key);
                store.shutdown().await;
                return Ok(());
            }
        }
    } else {
        engine
            .execute_bulk(record_type, action, &target.ids, &actor, &extra)
            .await
    };

    match result {
        Ok(0) => println!("⚠️  {}", report_review::STATUS_MISMATCH_MESSAGE),
        Ok(changed) => println!("✅ {action} applied to {changed} of {} record(s)", target.ids.len()),
        Err(e) if e.is_authorization() => println!("🔒 {e}"),
        Err(e) if e.is_validation() => println!("❌ {e}"),
        Err(e) => {
            store.shutdown().await;
            return Err(e.into());
        }
    }

    store.shutdown().await;
    Ok(())
}
