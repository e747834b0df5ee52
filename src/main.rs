use clap::{Parser, Subcommand};
use farmstead::app::cron::CronUseCase;
use farmstead::app::push_service::PushService;
use farmstead::config::AppConfig;
use farmstead::domain::NotificationType;
use farmstead::infra::{build_push_transport, build_storage, jwt_auth::JwtAuth};
use farmstead::notifications::PushPayload;
use farmstead::server::{start_server, AppState};
use farmstead::{logging, metrics};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "farmstead")]
#[command(about = "Swine herd management backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Overrides the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Process due scheduled notifications once and exit
    Cron,
    /// Send a one-off push notification to every device of a user
    SendPush {
        #[arg(long)]
        user_id: Uuid,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        body: String,
        /// Notification type used for routing, e.g. farrowing_due
        #[arg(long, default_value = "general")]
        notification_type: String,
        #[arg(long)]
        related_id: Option<Uuid>,
    },
}

fn parse_type(raw: &str) -> Result<NotificationType, Box<dyn std::error::Error>> {
    Ok(serde_json::from_value(serde_json::Value::String(raw.to_string()))?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Serve { port } => {
            logging::init_logging();
            metrics::init_metrics(config.server.metrics_port);
            let state = AppState {
                storage: build_storage(&config),
                auth: Arc::new(JwtAuth::new(config.jwt_secret()?)),
                push: build_push_transport(&config)?,
                cron_secret: config.cron.secret.clone(),
                batch_size: config.cron.batch_size,
                app_base_url: config.server.app_base_url.clone(),
            };
            if state.cron_secret.is_none() {
                info!("CRON_SECRET not set; cron and push-send endpoints will reject all callers");
            }
            start_server(state, port.unwrap_or(config.server.port)).await?;
        }
        Commands::Cron => {
            logging::init_cli_logging();
            let storage = build_storage(&config);
            let push = PushService::new(storage.clone(), build_push_transport(&config)?);
            let cron = CronUseCase::new(storage, push, config.cron.batch_size);
            match cron.process_due(chrono::Utc::now()).await {
                Ok(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
                Err(e) => {
                    error!("Cron run failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Commands::SendPush { user_id, title, body, notification_type, related_id } => {
            logging::init_cli_logging();
            let notification_type = parse_type(&notification_type)?;
            let storage = build_storage(&config);
            let service = PushService::new(storage, build_push_transport(&config)?);
            let payload = PushPayload::new(notification_type, &title, &body, related_id);
            let outcome = service.send_to_user(user_id, &payload).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}
