use sessionward::domain_model::SubjectId;
use sessionward::logger::*;
use sessionward::runtime::*;
use sessionward::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    let logger = Logger::new_bootstrap_with(LogFormat::parse(&project_settings.log.format)?);
    info!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let runtime = Runtime::try_new(&project_settings).await?;
    let result = dispatch(&runtime, cli.command).await;

    let shutdown_timeout = std::time::Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, runtime.shutdown()).await {
        Ok(_) => info!("runtime shutdown successfully"),
        Err(_) => error!("runtime shutdown timed out"),
    }

    result
}

async fn dispatch(runtime: &Runtime, command: Command) -> anyhow::Result<()> {
    let manager = &runtime.auth_session_manager;
    match command {
        Command::Login { subject } => {
            let tokens = manager.login(&SubjectId(subject)).await?;
            println!("{}", serde_json::to_string_pretty(&tokens)?);
        }
        Command::Refresh { token } => {
            let tokens = manager.refresh(&token).await?;
            println!("{}", serde_json::to_string_pretty(&tokens)?);
        }
        Command::Logout { refresh, access } => {
            manager.logout(&refresh, access.as_deref()).await;
            println!("logged out");
        }
        Command::Authorize { token } => {
            let subject = manager.authorize_request(&token).await?;
            println!("{}", subject);
        }
        Command::Sweep => {
            let report = runtime.sweep().await?;
            println!(
                "pruned {} sessions, purged {} blacklist entries",
                report.pruned_sessions, report.purged_blacklist_entries
            );
        }
    }
    Ok(())
}
