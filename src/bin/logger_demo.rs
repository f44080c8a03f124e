use sessionward::logger::*;

fn main() -> anyhow::Result<()> {
    // $ cargo run --bin logger_demo -- json
    let format = std::env::args().nth(1).unwrap_or_default();
    let logger = Logger::new_bootstrap_with(LogFormat::parse(&format)?);
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!("bootstrap info log");

    let config = LogConfig{ filter: "debug".to_string() };
    logger.reload_from_config(&config)?;
    trace!("application trace log");
    debug!(session_id = "s-1", "application debug log");
    info!(user_id = "user-42", "application info log");

    let config = LogConfig{ filter: "sessionward=trace,warn".to_string() };
    logger.reload_from_config(&config)?;
    info!("hidden: this binary is not sessionward");
    warn!("still shown at warn");

    Ok(())
}
