use anyhow::Result;
use stageload::config::Config;
use stageload::inspector;
use stageload::logger::Logger;

#[tokio::main]
async fn main() -> Result<()> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            eprintln!("\n💡 Fix the configuration file or remove it to use the defaults.");
            if let Ok(path) = Config::get_default_config_path() {
                eprintln!("   Default location: {}", path.display());
            }
            return Ok(());
        }
    };

    let logger = Logger::from_config(config.logging.enabled)?;
    logger.log("Inspector starting".to_string());

    // Run the TUI application
    inspector::run_app(&config, logger).await?;

    Ok(())
}
