use hls_episode_bot::{application, bot, config};
use std::{path::Path, sync::Arc};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_logging();

    log::info!("Reading config...");
    let config = match config::new(Path::new("config.json")) {
        Ok(config) => config,
        Err(err) => {
            log::error!("{err}");
            return;
        }
    };

    let application = Arc::new(application::new(
        config.storage_path,
        config.template_anchor,
        config.history_limit,
    ));

    log::info!("Starting bot...");
    let mut dispatcher = match bot::new(config.bot_token, application).await {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            log::error!("cannot register bot commands: {err}");
            return;
        }
    };

    dispatcher.dispatch().await;
}

/// `RUST_LOG` selects the level, `LOG_FORMAT=json` switches to JSON lines.
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
