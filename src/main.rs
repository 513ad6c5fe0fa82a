use anyhow::Result;

use flowdeck::{cli, core::config::BrokerConfig, tui};

fn main() -> Result<()> {
    env_logger::init();
    let matches = cli::parse_args();

    let cfg = BrokerConfig::resolve(&matches)?;
    log::info!(
        "Starting flowdeck against {} as '{}'",
        cfg.websocket_url(),
        cfg.client_id
    );

    tui::start(cfg)
}
