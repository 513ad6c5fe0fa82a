use clap::{Arg, ArgMatches, Command};

/// Parse command line arguments.
pub fn parse_args() -> ArgMatches {
    Command::new("flowdeck")
        .about("Terminal UI for managing named flows stored as MQTT retained messages")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("host")
                .long("host")
                .short('H')
                .help("MQTT websocket broker host")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .help("MQTT websocket broker port")
                .value_parser(clap::value_parser!(u16))
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("client-id")
                .long("client-id")
                .help("Client identifier presented to the broker")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Path to a JSON config file (default: flowdeck.json)")
                .action(clap::ArgAction::Set),
        )
        .get_matches()
}
