use clap::Parser;

/// Watchroom: a chat room with screen sharing, driven locally.
#[derive(Parser, Debug)]
#[command(name = "watchroom", version, about)]
pub struct Args {
    /// Room to create and join.
    #[arg(short = 'r', long, default_value = "lobby")]
    pub room: String,

    /// Display name for the local participant.
    #[arg(short = 'n', long, default_value = "You")]
    pub name: String,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
