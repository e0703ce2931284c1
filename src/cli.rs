use clap::{Parser, Subcommand};

use crate::domain::SetupStatus;
use crate::services::LinkCodeOutcome;

#[derive(Parser)]
#[command(name = "lazy-onboard")]
#[command(version = "0.1.0")]
#[command(about = "Lazy trading onboarding service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config directory (default.toml plus <LAZY_ENV>.toml)
    #[arg(short, long, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default)
    Serve {
        /// Use in-memory stores instead of PostgreSQL and Redis
        #[arg(long)]
        memory: bool,
        /// Override server.port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Apply database migrations and exit
    Migrate,
    /// Print the onboarding step for a wallet
    Status {
        /// Wallet address
        wallet: String,
    },
    /// Issue a link code for a wallet
    LinkCode {
        /// Wallet address
        wallet: String,
    },
}

impl Cli {
    pub fn command_or_default(&self) -> Commands {
        match &self.command {
            Some(Commands::Serve { memory, port }) => Commands::Serve {
                memory: *memory,
                port: *port,
            },
            Some(Commands::Migrate) => Commands::Migrate,
            Some(Commands::Status { wallet }) => Commands::Status {
                wallet: wallet.clone(),
            },
            Some(Commands::LinkCode { wallet }) => Commands::LinkCode {
                wallet: wallet.clone(),
            },
            None => Commands::Serve {
                memory: false,
                port: None,
            },
        }
    }
}

pub fn print_status(wallet: &str, status: &SetupStatus) {
    println!("\x1b[36mWallet:\x1b[0m {}", wallet);
    println!(
        "\x1b[36mStep:\x1b[0m   {} ({})",
        status.step,
        if status.has_setup {
            "setup started"
        } else {
            "not started"
        }
    );
    if let Some(agent) = &status.agent {
        println!("  agent:      {} ({})", agent.name, agent.id);
    }
    if let Some(link) = &status.telegram_user {
        println!(
            "  telegram:   {} (@{})",
            link.telegram_user_id,
            link.telegram_username.as_deref().unwrap_or("-")
        );
    }
    if let Some(deployment) = &status.deployment {
        println!(
            "  deployment: {} [{}] since {}",
            deployment.id, deployment.status, deployment.started_at
        );
    }
    if let Some(address) = &status.delegated_address {
        println!("  delegated:  {}", address.address);
    }
}

pub fn print_link_code(outcome: &LinkCodeOutcome) {
    match outcome {
        LinkCodeOutcome::AlreadyLinked(linked) => {
            println!(
                "\x1b[33mAlready linked\x1b[0m to telegram user {}",
                linked.telegram_user.telegram_user_id
            );
            if let Some(agent_id) = linked.agent_id {
                println!("  agent: {}", agent_id);
            }
        }
        LinkCodeOutcome::Issued(issued) => {
            println!("\x1b[32mCode:\x1b[0m      {}", issued.code);
            println!("\x1b[32mDeep link:\x1b[0m {}", issued.deep_link);
            println!("Expires in {}s", issued.expires_in_seconds);
        }
    }
}
