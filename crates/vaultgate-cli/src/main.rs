mod client;

use clap::{Parser, Subcommand};

use client::GatewayClient;

#[derive(Parser)]
#[command(name = "vaultgate", about = "Credential-isolated tool gateway for the Plaid API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Connection {
    /// Gateway base URL
    #[arg(long, default_value = "http://127.0.0.1:8787")]
    url: String,

    /// Upstream client ID
    #[arg(long, env = "PLAID_CLIENT_ID")]
    client_id: String,

    /// Upstream secret
    #[arg(long, env = "PLAID_SECRET", hide_env_values = true)]
    secret: String,
}

impl Connection {
    fn client(self) -> GatewayClient {
        GatewayClient::new(self.url, self.client_id, self.secret)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway HTTP server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List the tools a running gateway exposes
    Tools {
        #[command(flatten)]
        conn: Connection,
    },
    /// Call a tool on a running gateway
    Call {
        /// Tool name
        name: String,

        /// Tool arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,

        /// Approve the call up front (tools that need approval)
        #[arg(long, conflicts_with = "deny")]
        approve: bool,

        /// Deny the call up front with this reason
        #[arg(long)]
        deny: Option<String>,

        #[command(flatten)]
        conn: Connection,
    },
    /// List or answer pending approvals on a running gateway
    Approvals {
        #[command(subcommand)]
        action: ApprovalsAction,
    },
    /// Check configuration and, if given a URL, a running gateway
    Health {
        /// Gateway base URL to check
        #[arg(long)]
        url: Option<String>,
    },
}

#[derive(Subcommand)]
enum ApprovalsAction {
    /// Show approvals waiting for a decision
    List {
        #[command(flatten)]
        conn: Connection,
    },
    /// Approve or deny a pending approval
    Respond {
        /// Approval ID from `approvals list`
        id: String,

        /// Let the tool call run
        #[arg(long, conflicts_with = "deny", required_unless_present = "deny")]
        approve: bool,

        /// Refuse the tool call
        #[arg(long)]
        deny: bool,

        /// Reason shown as the denied call's result
        #[arg(long, requires = "deny")]
        reason: Option<String>,

        #[command(flatten)]
        conn: Connection,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Serve { port } => {
            rt.block_on(async {
                let config = vaultgate_config::load_config()?;
                vaultgate_gateway::start_gateway(config, port)
                    .await
                    .map_err(|e| anyhow::anyhow!("{e}"))
            })?;
        }
        Commands::Tools { conn } => {
            rt.block_on(client::run_tools(&conn.client()))?;
        }
        Commands::Call {
            name,
            args,
            approve,
            deny,
            conn,
        } => {
            rt.block_on(client::run_call(&conn.client(), name, args, approve, deny))?;
        }
        Commands::Approvals { action } => match action {
            ApprovalsAction::List { conn } => {
                rt.block_on(client::run_approvals_list(&conn.client()))?;
            }
            ApprovalsAction::Respond {
                id,
                approve,
                reason,
                conn,
                ..
            } => {
                rt.block_on(client::run_approvals_respond(&conn.client(), id, approve, reason))?;
            }
        },
        Commands::Health { url } => {
            let config = vaultgate_config::load_config()?;
            println!("vaultgate configuration");
            println!("  gateway:   {}:{}", config.gateway.host, config.gateway.port);
            println!("  upstream:  {}", config.upstream.resolved_base_url());
            println!("  storage:   {}", config.storage_path()?.display());
            println!("  approvals: {}s timeout", config.approval.timeout_secs);
            println!("  tools:     profile {:?}, {} denied", config.tools.profile, config.tools.deny.len());

            if let Some(url) = url {
                let client = GatewayClient::new(url, String::new(), String::new());
                let health = rt.block_on(client.health())?;
                println!("gateway: {health}");
            }
        }
    }

    Ok(())
}
