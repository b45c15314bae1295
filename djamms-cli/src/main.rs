mod handlers;
mod server;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "djamms",
    about = "DJAMMS — venue jukebox master-player coordination",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the DJAMMS HTTP coordination server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3500")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Storage backend: "memory" or "sqlite:<path>"
        #[arg(long, default_value = "memory", env = "DJAMMS_STORAGE")]
        storage: String,
    },

    /// Decide a mastery request from a JSON description (stdin)
    Check,

    /// Print version information
    Version,
}

#[derive(serde::Deserialize)]
struct CheckRequest {
    device_id: String,
    now: u64,
    lease: Option<djamms_core::types::Lease>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            host,
            storage,
        } => {
            server::run(&host, port, &storage).await;
        }
        Commands::Check => {
            eprintln!("Reading mastery request from stdin...");
            let mut input = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut input)
                .expect("Failed to read stdin");

            let request: CheckRequest =
                serde_json::from_str(&input).expect("Invalid JSON request");

            let verdict = djamms_core::election::ElectionEngine::decide(
                request.lease.as_ref(),
                &request.device_id,
                request.now,
            );

            println!("{}", serde_json::to_string_pretty(&verdict).unwrap());
        }
        Commands::Version => {
            println!("djamms {}", env!("CARGO_PKG_VERSION"));
            println!("Venue jukebox coordination kernel");
        }
    }
}
