use anyhow::Result;
use clap::{Parser, Subcommand};

use calc_backend::config::{JsonRpcConfig, RestConfig};
use calc_backend::{jsonrpc, logging, rest, server};

#[derive(Parser)]
#[command(name = "calc-backend")]
#[command(about = "Calculator backends: REST and JSON-RPC 2.0 over HTTP")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve `POST /calculate`
    Rest(RestConfig),
    /// Serve JSON-RPC 2.0 on every path
    Jsonrpc(JsonRpcConfig),
    /// Serve both endpoints from one process
    All {
        #[command(flatten)]
        rest: RestConfig,
        #[command(flatten)]
        jsonrpc: JsonRpcConfig,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("info");
    let cli = Cli::parse();
    let cancel = server::shutdown_on_ctrl_c();

    match cli.command {
        Commands::Rest(config) => {
            let router = rest::router(&config)?;
            let listener = server::bind(config.rest_addr).await?;
            server::serve("REST", listener, router, cancel).await?;
        }
        Commands::Jsonrpc(config) => {
            let listener = server::bind(config.jsonrpc_addr).await?;
            server::serve("JSON-RPC", listener, jsonrpc::router(), cancel).await?;
        }
        Commands::All { rest, jsonrpc } => {
            let rest_router = rest::router(&rest)?;
            let rest_listener = server::bind(rest.rest_addr).await?;
            let jsonrpc_listener = server::bind(jsonrpc.jsonrpc_addr).await?;

            server::serve_both(
                server::Endpoint {
                    name: "REST",
                    listener: rest_listener,
                    router: rest_router,
                },
                server::Endpoint {
                    name: "JSON-RPC",
                    listener: jsonrpc_listener,
                    router: jsonrpc::router(),
                },
                cancel,
            )
            .await?;
        }
    }

    Ok(())
}
