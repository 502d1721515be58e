use anyhow::Result;
use clap::Parser;
use rmcp::{ServiceExt, transport::stdio};
use savant::{
    cli::{self, Cli, Mode},
    config::Config,
    http::start_http_server,
    logging::init_tracing,
    server::SavantServer,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let mode = args.mode();

    let mut config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    init_tracing(&config, mode == Mode::Mcp);
    config.log_load_notes();

    match mode {
        Mode::Banner => {
            cli::print_banner(&mut std::io::stdout())?;
        }
        Mode::Mcp => {
            info!("Starting savant MCP server on stdio");
            let server = SavantServer::new(config)?;
            let service = server.serve(stdio()).await.map_err(|e| {
                eprintln!("Failed to start MCP service: {}", e);
                e
            })?;
            info!("MCP server ready");
            service.waiting().await?;
        }
        Mode::Web { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            let server = SavantServer::new(config)?;
            start_http_server(server).await?;
        }
        Mode::Solve {
            problem,
            show_program,
        } => {
            let max_rounds = config.cli.max_clarifications;
            let server = SavantServer::new(config)?;
            let stdin = std::io::stdin();
            let code = cli::run_interactive(
                server.solver.as_ref(),
                &problem,
                max_rounds,
                show_program,
                &mut stdin.lock(),
                &mut std::io::stdout(),
                &mut std::io::stderr(),
            )
            .await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}
