use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cluster_bench::config::Config;
use cluster_bench::driver::{LoadDriver, Target};
use cluster_bench::state::{self, TerraformState};
use cluster_bench::{report, responder, telemetry};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "cluster-bench")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// debug logging as default instead of info; use RUST_LOG for more options
    #[arg(long, short = 'v', default_value_t = false, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Drive the two-worker load pattern against each cluster behind ADDRESS
    Drive(DriveCommand),
    /// Run the minimal web responder
    Serve,
    /// Print the load balancer address from a Terraform state file
    Resolve(ResolveCommand),
}

#[derive(Debug, clap::Args)]
struct DriveCommand {
    /// base address of the load balancer (host[:port])
    #[arg(value_name = "ADDRESS")]
    address: String,

    /// cluster path suffix to hit; repeat the flag for multiple clusters
    #[arg(
        long = "cluster",
        value_name = "PATH",
        default_values_t = vec!["/cluster1".to_string(), "/cluster2".to_string()]
    )]
    clusters: Vec<String>,
}

#[derive(Debug, clap::Args)]
struct ResolveCommand {
    /// path to the Terraform state file
    #[arg(value_name = "STATE_FILE")]
    state_file: PathBuf,

    /// also print target group and instance identifiers
    #[arg(long, default_value_t = false)]
    details: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.verbose);

    match cli.command {
        Command::Drive(cmd) => drive(cmd).await,
        Command::Serve => serve().await,
        Command::Resolve(cmd) => resolve(cmd),
    }
}

async fn drive(cmd: DriveCommand) -> Result<()> {
    let cfg = Config::load()?;
    info!(address = %cmd.address, "load balancer address");

    let driver = LoadDriver::new(cfg.driver)?;
    let targets: Vec<Target> = cmd
        .clusters
        .iter()
        .map(|cluster| Target::new(&cmd.address, cluster))
        .collect();

    let reports = driver.run_all(&targets).await;
    report::print_summary(&reports);

    let failed_clusters = reports.iter().filter(|r| r.has_failure()).count();
    if failed_clusters > 0 {
        anyhow::bail!("{failed_clusters} cluster run(s) had a failed worker");
    }
    Ok(())
}

async fn serve() -> Result<()> {
    let cfg = Config::load()?;
    responder::serve(&cfg.responder).await
}

fn resolve(cmd: ResolveCommand) -> Result<()> {
    let tfstate = TerraformState::from_path(&cmd.state_file)?;
    println!("{}", tfstate.load_balancer_address()?);

    if cmd.details {
        for name in state::CLUSTER_TARGET_GROUPS {
            match tfstate.target_group_arn_suffix(name) {
                Ok(suffix) => println!("{name}: {suffix}"),
                Err(err) => info!(target_group = name, error = %err, "skipping target group"),
            }
        }
        for attachment in tfstate.attachment_resources() {
            println!("{}: {}", attachment.name(), attachment.target_ids().join(", "));
        }
    }
    Ok(())
}
