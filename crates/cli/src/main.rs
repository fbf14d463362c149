//! gke-stack CLI - declare and provision private GKE clusters.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gke_stack::gcp::{render, ClusterStatus};
use gke_stack::{resolve_stack, Gcp, NodeServiceAccount, ResolvedStack, StackError, StackSpec};

/// Declare and provision a private GKE cluster and its IAM and firewall
/// resources from a TOML stack spec.
#[derive(Parser)]
#[command(name = "gke-stack")]
#[command(about = "Declare and provision private GKE clusters")]
struct Cli {
    /// Path to the stack spec TOML file.
    #[arg(long, short = 'c', default_value = "stack.toml")]
    config: PathBuf,

    /// `OAuth2` access token (or set `GCP_ACCESS_TOKEN`).
    #[arg(long, env = "GCP_ACCESS_TOKEN", default_value = "")]
    token: String,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the resolved stack as API request bodies.
    Plan,

    /// Create missing stack resources: service account, cluster, firewall.
    Apply {
        /// Wait for the cluster to reach RUNNING.
        #[arg(long, default_value = "false")]
        wait: bool,

        /// Wait timeout in seconds.
        #[arg(long, default_value = "1800")]
        timeout: u64,
    },

    /// Show cluster status.
    Status,

    /// Print a kubeconfig for the cluster.
    Credentials,

    /// Delete stack resources.
    Destroy {
        /// Skip confirmation.
        #[arg(long, short = 'y', default_value = "false")]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        config,
        token,
        verbose,
        command,
    } = Cli::parse();

    // Initialize logging
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let spec = StackSpec::from_path(&config)
        .with_context(|| format!("Failed to load stack spec from {}", config.display()))?;
    let stack = resolve_stack(&spec);

    match command {
        Commands::Plan => {
            let firewalls: Vec<_> = stack
                .firewall_rules
                .iter()
                .map(|rule| render::firewall_definition(rule, &stack))
                .collect();
            let plan = serde_json::json!({
                "cluster": render::cluster_body(&stack),
                "serviceAccount": render::service_account_body(&stack),
                "iamRoles": stack.iam_roles(),
                "firewalls": firewalls,
            });
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }

        Commands::Apply { wait, timeout } => {
            let gcp = client(&token, &stack)?;

            ensure_service_account(&gcp, &stack).await?;
            ensure_cluster(&gcp, &stack).await?;
            ensure_firewalls(&gcp, &stack).await?;

            if wait {
                println!("⏳ Waiting for cluster {} to be ready...", stack.cluster.name);
                let cluster = gcp.wait_cluster_ready(&stack.cluster.name, timeout).await?;
                println!(
                    "✅ Cluster {} is running (endpoint: {})",
                    cluster.name,
                    cluster.endpoint.unwrap_or_default()
                );
            } else {
                println!("✅ Apply complete for stack {}", stack.cluster.name);
            }
        }

        Commands::Status => {
            let gcp = client(&token, &stack)?;
            let cluster = gcp.get_cluster(&stack.cluster.name).await?;
            let status = ClusterStatus::from_api(&cluster.status);

            let status_emoji = match status {
                ClusterStatus::Running => "🟢",
                ClusterStatus::Creating | ClusterStatus::Updating => "🟡",
                ClusterStatus::Error | ClusterStatus::Deleting => "🔴",
                ClusterStatus::Unknown => "⚪",
            };

            println!("{} {} [{}]", status_emoji, cluster.name, status);
            println!(
                "   version: {} | endpoint: {} | nodes: {}",
                cluster.current_master_version.clone().unwrap_or_default(),
                cluster.endpoint.clone().unwrap_or_default(),
                cluster.current_node_count.unwrap_or(0)
            );
            if let Some(created) = cluster.created_at() {
                println!("   created: {created}");
            }
        }

        Commands::Credentials => {
            let gcp = client(&token, &stack)?;
            let kubeconfig = gcp.kubeconfig(&stack.cluster.name).await?;
            print!("{kubeconfig}");
        }

        Commands::Destroy { yes } => {
            if !yes {
                println!(
                    "⚠️  This deletes cluster {} and its stack resources in project {}.",
                    stack.cluster.name, stack.cluster.project
                );
                println!("   Use --yes to confirm.");
                return Ok(());
            }

            let gcp = client(&token, &stack)?;

            for rule in &stack.firewall_rules {
                gcp.delete_firewall(&rule.name).await?;
            }
            gcp.delete_cluster(&stack.cluster.name).await?;
            if let NodeServiceAccount::Managed { email, .. } = &stack.node_service_account {
                gcp.delete_service_account(email).await?;
            }

            println!("✅ Destroy initiated for stack {}", stack.cluster.name);
        }
    }

    Ok(())
}

fn client(token: &str, stack: &ResolvedStack) -> Result<Gcp> {
    if token.is_empty() {
        bail!("An access token is required; pass --token or set GCP_ACCESS_TOKEN");
    }
    Gcp::new(&stack.cluster.project, token, &stack.cluster.location)
        .context("Failed to create GCP client")
}

async fn ensure_service_account(gcp: &Gcp, stack: &ResolvedStack) -> Result<()> {
    let Some(body) = render::service_account_body(stack) else {
        info!(
            email = %stack.node_service_account.email(),
            "Using existing node service account"
        );
        return Ok(());
    };

    let email = stack.node_service_account.email();
    match gcp.get_service_account(email).await {
        Ok(_) => println!("   Service account {email} already exists"),
        Err(StackError::NotFound(_)) => {
            gcp.create_service_account(&body).await?;
            println!("✅ Service account {email} created");
        }
        Err(e) => return Err(e.into()),
    }

    gcp.grant_roles(email, stack.iam_roles()).await?;
    Ok(())
}

async fn ensure_cluster(gcp: &Gcp, stack: &ResolvedStack) -> Result<()> {
    let name = &stack.cluster.name;
    match gcp.get_cluster(name).await {
        Ok(cluster) => {
            println!(
                "   Cluster {name} already exists [{}]",
                ClusterStatus::from_api(&cluster.status)
            );
        }
        Err(StackError::NotFound(_)) => {
            gcp.create_cluster(&render::cluster_body(stack)).await?;
            println!("✅ Cluster {name} creation initiated");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn ensure_firewalls(gcp: &Gcp, stack: &ResolvedStack) -> Result<()> {
    for rule in &stack.firewall_rules {
        match gcp.get_firewall(&rule.name).await {
            Ok(_) => println!("   Firewall rule {} already exists", rule.name),
            Err(StackError::NotFound(_)) => {
                gcp.insert_firewall(&render::firewall_definition(rule, stack))
                    .await?;
                println!("✅ Firewall rule {} created", rule.name);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
