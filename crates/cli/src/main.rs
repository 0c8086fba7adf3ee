//! Chunkwise CLI - drives batch jobs to completion over JSON-RPC
//!
//! `run` keeps invoking `batch.process.v1` until the daemon stops asking for
//! another round, waiting `retry_after_ms` between calls.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9627";

#[derive(Parser)]
#[command(name = "chunkwise")]
#[command(about = "Chunkwise batch engine CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "CHUNKWISE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Access token presented to the daemon
    #[arg(long, env = "CHUNKWISE_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(clap::Args, Clone)]
struct JobArgs {
    /// Job identifier (e.g. "User Import")
    #[arg(short, long)]
    identifier: String,

    /// Sub-scope (tenant) the job runs in
    #[arg(long)]
    scope: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a job until every item is processed
    Run {
        #[command(flatten)]
        job: JobArgs,

        /// Registered job type (e.g. json_import)
        #[arg(short = 't', long)]
        job_type: String,

        /// Job parameters as JSON (e.g. '{"path": "users.json"}')
        #[arg(short, long, default_value = "{}")]
        params: String,

        /// Items to process per invocation
        #[arg(short, long)]
        batch_size: Option<i64>,

        /// Discard any checkpoint or completion marker first
        #[arg(long)]
        restart: bool,

        /// Run a single invocation and stop
        #[arg(long)]
        once: bool,

        /// Print the HTML status page instead of the message (implies --once)
        #[arg(long)]
        html: bool,
    },

    /// Show a job's persisted state
    Status {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Forget a job's checkpoint and completion marker
    Reset {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Tail a job's log
    Logs {
        #[command(flatten)]
        job: JobArgs,

        /// Number of lines to tail
        #[arg(short = 'n', long, default_value = "100")]
        lines: usize,
    },

    /// Run maintenance operations
    Maintenance {
        /// Force VACUUM even if not needed
        #[arg(long)]
        force_vacuum: bool,
    },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize)]
struct Invocation {
    message: String,
    processed: usize,
    remaining: usize,
    #[serde(rename = "continue")]
    keep_going: bool,
    retry_after_ms: u64,
    #[serde(default)]
    stalled: bool,
    log_path: Option<String>,
    html: Option<String>,
}

#[derive(Tabled)]
struct StatusRow {
    identifier: String,
    phase: String,
    remaining: String,
    invocations: String,
    processed_total: String,
}

struct RpcClient {
    url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl RpcClient {
    fn new(url: String, token: Option<String>) -> Self {
        Self {
            url,
            token,
            http: reqwest::Client::new(),
        }
    }

    async fn call(&self, method: &str, mut params: serde_json::Value) -> Result<serde_json::Value> {
        if let (Some(token), Some(map)) = (&self.token, params.as_object_mut()) {
            map.insert("token".to_string(), json!(token));
        }

        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: 1,
        };

        let response: JsonRpcResponse = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .context("Failed to connect to daemon")?
            .json()
            .await
            .context("Failed to parse response")?;

        if let Some(error) = response.error {
            anyhow::bail!("RPC error ({}): {}", error.code, error.message);
        }

        response
            .result
            .ok_or_else(|| anyhow::anyhow!("No result in response"))
    }
}

fn job_params(job: &JobArgs) -> serde_json::Value {
    json!({
        "identifier": job.identifier,
        "scope": job.scope,
    })
}

/// Params for one `batch.process.v1` call. `restart` is only sent with the
/// first call, otherwise every round would start over.
fn process_params(
    job: &JobArgs,
    job_type: &str,
    params: &serde_json::Value,
    batch_size: Option<i64>,
    restart: bool,
    first: bool,
    html: bool,
) -> serde_json::Value {
    let mut value = job_params(job);
    if let Some(map) = value.as_object_mut() {
        map.insert("job_type".to_string(), json!(job_type));
        map.insert("params".to_string(), params.clone());
        map.insert("batch_size".to_string(), json!(batch_size));
        map.insert("restart".to_string(), json!(restart && first));
        map.insert("format".to_string(), json!(if html { "html" } else { "json" }));
    }
    value
}

#[allow(clippy::too_many_arguments)]
async fn run_job(
    client: &RpcClient,
    job: &JobArgs,
    job_type: &str,
    params: &str,
    batch_size: Option<i64>,
    restart: bool,
    once: bool,
    html: bool,
) -> Result<()> {
    let params: serde_json::Value =
        serde_json::from_str(params).context("Invalid JSON params")?;
    let once = once || html;
    let mut first = true;
    let mut total = 0usize;

    loop {
        let request = process_params(job, job_type, &params, batch_size, restart, first, html);
        let result = client.call("batch.process.v1", request).await?;
        let invocation: Invocation = serde_json::from_value(result)?;
        first = false;
        total += invocation.processed;

        if let Some(page) = &invocation.html {
            println!("{}", page);
        } else if invocation.stalled {
            println!("{}", invocation.message.yellow());
        } else if invocation.keep_going {
            println!("{}", invocation.message);
        } else {
            println!("{}", invocation.message.green().bold());
        }

        if !invocation.keep_going || once {
            if !invocation.keep_going && !once {
                println!("  {} {} items processed", "✓".green(), total);
            }
            if let Some(path) = invocation.log_path {
                println!("  {} {}", "Log:".bold(), path);
            }
            if invocation.keep_going {
                println!("  {} {} items remaining", "○".bold(), invocation.remaining);
            }
            return Ok(());
        }

        tokio::time::sleep(Duration::from_millis(invocation.retry_after_ms)).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = RpcClient::new(cli.rpc_url.clone(), cli.token.clone());

    match cli.command {
        Commands::Run {
            job,
            job_type,
            params,
            batch_size,
            restart,
            once,
            html,
        } => {
            run_job(
                &client, &job, &job_type, &params, batch_size, restart, once, html,
            )
            .await?;
        }

        Commands::Status { job } => {
            let status = client.call("batch.status.v1", job_params(&job)).await?;
            let progress = &status["progress"];

            let row = StatusRow {
                identifier: status["identifier"].as_str().unwrap_or_default().to_string(),
                phase: status["phase"].as_str().unwrap_or_default().to_string(),
                remaining: status["remaining"].to_string(),
                invocations: progress["invocations"].to_string(),
                processed_total: progress["processed_total"].to_string(),
            };
            println!("{}", Table::new(vec![row]));

            if progress["stalled_invocations"].as_u64().unwrap_or(0) > 0 {
                println!(
                    "  {} no progress in the last {} invocations",
                    "!".yellow().bold(),
                    progress["stalled_invocations"]
                );
            }
        }

        Commands::Reset { job } => {
            let result = client.call("batch.reset.v1", job_params(&job)).await?;
            if result["cleared"].as_bool().unwrap_or(false) {
                println!("{}", format!("✓ Job {} reset", job.identifier).green().bold());
            } else {
                println!("{}", format!("Job {} had no stored state", job.identifier).yellow());
            }
        }

        Commands::Logs { job, lines } => {
            let mut params = job_params(&job);
            params["lines"] = json!(lines);

            let result = client.call("logs.tail.v1", params).await?;
            let lines = result["lines"].as_array().cloned().unwrap_or_default();

            if lines.is_empty() {
                println!("{}", "No logs available".yellow());
            } else {
                println!("{}", format!("Logs for job {}:", job.identifier).cyan().bold());
                for line in lines {
                    println!("{}", line.as_str().unwrap_or_default());
                }
            }
        }

        Commands::Maintenance { force_vacuum } => {
            println!("{}", "Running maintenance...".cyan().bold());

            let result = client
                .call("admin.maintenance.v1", json!({ "force_vacuum": force_vacuum }))
                .await?;

            if result["vacuum_run"].as_bool().unwrap_or(false) {
                println!("  {} VACUUM executed", "✓".green());
            } else {
                println!("  ○ VACUUM skipped (not needed)");
            }
            println!(
                "  {} {} expired checkpoints deleted",
                "✓".green(),
                result["expired_checkpoints_deleted"]
            );
            println!("  ○ {} completed jobs on record", result["completed_jobs"]);
            let mb = |key: &str| result[key].as_i64().unwrap_or(0) as f64 / (1024.0 * 1024.0);
            println!(
                "  {} {:.2} MB → {:.2} MB",
                "DB Size:".bold(),
                mb("db_size_before"),
                mb("db_size_after")
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> JobArgs {
        JobArgs {
            identifier: "User Import".to_string(),
            scope: None,
        }
    }

    #[test]
    fn test_restart_only_on_first_call() {
        let params = json!({"path": "users.json"});
        let first = process_params(&job(), "json_import", &params, Some(2), true, true, false);
        let later = process_params(&job(), "json_import", &params, Some(2), true, false, false);

        assert_eq!(first["restart"], json!(true));
        assert_eq!(later["restart"], json!(false));
        assert_eq!(later["batch_size"], json!(2));
        assert_eq!(later["params"]["path"], json!("users.json"));
        assert_eq!(later["format"], json!("json"));
    }

    #[test]
    fn test_invocation_wire_format() {
        let invocation: Invocation = serde_json::from_value(json!({
            "identifier": "User Import",
            "message": "Finished processing all items.",
            "processed": 1,
            "remaining": 0,
            "continue": false,
            "retry_after_ms": 0,
            "stalled_invocations": 0,
            "stalled": false,
            "completed_at": 1,
            "memory": {"peak_bytes": 1, "limit_bytes": null},
            "log_path": "/tmp/batch_user-import.log",
        }))
        .unwrap();

        assert!(!invocation.keep_going);
        assert_eq!(invocation.remaining, 0);
        assert!(invocation.html.is_none());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "chunkwise",
            "run",
            "-i",
            "User Import",
            "-t",
            "json_import",
            "-b",
            "2",
            "--restart",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run {
                batch_size: Some(2),
                restart: true,
                ..
            }
        ));
    }
}
