// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

use agb_adapter::Adapter;
use agb_bench::{BenchConfig, Driver};
use agb_server::AgentService;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "agui-bench", version, about = "AG-UI adapter fleet and benchmark harness")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve one adapter over the AG-UI SSE endpoint.
    Serve {
        /// Which adapter to serve.
        #[arg(long, value_enum)]
        adapter: AdapterArg,

        /// Listening port (defaults to the adapter's conventional port).
        #[arg(long)]
        port: Option<u16>,

        /// Model override for the wrapped provider.
        #[arg(long)]
        model: Option<String>,
    },

    /// Run the benchmark suite against the configured agent fleet.
    Bench {
        /// TOML config overriding the built-in agent/prompt tables.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Repetitions per (agent, prompt) pair.
        #[arg(long)]
        runs: Option<u32>,

        /// Artifact output root.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Generate markdown reports from a benchmark run directory.
    Report {
        /// Run directory, or "latest" to pick the newest under the root.
        #[arg(default_value = "latest")]
        run_dir: String,

        /// TOML config (for endpoint metadata and pricing).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for the generated markdown.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Print a readable timeline from saved test data.
    Replay {
        /// Test, agent, or run directory.
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AdapterArg {
    Anthropic,
    Openai,
    Gemini,
    Cerebras,
    Mock,
}

impl AdapterArg {
    fn default_port(self) -> u16 {
        match self {
            AdapterArg::Mock => 7770,
            AdapterArg::Openai => 7775,
            AdapterArg::Anthropic => 7776,
            AdapterArg::Gemini => 7777,
            AdapterArg::Cerebras => 7778,
        }
    }

    fn build(self, model: Option<String>) -> Result<Arc<dyn Adapter>> {
        Ok(match self {
            AdapterArg::Anthropic => {
                let mut config = anthropic_bridge::config::AnthropicConfig::from_env()
                    .context("anthropic adapter configuration")?;
                if let Some(model) = model {
                    config = config.with_model(model);
                }
                Arc::new(anthropic_bridge::AnthropicAdapter::new(config))
            }
            AdapterArg::Openai => {
                let mut config = openai_bridge::config::OpenAiConfig::from_env()
                    .context("openai adapter configuration")?;
                if let Some(model) = model {
                    config = config.with_model(model);
                }
                Arc::new(openai_bridge::OpenAiAdapter::new(config))
            }
            AdapterArg::Gemini => {
                let mut config = gemini_bridge::GeminiConfig::from_env()
                    .context("gemini adapter configuration")?;
                if let Some(model) = model {
                    config = config.with_model(model);
                }
                Arc::new(gemini_bridge::GeminiAdapter::new(config))
            }
            AdapterArg::Cerebras => {
                let mut config = cerebras_bridge::CerebrasConfig::from_env()
                    .context("cerebras adapter configuration")?;
                if let Some(model) = model {
                    config.default_model = model;
                }
                Arc::new(cerebras_bridge::CerebrasAdapter::new(config))
            }
            AdapterArg::Mock => Arc::new(agb_adapter_mock::MockAdapter::new()),
        })
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<BenchConfig> {
    match path {
        Some(path) => {
            BenchConfig::from_toml_file(path).with_context(|| format!("load {}", path.display()))
        }
        None => Ok(BenchConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Serve {
            adapter,
            port,
            model,
        } => {
            let port = port.unwrap_or_else(|| adapter.default_port());
            let service = Arc::new(AgentService {
                adapter: adapter.build(model)?,
                port,
            });
            let addr: SocketAddr = ([0, 0, 0, 0], port).into();
            println!("AG-UI endpoint: POST http://localhost:{port}/agent");
            println!("Health:          GET http://localhost:{port}/health");
            agb_server::serve(service, addr).await.context("serve")?;
        }

        Commands::Bench { config, runs, out } => {
            let mut bench_config = load_config(config.as_ref())?;
            if let Some(runs) = runs {
                bench_config.num_runs = runs;
            }
            if let Some(out) = out {
                bench_config.output_root = out;
            }
            bench_config.validate().context("benchmark configuration")?;

            let report = Driver::new(bench_config).run().await?;
            let total: usize = report.metrics.values().map(Vec::len).sum();
            let passed: usize = report
                .metrics
                .values()
                .flatten()
                .filter(|m| m.success)
                .count();
            println!("Benchmark complete: {passed}/{total} tests passed");
            println!("Artifacts: {}", report.run_dir.display());
        }

        Commands::Report {
            run_dir,
            config,
            out,
        } => {
            let bench_config = load_config(config.as_ref())?;
            let run_path = if run_dir == "latest" {
                agb_report::latest_run_dir(&bench_config.output_root)
                    .context("no benchmark runs found")?
            } else {
                PathBuf::from(run_dir)
            };
            let written = agb_report::generate_reports(&run_path, &out, &bench_config)?;
            for path in written {
                println!("Generated: {}", path.display());
            }
        }

        Commands::Replay { path } => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            agb_replay::replay_path(&path, &mut lock)?;
        }
    }

    Ok(())
}
