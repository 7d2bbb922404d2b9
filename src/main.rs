use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use ezdump::{EnrichOptions, ProxyMode};

/// summarize an Envoy admin config dump
#[derive(Parser, Debug)]
#[command(version)]
struct CliArgs {
    /// The config dump to read, as fetched from the admin /config_dump
    /// endpoint. Use `-` to read from stdin.
    input: PathBuf,

    /// Classify resources with Istio naming conventions.
    #[arg(long)]
    mesh: bool,

    /// Override the proxy mode instead of inferring it from the bootstrap
    /// node id. Implies --mesh.
    #[arg(long, value_enum)]
    proxy_mode: Option<ProxyModeArg>,

    /// Print the summary as a single line of JSON.
    #[arg(long)]
    compact: bool,

    /// Log in a pretty, human-readable format.
    #[arg(long)]
    log_pretty: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProxyModeArg {
    Sidecar,
    Gateway,
}

impl From<ProxyModeArg> for ProxyMode {
    fn from(arg: ProxyModeArg) -> Self {
        match arg {
            ProxyModeArg::Sidecar => ProxyMode::Sidecar,
            ProxyModeArg::Gateway => ProxyMode::Gateway,
        }
    }
}

fn main() {
    let args = CliArgs::parse();
    setup_tracing(args.log_pretty);

    if let Err(e) = run(&args) {
        tracing::error!(err = ?e, "exiting: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: &CliArgs) -> anyhow::Result<()> {
    let bytes = read_input(&args.input)?;

    let snapshot = ezdump::decode(&bytes)
        .with_context(|| format!("failed to decode {}", args.input.display()))?;
    let mut summary = ezdump::summarize(&snapshot);

    if args.mesh || args.proxy_mode.is_some() {
        let options = EnrichOptions {
            proxy_mode: args.proxy_mode.map(ProxyMode::from),
        };
        ezdump::enrich_with(&mut summary, &options);
    }

    let output = if args.compact {
        serde_json::to_string(&summary)?
    } else {
        serde_json::to_string_pretty(&summary)?
    };
    println!("{output}");

    Ok(())
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("failed to read stdin")?;
        return Ok(bytes);
    }

    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn setup_tracing(log_pretty: bool) {
    let default_log_filter = "ezdump=info"
        .parse()
        .expect("default log filter must be valid");
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_log_filter)
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_target(true);

    if log_pretty {
        // don't use .pretty(), it's too pretty
        builder.init();
    } else {
        builder
            .json()
            .flatten_event(true)
            .with_span_list(false)
            .init();
    }
}
