//! webapp-stager - stage Spring web applications for Cloud Foundry

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use webapp_stager::dom::{QueryContext, DOCUMENT_NODE};
use webapp_stager::stage::{load_descriptor, Stager};
use webapp_stager::xpath::{self, XPathValue};
use webapp_stager::{script, StagingConfig};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// webapp-stager - Spring web application staging
#[derive(Parser, Debug)]
#[command(name = "webapp-stager")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stage an exploded application into a runnable droplet
    Stage {
        /// Application directory (contains WEB-INF/web.xml)
        #[arg(long)]
        app: PathBuf,

        /// Staged output directory
        #[arg(long)]
        out: PathBuf,

        /// JVM heap size in megabytes
        #[arg(long)]
        memory: Option<u32>,

        /// Auto-reconfiguration library jar
        #[arg(long)]
        autoreconfig_jar: Option<PathBuf>,

        /// Staging configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Reconfigure a web.xml and print the result
    Reconfigure {
        /// Descriptor to reconfigure
        file: PathBuf,

        /// Rewrite the file instead of printing
        #[arg(long)]
        in_place: bool,

        /// Staging configuration file (TOML) with policy overrides
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the startup script
    Script {
        /// JVM heap size in megabytes
        #[arg(long, default_value_t = script::DEFAULT_MEMORY_MB)]
        memory: u32,
    },

    /// Evaluate an XPath query against a descriptor
    ///
    /// Elements of a namespaced descriptor are addressed with the `xmlns`
    /// prefix, e.g. `/xmlns:web-app/xmlns:servlet`.
    Query {
        /// Descriptor to query
        file: PathBuf,

        /// XPath expression
        xpath: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Stage {
            app,
            out,
            memory,
            autoreconfig_jar,
            config,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(memory) = memory {
                config = config.with_memory(memory);
            }
            if let Some(jar) = autoreconfig_jar {
                config = config.with_autoreconfig_jar(jar);
            }

            let staged = Stager::new(config)
                .stage(&app, &out)
                .with_context(|| format!("failed to stage {}", app.display()))?;
            println!("Staged {} into {}", app.display(), staged.root.display());
            for rule in &staged.changed {
                println!("  applied {}", rule);
            }
        }

        Commands::Reconfigure {
            file,
            in_place,
            config,
        } => {
            let stager = Stager::new(load_config(config.as_deref())?);
            if in_place {
                let changed = stager
                    .reconfigure_file(&file)
                    .with_context(|| format!("failed to reconfigure {}", file.display()))?;
                if changed.is_empty() {
                    println!("{} already reconfigured", file.display());
                } else {
                    println!("Reconfigured {} ({})", file.display(), changed.join(", "));
                }
            } else {
                let xml = fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))?;
                let out = stager
                    .reconfigure_str(&xml, &file)
                    .with_context(|| format!("failed to reconfigure {}", file.display()))?;
                print!("{}", out);
            }
        }

        Commands::Script { memory } => {
            if memory == 0 {
                bail!("--memory must be greater than zero");
            }
            print!("{}", script::render(memory));
        }

        Commands::Query { file, xpath: expr } => {
            let doc = load_descriptor(&file).with_context(|| format!("failed to load {}", file.display()))?;
            let namespaces = QueryContext::for_document(&doc);
            let value = xpath::evaluate(&doc, &namespaces, DOCUMENT_NODE, &expr)
                .with_context(|| format!("failed to evaluate '{}'", expr))?;

            match value {
                XPathValue::NodeSet(nodes) => {
                    for node in nodes {
                        println!("{}", doc.string_value(node).trim());
                    }
                }
                XPathValue::Strings(values) => {
                    for value in values {
                        println!("{}", value);
                    }
                }
                other => println!("{}", other.to_string_value(&doc)),
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<StagingConfig> {
    match path {
        Some(path) => {
            StagingConfig::from_file(path).with_context(|| format!("failed to load config {}", path.display()))
        }
        None => Ok(StagingConfig::default()),
    }
}
