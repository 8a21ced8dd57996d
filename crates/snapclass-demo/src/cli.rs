use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "snapclass-demo")]
#[command(author, version, about = "Drive the snapclass image classifier from the terminal")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Demo configuration file
    #[arg(short, long, default_value = "./snapclass.yaml", env = "SNAPCLASS_CONFIG")]
    pub config: String,

    /// Model registry YAML (defaults to the built-in catalog)
    #[arg(short, long)]
    pub registry: Option<PathBuf>,

    /// Inference device: cpu, cuda[:n], metal[:n]
    #[arg(short, long)]
    pub device: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read `model <id>`, `image <path>`, `status` and `quit` lines from stdin
    Interactive {
        /// Model to select on startup
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Select one model and classify the given images
    Classify {
        /// Model id
        #[arg(short, long)]
        model: Option<String>,

        /// Image files
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// List registered models
    Models,
}

impl Commands {
    /// Model requested on the command line, if any
    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Interactive { model } | Self::Classify { model, .. } => model.as_deref(),
            Self::Models => None,
        }
    }
}
