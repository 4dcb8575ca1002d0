use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

#[derive(Parser, Debug, Clone)]
#[command(name = "petalcard")]
#[command(about = "Terminal greeting card: rising hearts, falling petals, a story and a promise", long_about = None)]
pub struct Args {
    /// Frame rate cap. Particle speeds are per frame, so this also sets their pace.
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Seed for particle randomness (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// JSON file with the card text
    #[arg(long)]
    pub card: Option<PathBuf>,

    /// Music track handed to the player program
    #[arg(long)]
    pub music: Option<PathBuf>,

    /// Player program used for --music
    #[arg(long)]
    pub player: Option<String>,

    /// Write logs to this file (the terminal itself is the UI)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Simulate without a terminal and print particle statistics
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    /// Frames to simulate in headless mode
    #[arg(long, default_value_t = 600)]
    pub frames: u64,

    /// Headless surface width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Headless surface height in pixels
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Burst hearts on this headless frame
    #[arg(long)]
    pub burst_at: Option<u64>,
}

impl Args {
    pub fn fps(&self) -> u32 {
        self.fps.clamp(15, 240)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read card file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("card file {} is not valid card JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StorySection {
    pub heading: String,
    pub body: String,
}

/// Everything the card says. Fields missing from a card file keep their
/// defaults.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CardContent {
    pub title: String,
    pub subtitle: String,
    pub story: Vec<StorySection>,
    pub question: String,
    pub promise_title: String,
    pub promise: String,
    pub closing: String,
}

impl Default for CardContent {
    fn default() -> Self {
        let section = |heading: &str, body: &str| StorySection {
            heading: heading.to_string(),
            body: body.to_string(),
        };
        Self {
            title: "For You, With Love".to_string(),
            subtitle: "a little card that keeps blooming".to_string(),
            story: vec![
                section(
                    "The first hello",
                    "It started with a conversation that ran long past closing time, \
                     and a walk home that somehow took the scenic route twice.",
                ),
                section(
                    "The ordinary days",
                    "Grocery lists, burnt toast, rain on the window. The plain days \
                     turned out to be the ones worth keeping.",
                ),
                section(
                    "The hard days",
                    "When things went sideways you stayed. That is the part of the story \
                     I tell myself when I need reminding what matters.",
                ),
            ],
            question: "So, one more question before the petals settle…".to_string(),
            promise_title: "A promise".to_string(),
            promise: "To keep choosing you on the loud days and the quiet ones, \
                      to keep the kettle on, and to keep making room for more stories like these."
                .to_string(),
            closing: "Always yours.".to_string(),
        }
    }
}

pub fn load_card(path: &Path) -> Result<CardContent, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
