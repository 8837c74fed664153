use anyhow::Result;
use clap::{Parser, Subcommand};
use drive::{capture, config::DriveConfig, train, write_default_config, TrainOptions};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train the DQN agent on the sandbox simulator
    Train {
        /// YAML configuration, defaults are used if not given
        #[arg(long)]
        config: Option<String>,

        /// Directory of checkpoints, the final model and logs
        #[arg(long)]
        model_dir: Option<String>,

        /// Number of episodes
        #[arg(long)]
        episodes: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// Write records for Tensorboard under the model directory
        #[arg(long, default_value_t = false)]
        tensorboard: bool,
    },

    /// Save camera frames from a static position in the simulator
    Capture {
        #[arg(long)]
        config: Option<String>,

        /// Directory in which frames are saved
        #[arg(long)]
        out_dir: Option<String>,

        /// Type pattern of the actor above which the camera is placed
        #[arg(long)]
        selector: Option<String>,

        /// Capture duration in seconds
        #[arg(long, default_value_t = 10.0)]
        secs: f32,
    },

    /// Write the default configuration
    Config {
        #[arg(long, default_value = "drive.yaml")]
        out: String,
    },
}

fn load_config(path: &Option<String>) -> Result<DriveConfig> {
    match path {
        Some(path) => DriveConfig::load(path),
        None => Ok(DriveConfig::default()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Train {
            config,
            model_dir,
            episodes,
            seed,
            tensorboard,
        } => {
            let config = load_config(&config)?;
            let opts = TrainOptions {
                model_dir,
                n_episodes: episodes,
                seed,
                tensorboard,
            };
            train(&config, &opts)?;
        }
        Command::Capture {
            config,
            out_dir,
            selector,
            secs,
        } => {
            let config = load_config(&config)?;
            capture(
                &config.env.client,
                &config.capture,
                out_dir.as_deref(),
                selector.as_deref(),
                secs,
            )?;
        }
        Command::Config { out } => {
            write_default_config(&out)?;
            log::info!("Wrote the default configuration to {}", out);
        }
    }

    Ok(())
}
