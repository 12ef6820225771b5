use physim::service::chat::generate_scene;
use physim::{export_csv, tracked_objects, HttpChatClient, RapierWorld, SceneConfig, Simulation};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "physim", about = "Unit-aware 2D physics scenes")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse and validate a scene file
    Validate { scene: PathBuf },

    /// Run a scene headless and print the outputs
    Run {
        scene: PathBuf,

        /// Simulated seconds to run
        #[arg(short, long, default_value_t = 5.0)]
        seconds: f64,

        /// Write recorded graph data for `--object` to this CSV file
        #[arg(long, requires = "object")]
        csv: Option<PathBuf>,

        /// Object whose graph lines are exported
        #[arg(long)]
        object: Option<String>,

        /// Line labels to export (default: every line of the object)
        #[arg(long, value_delimiter = ',')]
        lines: Vec<String>,
    },

    /// Open the interactive viewer
    View { scene: PathBuf },

    /// Ask the chat endpoint for a scene
    Generate {
        #[arg(short, long)]
        prompt: String,

        /// Existing scene to edit instead of starting fresh
        #[arg(long)]
        from: Option<PathBuf>,

        /// Output file (stdout when absent)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

// load here to keep main clean
fn load_scene(path: &Path) -> Result<SceneConfig> {
    SceneConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

fn load_simulation(path: &Path) -> Result<Simulation<RapierWorld>> {
    let cfg = load_scene(path)?;
    let mut sim = Simulation::new(RapierWorld::default());
    sim.load(cfg)?;
    Ok(sim)
}

fn run(path: &Path, seconds: f64, csv: Option<PathBuf>, object: Option<String>, lines: Vec<String>) -> Result<()> {
    let mut sim = load_simulation(path)?;
    let step = sim.step_ms();
    let mut now = 0.0;
    sim.frame(now)?;
    sim.play()?;
    while sim.sim_time() < seconds {
        now += step;
        sim.frame(now)?;
    }
    info!("ran {} ticks ({:.3}s)", sim.ticks(), sim.sim_time());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "t = {:.3} s", sim.sim_time())?;
    for reading in sim.outputs() {
        match &reading.group {
            Some(group) => writeln!(out, "[{group}] {reading}")?,
            None => writeln!(out, "{reading}")?,
        }
    }

    if let (Some(file), Some(object)) = (csv, object) {
        let lines = if lines.is_empty() {
            tracked_objects(sim.graphs())
                .remove(&object)
                .with_context(|| format!("no graph tracks {object}"))?
        } else {
            lines
        };
        let writer = File::create(&file).with_context(|| format!("creating {}", file.display()))?;
        let rows = export_csv(sim.graphs(), &object, &lines, writer)?;
        writeln!(out, "wrote {rows} rows to {}", file.display())?;
    }
    Ok(())
}

#[cfg(feature = "viewer")]
fn view(path: &Path) -> Result<()> {
    physim::run_viewer(load_simulation(path)?);
    Ok(())
}

#[cfg(not(feature = "viewer"))]
fn view(_path: &Path) -> Result<()> {
    bail!("built without the `viewer` feature")
}

fn generate(prompt: &str, from: Option<PathBuf>, out: Option<PathBuf>) -> Result<()> {
    let existing = from.as_deref().map(load_scene).transpose()?;
    let client = HttpChatClient::from_env()?;
    let scene = generate_scene(&client, prompt, existing.as_ref())?;
    let json = scene.to_json_pretty()?;
    match out {
        Some(file) => std::fs::write(&file, json).with_context(|| format!("writing {}", file.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match args.command {
        Command::Validate { scene } => {
            let cfg = load_scene(&scene)?;
            for (site, target) in cfg.dangling_references() {
                println!("warning: {site} targets unknown object `{target}`");
            }
            println!("{}: ok ({} objects)", cfg.title, cfg.objects.len());
        }
        Command::Run { scene, seconds, csv, object, lines } => {
            if !(seconds.is_finite() && seconds >= 0.0) {
                bail!("--seconds must be a non-negative number");
            }
            run(&scene, seconds, csv, object, lines)?;
        }
        Command::View { scene } => view(&scene)?,
        Command::Generate { prompt, from, out } => generate(&prompt, from, out)?,
    }
    Ok(())
}
