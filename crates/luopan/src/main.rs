use anyhow::Context as _;
use bearing::{HeadingFeed, HeadingSensor, ManualOnly};
use clap::{Parser, Subcommand};
use luopan::analysis;
use luopan::config::{self, SensorKind};
use luopan::engine::{CompassEngine, CompassLayout};
use luopan::gui::app::{AppInit, AppModel};
use luopan::orientation::OrientationController;
use luopan::render::{CairoSurface, CompassRenderer};
use luopan::sys::runtime;
use luopan::theme::{self, ThemeName};
use relm4::prelude::*;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Parser, Debug)]
#[command(version, about = "Feng shui compass", long_about = None)]
struct Args {
    /// Run as a layer-shell overlay that starts hidden
    #[arg(long)]
    overlay: bool,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Print the sector reading for a heading in degrees
    Analyze {
        #[arg(allow_negative_numbers = true)]
        angle: f64,
    },
    /// Render the compass to a PNG without opening a window
    Render {
        /// Dial rotation in degrees
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        angle: f64,
        /// Theme to use instead of the configured one
        #[arg(long)]
        theme: Option<ThemeName>,
        /// Image width and height in pixels
        #[arg(long, default_value_t = 480)]
        size: i32,
        #[arg(short, long, default_value = "luopan.png")]
        out: PathBuf,
    },
    /// Write the default config file if none exists
    InitConfig,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Some(Mode::Analyze { angle }) => {
            print_analysis(angle);
            Ok(())
        }
        Some(Mode::Render {
            angle,
            theme,
            size,
            out,
        }) => render_png(angle, theme, size, &out),
        Some(Mode::InitConfig) => {
            let path = config::write_default_config()?;
            println!("{}", path.display());
            Ok(())
        }
        None => run_gui(args.overlay),
    }
}

fn print_analysis(angle: f64) {
    let a = analysis::analyze(angle);
    println!("heading      {:.1}°", a.angle);
    println!(
        "mountain     {} ({}, {})",
        a.sector24.mountain.name, a.sector24.mountain.trigram, a.sector24.mountain.element
    );
    println!(
        "palace       {} {}",
        a.sector8.trigram.hanzi(),
        a.sector8.trigram.direction()
    );
    println!("sitting      坐{}向{}", a.sitting.name, a.facing.name);
    println!(
        "reading      {} ({:.0}%)",
        a.classification,
        a.confidence * 100.0
    );
    println!();
    println!("{}", a.narrative);
    for s in &a.suggestions {
        println!("  - {}", s);
    }
}

fn render_png(
    angle: f64,
    theme_name: Option<ThemeName>,
    size: i32,
    out: &std::path::Path,
) -> anyhow::Result<()> {
    let config = config::load_or_default();
    theme::install(config.theme_registry());
    let theme = theme::lookup(theme_name.unwrap_or(config.theme));

    let layout = CompassLayout::fit(size as f64, size as f64)
        .with_context(|| format!("{}px is too small for the compass", size))?;
    let mut engine = CompassEngine::new(layout);
    for warning in engine.set_compass_data(config.ring_specs()) {
        log::warn!("{}", warning);
    }

    let surface = cairo::ImageSurface::create(cairo::Format::ARgb32, size, size)?;
    let cr = cairo::Context::new(&surface)?;
    let report = CompassRenderer::new(theme).render(&engine, &mut CairoSurface::new(&cr), angle);
    for phase in report.failed_phases() {
        log::warn!("Phase {} failed", phase);
    }
    drop(cr);

    let mut file = fs_err::File::create(out)?;
    surface
        .write_to_png(&mut file)
        .with_context(|| format!("writing {}", out.display()))?;
    println!("{}", out.display());
    Ok(())
}

fn run_gui(overlay: bool) -> anyhow::Result<()> {
    let config = config::load_or_default();
    theme::install(config.theme_registry());

    let feed = HeadingFeed::open();
    let sensor: Rc<dyn HeadingSensor> = match config.orientation.sensor {
        SensorKind::Feed => Rc::new(feed.clone()),
        SensorKind::Manual => Rc::new(ManualOnly),
    };
    let settings = config.orientation_settings(&theme::lookup(config.theme));
    let controller = OrientationController::new(sensor, settings)?;

    let (tx, rx) = async_channel::bounded(32);

    // Start Background Services
    runtime::start_background_services(tx.clone())?;

    let app = RelmApp::new("org.troia.luopan").with_args(Vec::new());

    app.run::<AppModel>(AppInit {
        config,
        overlay,
        controller,
        feed,
        rx,
    });
    Ok(())
}
