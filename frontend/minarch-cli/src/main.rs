use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use minarch_native_driver::{HeadlessPlatform, LaunchOptions, Session};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "minarch", version, about = "Retro emulator frontend for handheld devices")]
struct Args {
    /// Emulator module path (libretro-style shared object)
    core: PathBuf,

    /// ROM path; .zip archives are extracted automatically
    rom: PathBuf,

    /// Userdata root (bios/saves/states/config); defaults to the per-core
    /// directory under the OS local data dir
    #[arg(long)]
    userdata: Option<PathBuf>,

    /// Run the emulator on a worker thread
    #[arg(long)]
    threaded: bool,

    /// Reduced menu (Options becomes Reset)
    #[arg(long)]
    simple: bool,

    /// Logical display width when no device backend is linked
    #[arg(long, default_value_t = 640)]
    display_width: u32,

    /// Logical display height when no device backend is linked
    #[arg(long, default_value_t = 480)]
    display_height: u32,
}

fn run(args: &Args) -> anyhow::Result<()> {
    // Device backends implement the platform trait over their display and
    // input stacks; the reference binary runs against the headless backend
    let platform = HeadlessPlatform::new(args.display_width, args.display_height);

    let options = LaunchOptions {
        core_path: args.core.clone(),
        rom_path: args.rom.clone(),
        userdata_dir: args.userdata.clone(),
        threaded: args.threaded,
        simple_mode: args.simple,
    };

    let mut session = Session::launch(platform, &options)
        .with_context(|| format!("launching '{}'", args.rom.display()))?;
    session.run().context("frame loop")?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
