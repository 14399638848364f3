use clap::{Args, Parser, Subcommand};
use sigscope::config::Config;
use sigscope::converter::SignalConverter;
use sigscope::store::BinaryStore;
use sigscope::worker::{Worker, WorkerEvent};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sigscope",
    version,
    about = "Signal recording conversion and inspection utilities"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a CSV signal recording into the flat binary format
    Convert(ConvertArgs),
    /// Show the shape of a binary signal file
    Info(InfoArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Source CSV file
    source: PathBuf,

    /// Target binary file (defaults to the source with a .bin suffix)
    target: Option<PathBuf>,
}

#[derive(Args)]
struct InfoArgs {
    /// Binary signal file
    file: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("falling back to default configuration: {}", e);
        Config::default()
    });

    let exit_code = match cli.command {
        Command::Convert(args) => run_convert(args, config),
        Command::Info(args) => run_info(args, config),
    };

    std::process::exit(exit_code);
}

fn run_convert(args: ConvertArgs, mut config: Config) -> i32 {
    let source = args.source;
    let target = args
        .target
        .unwrap_or_else(|| source.with_extension("bin"));

    let converter = SignalConverter::new(&config);
    let worker = {
        let source = source.clone();
        let target = target.clone();
        Worker::spawn(move |scope| converter.convert(&source, &target, scope, scope.cancel_token()))
    };

    // The progress channel closes when the conversion ends; the terminal
    // events are queued behind it.
    for percent in worker.progress().iter() {
        eprint!("\rconverting {:>3}%", percent);
    }
    eprintln!();

    let mut exit_code = 1;
    for event in worker.events().iter() {
        match event {
            WorkerEvent::Result(true) => {
                println!("wrote {}", target.display());
                exit_code = 0;
            }
            WorkerEvent::Result(false) => {
                eprintln!("conversion cancelled, no file written");
            }
            WorkerEvent::Error(e) => {
                eprintln!("conversion failed: {}", e);
            }
            WorkerEvent::Finished => break,
        }
    }
    worker.join();

    if exit_code == 0 {
        if let Some(dir) = source.parent().filter(|d| !d.as_os_str().is_empty()) {
            config.last_open_dir = Some(dir.to_path_buf());
            if let Err(e) = config.save() {
                log::warn!("could not remember last opened directory: {}", e);
            }
        }
    }
    exit_code
}

fn run_info(args: InfoArgs, config: Config) -> i32 {
    let store = match BinaryStore::open(&args.file) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };
    match store.row_count() {
        Ok(rows) => {
            let seconds = rows as f64 / config.sample_rate_hz.max(1) as f64;
            println!("{}: {} rows, {:.2} s at {} Hz", args.file.display(), rows, seconds, config.sample_rate_hz);
            0
        }
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    }
}
