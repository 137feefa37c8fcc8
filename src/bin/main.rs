//! CLI binary for gpx2dzg
//!
//! This provides the command-line interface for the gpx2dzg library.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use env_logger::{Builder, Env, Target};
use gpx2dzg::{convert, parse_drop_list, ConvertOptions, DzgError, DztPolicy, VariationSource};
use log::{error, info};
use std::io::Write;
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_SHA"),
    " ",
    env!("VERGEN_GIT_COMMIT_DATE"),
    ")"
);

fn build_command() -> Command {
    Command::new("gpx2dzg")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(LONG_VERSION)
        .about("Convert GPX waypoints and GSSI DZX/DZT marks into a DZG positioning file.")
        .arg(
            Arg::new("dzx")
                .short('d')
                .long("dzx")
                .help("Input DZX or DZT file (.DZX, .DZT, case-insensitive). The DZG is written next to it")
                .value_name("FILE")
                .required(true),
        )
        .arg(
            Arg::new("gpx")
                .short('g')
                .long("gpx")
                .help("Input GPX file (default: the DZX/DZT path with a .gpx extension)")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("plot")
                .short('p')
                .long("plot")
                .help("Produce the sanity check comparing GPX distance with scan number per mark")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-write")
                .long("no-write")
                .help("Do not write a DZG")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("drop")
                .long("drop")
                .help("Comma-separated mark positions to remove before matching; negative counts from the end (e.g. --drop=0,-1)")
                .value_name("LIST")
                .allow_hyphen_values(true),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .help("DZT amplitude above which a scan's first sample is a mark")
                .value_name("N")
                .value_parser(value_parser!(i32))
                .default_value("20000"),
        )
        .arg(
            Arg::new("system")
                .long("system")
                .help("Required DZT system id")
                .value_name("ID")
                .value_parser(value_parser!(u8))
                .default_value("3"),
        )
        .arg(
            Arg::new("any-system")
                .long("any-system")
                .help("Accept DZT files from any system")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("channel")
                .long("channel")
                .help("DZT channel searched for marks")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .default_value("0"),
        )
        .arg(
            Arg::new("variation")
                .long("variation")
                .help("Fixed magnetic variation in degrees, east positive (default: World Magnetic Model 2020)")
                .value_name("DEG")
                .value_parser(value_parser!(f64))
                .allow_negative_numbers(true),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .help("Directory for sanity check files (default: same as input file)")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug output")
                .action(ArgAction::SetTrue),
        )
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.args()
            )
        })
        .target(Target::Stdout)
        .init();
}

/// `~`, `~/x` and `~user/x` to the matching home directory
fn expand_tilde(path: &str) -> PathBuf {
    expand_user(
        path,
        std::env::var_os("HOME").map(PathBuf::from),
        |user| {
            std::fs::read_to_string("/etc/passwd")
                .ok()
                .and_then(|passwd| passwd_home(&passwd, user))
        },
    )
}

fn expand_user(
    path: &str,
    home: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<PathBuf>,
) -> PathBuf {
    let Some(rest) = path.strip_prefix('~') else {
        return PathBuf::from(path);
    };
    let (user, tail) = rest.split_once('/').unwrap_or((rest, ""));
    let home = if user.is_empty() { home } else { lookup(user) };
    match home {
        Some(home) if tail.is_empty() => home,
        Some(home) => home.join(tail),
        // unknown user: leave the path alone
        None => PathBuf::from(path),
    }
}

// Home directory field of `user` in passwd(5) text
fn passwd_home(passwd: &str, user: &str) -> Option<PathBuf> {
    passwd
        .lines()
        .map(|line| line.split(':').collect::<Vec<_>>())
        .find(|fields| fields.len() >= 6 && fields[0] == user)
        .map(|fields| PathBuf::from(fields[5]))
}

fn options_from_matches(matches: &ArgMatches) -> Result<ConvertOptions> {
    let instrument = expand_tilde(matches.get_one::<String>("dzx").map(String::as_str).unwrap_or(""));
    let gpx = matches.get_one::<String>("gpx").map(|g| expand_tilde(g));
    let drop = match matches.get_one::<String>("drop") {
        Some(list) => parse_drop_list(list)?,
        None => Vec::new(),
    };
    let system_id = if matches.get_flag("any-system") {
        None
    } else {
        matches.get_one::<u8>("system").copied()
    };
    let variation = match matches.get_one::<f64>("variation") {
        Some(&degrees) => VariationSource::Fixed(degrees),
        None => VariationSource::Model,
    };

    Ok(ConvertOptions {
        instrument,
        gpx,
        write: !matches.get_flag("no-write"),
        plot: matches.get_flag("plot"),
        drop,
        dzt: DztPolicy {
            amplitude_threshold: matches.get_one::<i32>("threshold").copied().unwrap_or(20_000),
            system_id,
            channel: matches.get_one::<usize>("channel").copied().unwrap_or(0),
        },
        variation,
        output_dir: matches.get_one::<String>("output-dir").map(|d| expand_tilde(d)),
    })
}

fn run(matches: &ArgMatches) -> Result<bool> {
    let options = options_from_matches(matches)?;

    if !options.instrument.exists() {
        anyhow::bail!(
            "specified dzx/dzt file does not exist: {}",
            options.instrument.display()
        );
    }
    let gpx_path = options.gpx_path();
    if options.gpx.is_none() {
        info!("only DZX/DZT input specified. searching for an identically named GPX...");
    }
    if !gpx_path.exists() {
        anyhow::bail!("specified gpx file does not exist: {}", gpx_path.display());
    }

    let model = options.variation.model();
    let report = convert(&options, model.as_ref())
        .with_context(|| format!("Failed to convert {}", options.instrument.display()))?;

    if report.success {
        if let Some(path) = &report.dzg_path {
            println!("Wrote {}", path.display());
        }
    } else {
        for path in &report.diagnostics {
            println!("Wrote sanity check {}", path.display());
        }
    }
    Ok(report.success)
}

fn main() {
    let matches = build_command().get_matches();
    init_logging(matches.get_flag("debug"));

    match run(&matches) {
        Ok(success) => {
            if !success {
                info!("mark counts did not match; no DZG written");
            }
        }
        Err(e) => {
            error!("ERROR: {:#}", e);
            if let Some(dzg_error) = e.downcast_ref::<DzgError>() {
                for line in dzg_error.guidance() {
                    error!("{}", line);
                }
                std::process::exit(dzg_error.exit_code());
            }
            std::process::exit(2);
        }
    }
}
