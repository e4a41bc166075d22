use std::env;
use std::fs;
use std::io::{Read, Write};

use anyhow::{bail, Error};
use clap::{values_t, App, AppSettings, Arg};
use env_logger::{fmt, Builder, Target};
use log::{error, info};
use log::{Level, LevelFilter, Record};

use reluka_check::{CheckConfig, CheckConfigUpdate};

mod check;

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{}", err);
            1
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

fn init_logging() {
    let format = |buf: &mut fmt::Formatter, record: &Record| {
        if record.level() == Level::Info {
            writeln!(buf, "{}", record.args())
        } else {
            writeln!(buf, "{}: {}", record.level(), record.args())
        }
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stderr)
        .format(format)
        .filter(None, LevelFilter::Info);

    if let Ok(ref env_var) = env::var("RELUKA_LOG") {
        builder.parse_filters(env_var);
    }

    builder.init();
}

fn banner() {
    info!("This is reluka-equiv {}", env!("RELUKA_VERSION"));
    info!(
        "  {} build - {}",
        env!("RELUKA_PROFILE"),
        env!("RELUKA_RUSTC_VERSION")
    );
}

fn app() -> App<'static, 'static> {
    App::new("reluka-equiv")
        .version(env!("RELUKA_VERSION"))
        .about("Checks PWL and LIMODSAT encodings of a ReLU network against the network itself")
        .setting(AppSettings::DisableHelpSubcommand)
        .setting(AppSettings::VersionlessSubcommands)
        .arg_from_usage("[config-file] --config=[FILE] 'Read parameters from configuration file'")
        .arg(
            Arg::from_usage("[config-option] -C --config-option")
                .value_name("OPTION>=<VALUE")
                .help(
                    "Specify a single config option, see 'reluka-equiv -C help' for a list of \
                     options.",
                )
                .multiple(true)
                .number_of_values(1),
        )
        .arg(
            Arg::from_usage("[network-file] --network=[FILE] 'Network (TOML) used as oracle'")
                .conflicts_with("samples-file"),
        )
        .arg_from_usage(
            "[samples-file] --samples=[FILE] 'Table of precomputed oracle values used instead \
             of a network'",
        )
        .arg_from_usage(
            "[report-file] --report=[FILE] 'Write the report to this file (INPUT.res if omitted)'",
        )
        .subcommands(check::encoding_args())
}

fn main_with_err() -> Result<i32, Error> {
    let matches = app().get_matches();

    if values_t!(matches, "config-option", String)
        .unwrap_or(vec![])
        .iter()
        .any(|option| option == "help")
    {
        print!("{}", CheckConfig::help());
        return Ok(0);
    }

    init_logging();
    banner();

    let mut config_update = CheckConfigUpdate::new();

    if let Some(config_path) = matches.value_of("config-file") {
        let mut config_contents = String::new();
        fs::File::open(config_path)?.read_to_string(&mut config_contents)?;

        config_update.merge(toml::from_str(&config_contents)?);
    }

    for config_option in values_t!(matches, "config-option", String).unwrap_or(vec![]) {
        config_update.merge(toml::from_str(&config_option)?);
    }

    let mut config = CheckConfig::default();
    config_update.apply(&mut config)?;

    match matches.subcommand() {
        (encoding, Some(encoding_matches)) => {
            check::check_main(&matches, encoding, encoding_matches, &config)
        }
        _ => bail!("No encoding given, use the 'pwl' or 'limodsat' subcommand"),
    }
}
