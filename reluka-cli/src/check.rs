use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Error};
use clap::{App, ArgMatches, SubCommand};
use log::info;

use reluka_check::{
    random_points, sample, verdict_message, write_report, Alternate, CheckConfig, DenseNetwork,
    EquivalenceChecker, ProcessSolver, PwlAlternate, Sample, SampleTable, SmtAlternate, Verdict,
};
use reluka_limodsat::Trace;
use reluka_pwl::PwlParser;

pub fn encoding_args() -> Vec<App<'static, 'static>> {
    vec![
        SubCommand::with_name("pwl")
            .about("Check a region based PWL file")
            .arg_from_usage("<INPUT> 'The PWL file to check'"),
        SubCommand::with_name("limodsat")
            .about("Check a LIMODSAT circuit trace using an SMT solver")
            .arg_from_usage("<INPUT> 'The LIMODSAT trace to check'"),
    ]
}

/// Source of the oracle values.
enum Reference {
    Network(DenseNetwork),
    Samples(SampleTable),
}

impl Reference {
    fn load(matches: &ArgMatches) -> Result<Reference, Error> {
        if let Some(path) = matches.value_of("network-file") {
            info!("Reading network '{}'", path);
            Ok(Reference::Network(DenseNetwork::parse(fs::File::open(
                path,
            )?)?))
        } else if let Some(path) = matches.value_of("samples-file") {
            info!("Reading samples '{}'", path);
            Ok(Reference::Samples(SampleTable::parse(fs::File::open(path)?)?))
        } else {
            bail!("An oracle is required, use --network or --samples")
        }
    }

    fn dimension(&self) -> usize {
        match self {
            Reference::Network(network) => network.input_dimension(),
            Reference::Samples(table) => table.dimension(),
        }
    }

    fn into_samples(self, config: &CheckConfig) -> Result<Vec<Sample>, Error> {
        match self {
            Reference::Network(network) => {
                info!(
                    "Evaluating network at {} random points (seed {})",
                    config.samples, config.seed
                );
                let points = random_points(network.input_dimension(), config.samples, config.seed);
                sample(&network, points)
            }
            Reference::Samples(table) => Ok(table.into_samples()),
        }
    }
}

fn load_alternate(
    encoding: &str,
    path: &str,
    dimension: usize,
    config: &CheckConfig,
) -> Result<Box<dyn Alternate>, Error> {
    info!("Reading {} file '{}'", encoding, path);
    let file = fs::File::open(path)?;

    match encoding {
        "pwl" => {
            let model = PwlParser::parse(file)?;
            if model.dimension() != dimension {
                bail!(
                    "PWL model has {} inputs but the oracle has {}",
                    model.dimension(),
                    dimension
                );
            }
            Ok(Box::new(PwlAlternate::new(model)))
        }
        "limodsat" => {
            let trace = Trace::parse(file)?;
            let solver = ProcessSolver::from_config(config);
            info!("Using solver '{}'", solver.command());
            Ok(Box::new(SmtAlternate::new(
                &trace,
                dimension,
                solver,
                config.script_digits,
            )))
        }
        _ => bail!("Unknown encoding '{}'", encoding),
    }
}

pub fn check_main(
    matches: &ArgMatches,
    encoding: &str,
    encoding_matches: &ArgMatches,
    config: &CheckConfig,
) -> Result<i32, Error> {
    let input = match encoding_matches.value_of("INPUT") {
        Some(input) => input,
        None => bail!("No input file given"),
    };

    let reference = Reference::load(matches)?;
    let alternate = load_alternate(encoding, input, reference.dimension(), config)?;
    let samples = reference.into_samples(config)?;

    let report = EquivalenceChecker::from_config(config).check(alternate.as_ref(), samples)?;

    let name = Path::new(input)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.to_owned());

    let report_path = match matches.value_of("report-file") {
        Some(path) => path.to_owned(),
        None => format!("{}.res", input),
    };

    info!("Writing report to '{}'", report_path);

    let mut report_file = io::BufWriter::new(fs::File::create(&report_path)?);
    write_report(&mut report_file, &name, &report)?;
    report_file.flush()?;

    println!("{}: {}", name, verdict_message(report.verdict()));

    Ok(if report.verdict() == Verdict::AllPass {
        0
    } else {
        1
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    const NETWORK: &str = "\
[[layers]]
weights = [[1.0]]
bias = [-0.5]

[[layers]]
weights = [[1.0]]
bias = [0.0]
";

    const PWL: &str = "pwl\n\nb -0.5 1\n\np 0 1 0 1\nl 1\np -1 2 1 1\ng 1\n";

    fn run(tmp: &TempDir, args: &[&str], encoding: &str, input: &str) -> Result<i32, Error> {
        let mut argv = vec!["reluka-equiv".to_owned()];
        for arg in args {
            argv.push(arg.replace("$TMP", &tmp.path().to_string_lossy()));
        }
        argv.push(encoding.to_owned());
        argv.push(tmp.path().join(input).to_string_lossy().into_owned());

        let matches = crate::app().get_matches_from_safe(argv)?;
        let config = CheckConfig {
            samples: 50,
            ..CheckConfig::default()
        };
        match matches.subcommand() {
            (encoding, Some(encoding_matches)) => {
                check_main(&matches, encoding, encoding_matches, &config)
            }
            _ => bail!("missing subcommand"),
        }
    }

    #[test]
    fn pwl_against_network() -> Result<(), Error> {
        let tmp = TempDir::new()?;
        fs::write(tmp.path().join("relu.toml"), NETWORK)?;
        fs::write(tmp.path().join("relu.pwl"), PWL)?;

        let exit_code = run(&tmp, &["--network", "$TMP/relu.toml"], "pwl", "relu.pwl")?;
        assert_eq!(exit_code, 0);

        let report = fs::read_to_string(tmp.path().join("relu.pwl.res"))?;
        assert!(report.starts_with("relu.pwl: PASSED ALL EVALUATIONS!!!\n\n"));
        assert_eq!(report.lines().count(), 52);
        Ok(())
    }

    #[test]
    fn failures_set_the_exit_code() -> Result<(), Error> {
        let tmp = TempDir::new()?;
        fs::write(tmp.path().join("relu.pwl"), PWL)?;
        fs::write(tmp.path().join("relu.samples"), "0.25 0.0\n0.75 0.5\n")?;

        let exit_code = run(
            &tmp,
            &["--samples", "$TMP/relu.samples", "--report", "$TMP/out.res"],
            "pwl",
            "relu.pwl",
        )?;
        assert_eq!(exit_code, 1);

        let report = fs::read_to_string(tmp.path().join("out.res"))?;
        assert!(report.starts_with("relu.pwl: PASSED: 1 | failed: 1\n"));
        Ok(())
    }

    #[test]
    fn dimensions_must_agree() -> Result<(), Error> {
        let tmp = TempDir::new()?;
        fs::write(tmp.path().join("relu.pwl"), PWL)?;
        fs::write(tmp.path().join("plane.samples"), "0.25 0.5 0.0\n")?;

        let result = run(&tmp, &["--samples", "$TMP/plane.samples"], "pwl", "relu.pwl");
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn oracle_is_required() -> Result<(), Error> {
        let tmp = TempDir::new()?;
        fs::write(tmp.path().join("relu.pwl"), PWL)?;

        assert!(run(&tmp, &[], "pwl", "relu.pwl").is_err());
        Ok(())
    }
}
