//! End to end checks of the fixture networks against their encodings.

use anyhow::Error;

use reluka_check::{
    random_points, sample, DenseNetwork, EquivalenceChecker, ProcessSolver, PwlAlternate,
    SampleTable, SmtAlternate, SmtSolver, SolverError, Tolerance, Verdict,
};
use reluka_limodsat::Trace;
use reluka_pwl::PwlParser;

macro_rules! fixture {
    ($name:expr) => {
        &include_bytes!(concat!("fixtures/", $name))[..]
    };
}

fn check_pwl(network: &[u8], pwl: &[u8]) -> Result<Verdict, Error> {
    let network = DenseNetwork::parse(network)?;
    let alternate = PwlAlternate::new(PwlParser::parse(pwl)?);

    let samples = sample(&network, random_points(network.input_dimension(), 200, 0))?;
    let report = EquivalenceChecker::default().check(&alternate, samples)?;

    assert_eq!(report.results.len(), 200);
    Ok(report.verdict())
}

#[test]
fn relu_half_pwl() -> Result<(), Error> {
    let verdict = check_pwl(fixture!("relu_half.toml"), fixture!("relu_half.pwl"))?;
    assert_eq!(verdict, Verdict::AllPass);
    Ok(())
}

#[test]
fn distance_pwl() -> Result<(), Error> {
    let verdict = check_pwl(fixture!("distance.toml"), fixture!("distance.pwl"))?;
    assert_eq!(verdict, Verdict::AllPass);
    Ok(())
}

#[test]
fn broken_region_is_detected() -> Result<(), Error> {
    match check_pwl(fixture!("distance.toml"), fixture!("distance_broken.pwl"))? {
        Verdict::Mixed { passed, failed } => assert_eq!(passed + failed, 200),
        other => panic!("Unexpected verdict {:?}", other),
    }
    Ok(())
}

#[test]
fn sample_table_against_pwl() -> Result<(), Error> {
    let table = SampleTable::parse(fixture!("distance.samples"))?;
    let alternate = PwlAlternate::new(PwlParser::parse(fixture!("distance.pwl"))?);

    assert_eq!(table.dimension(), 2);
    let report = EquivalenceChecker::new(Tolerance::new(10)).check(&alternate, table.into_samples())?;
    assert_eq!(report.verdict(), Verdict::AllPass);
    Ok(())
}

/// Computes `max(0, 2 X1 - 1)` from the pinned input, like a solver would for the
/// `double_relu` trace.
struct DoubleRelu;

impl SmtSolver for DoubleRelu {
    fn solve(&self, script: &str) -> Result<String, SolverError> {
        let pinned = script
            .lines()
            .find_map(|line| line.strip_prefix("(assert (= X1 "))
            .and_then(|rest| rest.strip_suffix("))"))
            .and_then(|value| value.parse::<f64>().ok());

        Ok(match pinned {
            Some(x) => format!("sat\n((phi {:.12}))\n", (2.0 * x - 1.0).max(0.0)),
            None => "unknown\n".to_owned(),
        })
    }
}

#[test]
fn limodsat_round_trip() -> Result<(), Error> {
    let network = DenseNetwork::parse(fixture!("double_relu.toml"))?;
    let trace = Trace::parse(fixture!("double_relu.limodsat"))?;
    let alternate = SmtAlternate::new(&trace, network.input_dimension(), DoubleRelu, 10);

    assert_eq!(
        alternate.problem().assertions(),
        &["(assert (= phi (scon X1 X1)))".to_owned()]
    );

    let samples = sample(&network, random_points(1, 50, 3))?;
    let report = EquivalenceChecker::default().check(&alternate, samples)?;
    assert_eq!(report.verdict(), Verdict::AllPass);
    Ok(())
}

#[cfg_attr(not(test_z3), ignore)]
#[test]
fn limodsat_with_z3() -> Result<(), Error> {
    let network = DenseNetwork::parse(fixture!("double_relu.toml"))?;
    let trace = Trace::parse(fixture!("double_relu.limodsat"))?;
    let solver = ProcessSolver::new(
        "z3",
        vec!["-in".to_owned()],
        std::time::Duration::from_secs(30),
    );
    let alternate = SmtAlternate::new(&trace, network.input_dimension(), solver, 10);

    let samples = sample(&network, random_points(1, 20, 7))?;
    let report = EquivalenceChecker::default().check(&alternate, samples)?;
    assert_eq!(report.verdict(), Verdict::AllPass);
    Ok(())
}
