use mzhardklor::averagine::Averagine;
use mzhardklor::mercury::Mercury;
use mzhardklor::periodic_table::PeriodicTable;
use mzhardklor::variant::Variant;
use mzhardklor::PROTON;
use std::{env, error::Error};

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let mz = args
        .next()
        .inspect(|s| eprintln!("m/z: {s}"))
        .ok_or("Expected a floating point m/z")?
        .parse::<f64>()?;
    let charge = args
        .next()
        .inspect(|s| eprintln!("z: {s}"))
        .ok_or("Expected an integer charge")?
        .parse::<i32>()?;
    let variant = match args.next() {
        Some(text) => Variant::parse(&text, &PeriodicTable::builtin())?,
        None => Variant::identity(),
    };

    let averagine = Averagine::default();
    let mercury = Mercury::default();
    let neutral = chemical_elements::neutral_mass(mz, charge, PROTON);
    let formula = averagine.estimate(neutral, &variant);
    println!("{}", formula.display(averagine.periodic_table()));
    let dist = mercury.compute_enriched(&formula, charge, &variant.enrichments, false)?;
    for peak in dist.iter() {
        println!("{:.3}\t{:.5}\t{charge}", peak.mz, peak.intensity);
    }
    Ok(())
}
