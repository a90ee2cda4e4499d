use anyhow::{Context, Result};
use std::sync::Arc;
use typed_gp::config::EngineConfig;
use typed_gp::data::{CsvConnector, Dataset};
use typed_gp::engines::generation::{initial_population, offspring};
use typed_gp::{ModelFormat, ProgramType, SearchSpace, Value};

/// Usage: `typed-gp [config.toml] [data.csv target [--classify]]`
fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, rest) = match args.first() {
        Some(path) if path.ends_with(".toml") => (Some(path.as_str()), &args[1..]),
        _ => (None, &args[..]),
    };

    let config = EngineConfig::load_layered(config_path).context("loading configuration")?;
    let dataset = match rest {
        [csv, target, flags @ ..] => {
            let classification = flags.iter().any(|f| f == "--classify");
            CsvConnector::load_dataset(csv, target, classification)
                .with_context(|| format!("loading {}", csv))?
        }
        _ => synthetic_dataset()?,
    };
    log::info!(
        "{} samples, {} features, classification: {}",
        dataset.n_samples(),
        dataset.n_features(),
        dataset.classification
    );

    let ss = Arc::new(SearchSpace::new(&dataset, &config.search_space)?);
    let program_type = ProgramType::for_dataset(&dataset);
    let seed = config.evolution.seed.unwrap_or(0);

    let mut population = initial_population(&ss, program_type, &config.evolution, seed)?;
    for program in population.iter_mut() {
        program.fit(&dataset)?;
    }
    let children = offspring(&population, &ss, &config.evolution, seed.wrapping_add(1))?;

    for (parent, child) in population.iter().zip(&children).take(5) {
        println!("parent: {}", parent.get_model(ModelFormat::Compact));
        match child {
            Some(child) => println!("child:  {}", child.get_model(ModelFormat::Compact)),
            None => println!("child:  <none>"),
        }
    }
    log::info!(
        "{} of {} variations succeeded",
        children.iter().filter(|c| c.is_some()).count(),
        children.len()
    );
    Ok(())
}

fn synthetic_dataset() -> Result<Dataset> {
    let x1: Vec<f64> = (0..50).map(|i| i as f64 / 10.0).collect();
    let x2: Vec<f64> = (0..50).map(|i| ((i * 7) % 11) as f64).collect();
    let y = x1.iter().zip(&x2).map(|(a, b)| 2.0 * a + b).collect();
    Ok(Dataset::new(
        vec![
            ("x1".to_string(), Value::ArrayF(x1)),
            ("x2".to_string(), Value::ArrayF(x2)),
        ],
        y,
        false,
    )?)
}
