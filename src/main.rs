use std::{env, fs};

use anyhow::Context;
use log::info;
use ndarray::array;

use neural_transform::{
    arch::NetworkSpec,
    network::Network,
    training::{Model, Sample, SquaredError},
};

const EPOCHS: usize = 2000;

const XOR: &str = r#"{
    "input_size": 2,
    "transform": {"pipe": [
        {"dense": {"output_size": 4, "learning_rate": 0.5, "inertia": 0.5}},
        {"bias": {"learning_rate": 0.5, "inertia": 0.5}},
        {"activation": "sigmoid"},
        {"dense": {"output_size": 1, "learning_rate": 0.5, "inertia": 0.5}},
        {"bias": {"learning_rate": 0.5, "inertia": 0.5}},
        {"activation": "sigmoid"}
    ]}
}"#;

fn xor_samples(_epoch: usize) -> Vec<Sample> {
    [(0., 0., 0.), (0., 1., 1.), (1., 0., 1.), (1., 1., 0.)]
        .into_iter()
        .map(|(a, b, y)| Sample {
            input: array![a, b],
            output: array![y],
        })
        .collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let spec = match env::args().nth(1) {
        Some(path) => fs::read_to_string(&path).with_context(|| format!("reading {path}"))?,
        None => XOR.to_string(),
    };
    let spec = NetworkSpec::from_json(&spec).context("parsing the network spec")?;
    let network = Network::from_spec(spec)?;
    info!(
        "training a {} -> {} network for {EPOCHS} epochs",
        network.input_size(),
        network.output_size()
    );

    let model = Model::new(network, xor_samples, SquaredError);
    let outcome = model
        .train(EPOCHS, |epoch| info!("epoch {epoch}"))
        .await?;
    info!("{outcome:?}");

    let loss = SquaredError::new();
    let mut total = 0.;
    for Sample { input, output } in xor_samples(0) {
        let prediction = model.predict(input.clone())?;
        total += loss.value(output[0], prediction[0]);
        println!("{input} -> {prediction:.3} (target {output})");
    }
    println!("loss: {total:.5}");

    println!("{}", model.network().serialize()?);
    Ok(())
}
