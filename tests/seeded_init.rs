//! Seeded initialization, kept in its own test binary: the backend RNG is
//! process-wide and the unit tests draw from it concurrently.

use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    prelude::*,
    tensor::backend::Backend as _,
};
use rl_trainer::{
    algo::ActorCriticAgent,
    config::TrainingConfig,
    nn::{generate_orthogonal_weights, Actor, Critic},
};

type TestBackend = Autodiff<NdArray>;
type Agent = ActorCriticAgent<TestBackend, Actor<TestBackend>, Critic<TestBackend>>;

fn seeded_config(seed: u64) -> TrainingConfig {
    let mut config = TrainingConfig::default();
    config.seed = Some(seed);
    config.actor.hidden_layers = vec![16, 16];
    config.critic.hidden_layers = vec![16, 16];
    config.code_level_opt.orthogonal_init = true;
    config
}

fn initial_outputs(seed: u64) -> (Vec<f32>, Vec<f32>) {
    let device = NdArrayDevice::default();
    let agent = Agent::from_config(seeded_config(seed), 3, 1, device).unwrap();

    let states = Tensor::<TestBackend, 2>::ones([2, 3], &device);
    let actions = Tensor::<TestBackend, 2>::ones([2, 1], &device);
    let values = agent.critic().unwrap().value(states.clone(), actions);
    let means = agent.actor().unwrap().forward(states);
    (
        values.into_data().iter::<f32>().collect(),
        means.into_data().iter::<f32>().collect(),
    )
}

#[test]
fn same_seed_builds_identical_networks() {
    let device = NdArrayDevice::default();

    NdArray::<f32>::seed(3);
    let first: Vec<f32> = generate_orthogonal_weights::<NdArray>(5, 4, 1.0, &device)
        .into_data()
        .iter::<f32>()
        .collect();
    NdArray::<f32>::seed(3);
    let second: Vec<f32> = generate_orthogonal_weights::<NdArray>(5, 4, 1.0, &device)
        .into_data()
        .iter::<f32>()
        .collect();
    assert_eq!(first, second);

    let (values_a, means_a) = initial_outputs(7);
    let (values_b, means_b) = initial_outputs(7);
    assert_eq!(values_a, values_b);
    assert_eq!(means_a, means_b);

    let (values_c, _) = initial_outputs(8);
    assert_ne!(values_a, values_c);
}
