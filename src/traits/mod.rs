pub mod to_tensor;
pub mod trainable;

pub use to_tensor::{Rows, ToTensor};
pub use trainable::{StepOutcome, TrainableAgent, TrainingMetrics};
