use std::{fmt::Display, marker::PhantomData};

use burn::{
    module::AutodiffModule,
    optim::{
        decay::WeightDecayConfig, AdamConfig, AdamWConfig, GradientsParams, SgdConfig,
    },
    tensor::backend::AutodiffBackend,
    LearningRate,
};

use crate::config::{ConfigError, Training};

/// Inverse-time learning rate decay
pub mod decay;

pub use decay::{lr_decay, InverseTimeDecay, LearningRateControl};

/// The numerical stability constant used by Adam
pub const ADAM_EPSILON: f32 = 1e-8;

/// The numerical stability constant used by AdamW
pub const ADAMW_EPSILON: f32 = 1e-8;

/// The decoupled weight decay applied by AdamW
pub const ADAMW_WEIGHT_DECAY: f32 = 0.0;

/// Supported optimization algorithms
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum OptimizerKind {
    /// Stochastic gradient descent with L2 weight decay
    Sgd,

    /// Adam, without weight decay
    Adam,

    /// AdamW, with decoupled weight decay switched off
    AdamW,
}

impl TryFrom<&str> for OptimizerKind {
    type Error = ConfigError;

    /// Optimizer names are case-insensitive
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "sgd" => Ok(OptimizerKind::Sgd),
            "adam" => Ok(OptimizerKind::Adam),
            "adamw" => Ok(OptimizerKind::AdamW),
            _ => Err(ConfigError::IllegalOptimizer(value.to_string())),
        }
    }
}

impl Display for OptimizerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OptimizerKind::Sgd => "sgd",
            OptimizerKind::Adam => "adam",
            OptimizerKind::AdamW => "adamw",
        };

        write!(f, "{}", name)
    }
}

/// Burn's Adam and AdamW configs only hand back `impl Optimizer`, so every algorithm is kept
/// behind the same boxed step function
type StepFn<M> = Box<dyn FnMut(LearningRate, M, GradientsParams) -> M + Send>;

fn step_fn<M, B, O>(mut optim: O) -> StepFn<M>
where
    M: AutodiffModule<B> + 'static,
    B: AutodiffBackend,
    O: burn::optim::Optimizer<M, B> + 'static,
{
    Box::new(move |lr, module, grads| optim.step(lr, module, grads))
}

/// An optimizer selected by name, holding the learning rate it applies on every step
pub struct Optimizer<M, B>
where
    M: AutodiffModule<B>,
    B: AutodiffBackend,
{
    kind: OptimizerKind,
    learning_rate: LearningRate,
    weight_decay: Option<f64>,
    epsilon: Option<f32>,
    step: StepFn<M>,
    _backend: PhantomData<B>,
}

impl<M, B> Optimizer<M, B>
where
    M: AutodiffModule<B>,
    B: AutodiffBackend,
{
    /// The selected algorithm
    pub fn kind(&self) -> OptimizerKind {
        self.kind
    }

    /// The weight decay actually applied on each step, if the algorithm has one
    pub fn weight_decay(&self) -> Option<f64> {
        self.weight_decay
    }

    /// The numerical stability constant, for Adam and AdamW
    pub fn epsilon(&self) -> Option<f32> {
        self.epsilon
    }

    /// Update the module's parameters from the given gradients at the current learning rate
    pub fn step(&mut self, module: M, grads: GradientsParams) -> M {
        (self.step)(self.learning_rate, module, grads)
    }
}

impl<M, B> LearningRateControl for Optimizer<M, B>
where
    M: AutodiffModule<B>,
    B: AutodiffBackend,
{
    fn learning_rate(&self) -> LearningRate {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: LearningRate) {
        self.learning_rate = lr;
    }
}

/// Build the configured optimizer for a module type. An unknown optimizer name is an error, so
/// callers can reject the configuration before training starts.
pub fn get_optimizer<B, M>(config: &Training) -> Result<Optimizer<M, B>, ConfigError>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + 'static,
{
    let kind = OptimizerKind::try_from(config.optimizer.as_str())?;
    let learning_rate = config.learning_rate;

    let (weight_decay, epsilon, step) = match kind {
        OptimizerKind::Sgd => {
            log::info!(
                "Using SGD: lr is: {}, L2 regularization is: {}",
                learning_rate,
                config.l2
            );

            let optim = SgdConfig::new()
                .with_weight_decay(Some(WeightDecayConfig::new(config.l2)))
                .init::<B, M>();

            (Some(config.l2), None, step_fn::<M, B, _>(optim))
        }
        OptimizerKind::Adam => {
            log::info!(
                "Using Adam, with learning rate: {}, eps: {}",
                learning_rate,
                ADAM_EPSILON
            );

            let optim = AdamConfig::new().with_epsilon(ADAM_EPSILON).init::<B, M>();

            (None, Some(ADAM_EPSILON), step_fn::<M, B, _>(optim))
        }
        OptimizerKind::AdamW => {
            log::info!(
                "Using AdamW optimizer with {} learning rate, eps: {}",
                learning_rate,
                ADAMW_EPSILON
            );

            let optim = AdamWConfig::new()
                .with_epsilon(ADAMW_EPSILON)
                .with_weight_decay(ADAMW_WEIGHT_DECAY)
                .init::<B, M>();

            (
                Some(ADAMW_WEIGHT_DECAY as f64),
                Some(ADAMW_EPSILON),
                step_fn::<M, B, _>(optim),
            )
        }
    };

    Ok(Optimizer {
        kind,
        learning_rate,
        weight_decay,
        epsilon,
        step,
        _backend: PhantomData,
    })
}

#[cfg(test)]
mod tests {
    use burn::{
        nn::{Linear, LinearConfig},
        tensor::Tensor,
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::TestAutodiffBackend;

    type Model = Linear<TestAutodiffBackend>;

    #[test]
    fn optimizer_names_are_case_insensitive() {
        assert_eq!(OptimizerKind::try_from("SGD"), Ok(OptimizerKind::Sgd));
        assert_eq!(OptimizerKind::try_from("Adam"), Ok(OptimizerKind::Adam));
        assert_eq!(OptimizerKind::try_from("ADAMW"), Ok(OptimizerKind::AdamW));
    }

    #[test]
    fn adamw_uses_the_fixed_epsilon() {
        let config = Training::new()
            .with_optimizer("AdamW".to_string())
            .with_learning_rate(2e-5);

        let optimizer = get_optimizer::<TestAutodiffBackend, Model>(&config).unwrap();

        assert_eq!(optimizer.kind(), OptimizerKind::AdamW);
        assert_eq!(optimizer.learning_rate(), 2e-5);
        assert_eq!(optimizer.epsilon(), Some(1e-8));
        assert_eq!(optimizer.weight_decay(), Some(0.0));
    }

    #[test]
    fn adam_pins_epsilon_without_weight_decay() {
        let config = Training::new().with_optimizer("adam".to_string());

        let optimizer = get_optimizer::<TestAutodiffBackend, Model>(&config).unwrap();

        assert_eq!(optimizer.kind(), OptimizerKind::Adam);
        assert_eq!(optimizer.epsilon(), Some(1e-8));
        assert_eq!(optimizer.weight_decay(), None);
    }

    #[test]
    fn adamw_leaves_weights_alone_on_zero_gradients() {
        let device = Default::default();
        let config = Training::new()
            .with_optimizer("adamw".to_string())
            .with_learning_rate(1.0);
        let mut optimizer = get_optimizer::<TestAutodiffBackend, Model>(&config).unwrap();

        let model: Model = LinearConfig::new(2, 2).init(&device);
        let before = model.weight.val().into_data().convert::<f32>().value;

        let input = Tensor::<TestAutodiffBackend, 2>::ones([1, 2], &device);
        let loss = model.forward(input).sum().mul_scalar(0.0);
        let grads = GradientsParams::from_grads(loss.backward(), &model);

        let model = optimizer.step(model, grads);
        let after = model.weight.val().into_data().convert::<f32>().value;

        assert_eq!(before, after);
    }

    #[test]
    fn adam_steps_move_against_the_gradient() {
        let device = Default::default();
        let config = Training::new()
            .with_optimizer("adam".to_string())
            .with_learning_rate(0.01);
        let mut optimizer = get_optimizer::<TestAutodiffBackend, Model>(&config).unwrap();

        let model: Model = LinearConfig::new(2, 2).init(&device);
        let before = model.weight.val().into_data().convert::<f32>().value;

        let input = Tensor::<TestAutodiffBackend, 2>::ones([1, 2], &device);
        let loss = model.forward(input).sum();
        let grads = GradientsParams::from_grads(loss.backward(), &model);

        let model = optimizer.step(model, grads);
        let after = model.weight.val().into_data().convert::<f32>().value;

        // The first Adam step moves each weight by about lr in the gradient's sign
        for (before, after) in before.iter().zip(after) {
            assert!((before - after - 0.01).abs() < 1e-4);
        }
    }

    #[test]
    fn sgd_carries_the_l2_penalty() {
        let config = Training::new().with_l2(1e-4);

        let optimizer = get_optimizer::<TestAutodiffBackend, Model>(&config).unwrap();

        assert_eq!(optimizer.kind(), OptimizerKind::Sgd);
        assert_eq!(optimizer.weight_decay(), Some(1e-4));
        assert_eq!(optimizer.epsilon(), None);
    }

    #[test]
    fn unknown_optimizer_is_a_config_error() {
        let config = Training::new().with_optimizer("lbfgs".to_string());

        let result = get_optimizer::<TestAutodiffBackend, Model>(&config);

        assert_eq!(
            result.err(),
            Some(ConfigError::IllegalOptimizer("lbfgs".to_string()))
        );
    }

    #[test]
    fn steps_use_the_current_learning_rate() {
        let device = Default::default();
        let config = Training::new().with_learning_rate(0.1).with_l2(0.0);
        let mut optimizer = get_optimizer::<TestAutodiffBackend, Model>(&config).unwrap();

        let model: Model = LinearConfig::new(2, 2).init(&device);
        let before = model.weight.val().into_data().convert::<f32>().value;

        // d(sum(xW + b))/dW is all ones for x = [1, 1]
        let input = Tensor::<TestAutodiffBackend, 2>::ones([1, 2], &device);
        let loss = model.forward(input).sum();
        let grads = GradientsParams::from_grads(loss.backward(), &model);

        let model = optimizer.step(model, grads);
        let after = model.weight.val().into_data().convert::<f32>().value;

        for (before, after) in before.iter().zip(after) {
            assert!((before - after - 0.1).abs() < 1e-5);
        }
    }
}
