use burn::LearningRate;
use derive_new::new;

use crate::config::{ConfigError, Training};

/// Anything holding a learning rate that a scheduler can overwrite
pub trait LearningRateControl {
    /// Get the current learning rate
    fn learning_rate(&self) -> LearningRate;

    /// Replace the learning rate used from the next step on
    fn set_learning_rate(&mut self, lr: LearningRate);
}

/// Inverse-time decay: `lr = base_lr / (1 + decay * (epoch - 1))`, with epochs counted from 1
#[derive(Clone, Copy, Debug, PartialEq, new)]
pub struct InverseTimeDecay {
    /// The learning rate at the first epoch
    pub base_lr: LearningRate,

    /// The decay coefficient
    pub decay: f64,
}

impl InverseTimeDecay {
    /// Creates a schedule from the configured learning rate and decay
    pub fn from_config(config: &Training) -> Self {
        Self::new(config.learning_rate, config.lr_decay)
    }

    /// The learning rate for a 1-indexed epoch
    pub fn lr(&self, epoch: usize) -> Result<LearningRate, ConfigError> {
        if epoch == 0 {
            return Err(ConfigError::InvalidEpoch(epoch));
        }

        Ok(self.base_lr / (1.0 + self.decay * (epoch - 1) as f64))
    }

    /// Write the learning rate for `epoch` into the optimizer and return it
    pub fn apply<O>(&self, optimizer: &mut O, epoch: usize) -> Result<LearningRate, ConfigError>
    where
        O: LearningRateControl + ?Sized,
    {
        let lr = self.lr(epoch)?;
        optimizer.set_learning_rate(lr);

        Ok(lr)
    }
}

/// Method to decay the learning rate at the start of an epoch. Returns the optimizer for chaining.
pub fn lr_decay<'a, O>(
    config: &Training,
    optimizer: &'a mut O,
    epoch: usize,
) -> Result<&'a mut O, ConfigError>
where
    O: LearningRateControl + ?Sized,
{
    let lr = InverseTimeDecay::from_config(config).apply(optimizer, epoch)?;
    log::info!("learning rate is set to: {}", lr);

    Ok(optimizer)
}

#[cfg(test)]
mod tests {
    use burn::nn::Linear;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{optim::get_optimizer, TestAutodiffBackend};

    #[test]
    fn decays_inverse_to_the_epoch() {
        let schedule = InverseTimeDecay::new(0.1, 0.05);

        assert_eq!(schedule.lr(1), Ok(0.1));
        assert!((schedule.lr(3).unwrap() - 0.1 / 1.1).abs() < 1e-12);
        assert!((schedule.lr(3).unwrap() - 0.0909).abs() < 1e-4);
    }

    #[test]
    fn zero_decay_keeps_the_base_rate() {
        let schedule = InverseTimeDecay::new(0.015, 0.0);

        for epoch in 1..10 {
            assert_eq!(schedule.lr(epoch), Ok(0.015));
        }
    }

    #[test]
    fn epoch_zero_is_rejected() {
        let schedule = InverseTimeDecay::new(0.1, 0.05);

        assert_eq!(schedule.lr(0), Err(ConfigError::InvalidEpoch(0)));
    }

    #[test]
    fn updates_the_optimizer_in_place() {
        let config = Training::new()
            .with_optimizer("adam".to_string())
            .with_learning_rate(0.1)
            .with_lr_decay(0.05);
        let mut optimizer =
            get_optimizer::<TestAutodiffBackend, Linear<TestAutodiffBackend>>(&config).unwrap();

        let lr = lr_decay(&config, &mut optimizer, 1).unwrap().learning_rate();
        assert_eq!(lr, 0.1);

        lr_decay(&config, &mut optimizer, 3).unwrap();
        assert!((optimizer.learning_rate() - 0.1 / 1.1).abs() < 1e-12);

        assert!(lr_decay(&config, &mut optimizer, 0).is_err());
        assert!((optimizer.learning_rate() - 0.1 / 1.1).abs() < 1e-12);
    }
}
