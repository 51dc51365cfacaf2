//! A three layer [backpropagation](https://en.wikipedia.org/wiki/Backpropagation)
//! network with momentum, weight clamping and stochastic weight perturbation.
//!
//! The network is driven one cycle at a time:
//!
//! ```
//! # use steernet::network::*;
//! # use rand::SeedableRng;
//! let dims = Dimensions::new(3, 2);
//! let rng = rand_chacha::ChaCha12Rng::seed_from_u64(1);
//! let mut network = Network::initialize(dims, Recurrence::Disabled, rng);
//!
//! network.set_inputs(&[true, false]);
//! network.forward();
//! let targets = [1.0, 0.0];
//! let errors = network.output_errors(&targets);
//! network.accumulate_epoch_error(&targets);
//! network.backward(&errors);
//! network.end_of_cycle();
//!
//! assert!(network.epoch_error() > 0.0);
//! ```

use crate::activator::{sigmoid, sigmoid_prime};
use crate::layer::{Layer, Unit};
use crate::utils::{argmax_all, clip};

use rand::Rng;
use rand_chacha::ChaCha12Rng;
use std::fmt;
use std::ops::Range;

/// Scales the weight error derivatives into an update.
pub const LEARNING_RATE: f64 = 0.33;
/// Fraction of the previous update carried into the next one.
pub const MOMENTUM: f64 = 0.85;
/// Initial weights are drawn uniformly from `[-INITIAL_WEIGHT_BOUND, INITIAL_WEIGHT_BOUND]`.
pub const INITIAL_WEIGHT_BOUND: f64 = 0.5;
/// Every cycle, each weight moves by a uniform draw from
/// `[-PERTURBATION_BOUND, PERTURBATION_BOUND]`.
pub const PERTURBATION_BOUND: f64 = 0.02;

const HIDDEN_LENGTH_MULTIPLIER: usize = 3;
const HIDDEN_LENGTH_DIVISOR: usize = 2;

/// Layer sizes of a network.
///
/// `input_len` includes the input bias unit. `hidden_len` excludes the
/// hidden bias unit and is always derived from `input_len`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub input_len: usize,
    pub hidden_len: usize,
    pub output_len: usize,
}

impl Dimensions {
    pub fn new(input_len: usize, output_len: usize) -> Self {
        Dimensions {
            input_len,
            hidden_len: (input_len * HIDDEN_LENGTH_MULTIPLIER) / HIDDEN_LENGTH_DIVISOR,
            output_len,
        }
    }

    /// Number of sensor bits fed to the network, i.e. inputs minus bias.
    pub fn feature_bits(&self) -> usize {
        self.input_len.saturating_sub(1)
    }
}

/// Whether the hidden layer sees its own previous activations.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    /// Plain feed-forward network.
    #[default]
    Disabled,
    /// A context layer holds the previous cycle's hidden activations and
    /// feeds them back into the hidden layer.
    Context,
}

/// A fixed-topology multilayer perceptron.
#[derive(Clone, Debug, Serialize)]
pub struct Network {
    dims: Dimensions,
    input: Layer,
    hidden: Layer,
    output: Layer,
    context: Option<Layer>,
    epoch_error: f64,
    #[serde(skip)]
    rng: ChaCha12Rng,
}

impl Network {
    /// Allocates and seeds a new, untrained network.
    ///
    /// Sizes must already have been validated against the layer bounds,
    /// see `Config::validate`.
    pub fn initialize(dims: Dimensions, recurrence: Recurrence, mut rng: ChaCha12Rng) -> Self {
        let hidden_units = dims.hidden_len + 1;
        let mut draw = || rng.random_range(-INITIAL_WEIGHT_BOUND..=INITIAL_WEIGHT_BOUND);
        let input = Layer::new(dims.input_len, true, hidden_units, &mut draw);
        let hidden = Layer::new(hidden_units, true, dims.output_len, &mut draw);
        let output = Layer::new(dims.output_len, false, 0, &mut draw);
        let context = match recurrence {
            Recurrence::Disabled => None,
            Recurrence::Context => Some(Layer::new(hidden_units, false, hidden_units, &mut draw)),
        };
        Network {
            dims,
            input,
            hidden,
            output,
            context,
            epoch_error: 0.0,
            rng,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn recurrence(&self) -> Recurrence {
        if self.context.is_some() {
            Recurrence::Context
        } else {
            Recurrence::Disabled
        }
    }

    pub fn input_layer(&self) -> &Layer {
        &self.input
    }

    pub fn hidden_layer(&self) -> &Layer {
        &self.hidden
    }

    pub fn output_layer(&self) -> &Layer {
        &self.output
    }

    pub fn context_layer(&self) -> Option<&Layer> {
        self.context.as_ref()
    }

    /// Returns the current output activations.
    pub fn outputs(&self) -> Vec<f64> {
        self.output.activations().collect()
    }

    /// Copies the decoded sensor bits into the non-bias input units.
    pub fn set_inputs(&mut self, bits: &[bool]) {
        assert_eq!(bits.len(), self.dims.feature_bits());
        for (unit, &bit) in self.input.units_mut()[1..].iter_mut().zip(bits) {
            unit.activation = if bit { 1.0 } else { 0.0 };
        }
    }

    /// Feeds the current input activations forward through the network.
    ///
    /// Nets are only ever added to here; they must be zero on entry, which
    /// `end_of_cycle` guarantees.
    pub fn forward(&mut self) {
        for i in 1..=self.dims.hidden_len {
            let mut net = self.hidden[i].net;
            net += weighted_sum(self.input.units(), i);
            if let Some(context) = &self.context {
                net += weighted_sum(context.units(), i);
            }
            let unit = &mut self.hidden[i];
            unit.net = net;
            unit.activation = sigmoid(net);
        }

        if let Some(context) = &mut self.context {
            for i in 1..=self.dims.hidden_len {
                context[i].activation = self.hidden[i].activation;
            }
        }

        for k in 0..self.dims.output_len {
            let net = self.output[k].net + weighted_sum(self.hidden.units(), k);
            let unit = &mut self.output[k];
            unit.net = net;
            unit.activation = sigmoid(net);
        }
    }

    /// Computes `target - activation` for every output unit.
    pub fn output_errors(&self, targets: &[f64]) -> Vec<f64> {
        assert_eq!(targets.len(), self.dims.output_len);
        self.output
            .activations()
            .zip(targets)
            .map(|(a, t)| t - a)
            .collect()
    }

    /// Feeds the provided `output_errors` backwards through the network and
    /// applies the resulting momentum updates to every weight.
    pub fn backward(&mut self, output_errors: &[f64]) {
        assert_eq!(output_errors.len(), self.dims.output_len);
        let hidden_units = self.dims.hidden_len + 1;
        let outputs = 0..self.dims.output_len;

        for (unit, &error) in self.output.units_mut().iter_mut().zip(output_errors) {
            unit.error = error;
            unit.delta = error * sigmoid_prime(unit.activation);
        }
        let output_deltas: Vec<f64> = self.output.units().iter().map(|u| u.delta).collect();

        for unit in self.hidden.units_mut() {
            for (&w, &d) in unit.weights.iter().zip(&output_deltas) {
                unit.error += d * w;
            }
            unit.delta = unit.error * sigmoid_prime(unit.activation);
            for (wed, &d) in unit.weight_error_deriv.iter_mut().zip(&output_deltas) {
                *wed += d * unit.activation;
            }
        }
        let hidden_deltas: Vec<f64> = self.hidden.units().iter().map(|u| u.delta).collect();

        accumulate_derivatives(self.input.units_mut(), &hidden_deltas, 0..hidden_units);
        if let Some(context) = &mut self.context {
            accumulate_derivatives(
                &mut context.units_mut()[1..],
                &hidden_deltas,
                1..hidden_units,
            );
        }

        for unit in self.hidden.units_mut() {
            unit.apply_gradient(outputs.clone(), LEARNING_RATE, MOMENTUM);
        }
        for unit in self.input.units_mut() {
            unit.apply_gradient(0..hidden_units, LEARNING_RATE, MOMENTUM);
        }
        if let Some(context) = &mut self.context {
            for unit in &mut context.units_mut()[1..] {
                unit.apply_gradient(1..hidden_units, LEARNING_RATE, MOMENTUM);
            }
        }
    }

    /// Clears per-cycle state and perturbs every weight.
    ///
    /// Runs after every cycle, whether or not the network was trained.
    pub fn end_of_cycle(&mut self) {
        for unit in self.output.units_mut() {
            unit.net = 0.0;
        }
        self.hidden.clear_cycle_state();
        self.input.clear_cycle_state();
        for unit in self.hidden.units_mut() {
            unit.perturb(&mut self.rng, PERTURBATION_BOUND);
        }
        for unit in self.input.units_mut() {
            unit.perturb(&mut self.rng, PERTURBATION_BOUND);
        }
        if let Some(context) = &mut self.context {
            context.clear_cycle_state();
            for unit in context.units_mut() {
                unit.perturb(&mut self.rng, PERTURBATION_BOUND);
            }
        }
    }

    /// Within each output group, drives the most active unit(s) to exactly
    /// 1.0. The other units are left as they are.
    pub fn winner_take_all(&mut self, groups: &[Range<usize>]) {
        for group in groups {
            let group = clip(group, self.dims.output_len);
            let units = &mut self.output.units_mut()[group];
            let activations: Vec<f64> = units.iter().map(|u| u.activation).collect();
            for i in argmax_all(&activations) {
                units[i].activation = 1.0;
            }
        }
    }

    /// Returns which outputs are fully on, i.e. the winners selected by
    /// `winner_take_all`.
    pub fn decision_bits(&self) -> Vec<bool> {
        self.output.activations().map(|a| a == 1.0).collect()
    }

    /// Adds the absolute output errors against `targets` to the epoch error,
    /// returning the amount added.
    pub fn accumulate_epoch_error(&mut self, targets: &[f64]) -> f64 {
        assert_eq!(targets.len(), self.dims.output_len);
        let added: f64 = self
            .output
            .activations()
            .zip(targets)
            .map(|(a, t)| (t - a).abs())
            .sum();
        self.epoch_error += added;
        added
    }

    pub fn epoch_error(&self) -> f64 {
        self.epoch_error
    }

    pub fn reset_epoch_error(&mut self) {
        self.epoch_error = 0.0;
    }

    /// Returns every weight in the network.
    pub fn weights(&self) -> impl Iterator<Item = f64> + '_ {
        self.input
            .weights()
            .chain(self.hidden.weights())
            .chain(self.context.iter().flat_map(|c| c.weights()))
    }
}

/// Sums `activation * weights[target]` over `units`.
fn weighted_sum(units: &[Unit], target: usize) -> f64 {
    units.iter().map(|u| u.activation * u.weights[target]).sum()
}

/// Accumulates `delta[j] * activation` into each unit's derivative `j`.
fn accumulate_derivatives(units: &mut [Unit], deltas: &[f64], targets: Range<usize>) {
    for unit in units {
        let activation = unit.activation;
        let derivs = &mut unit.weight_error_deriv[targets.clone()];
        for (wed, &delta) in derivs.iter_mut().zip(&deltas[targets.clone()]) {
            *wed += delta * activation;
        }
    }
}

fn write_layer(f: &mut fmt::Formatter, name: &str, layer: &Layer) -> fmt::Result {
    writeln!(f, "{} layer ({} units)", name, layer.len())?;
    for (i, unit) in layer.units().iter().enumerate() {
        let bias = if layer.has_bias() && i == 0 { " (bias)" } else { "" };
        writeln!(
            f,
            "  #{}{}: net={:.6} activation={:.6} error={:.6}",
            i, bias, unit.net, unit.activation, unit.error
        )?;
        if !unit.weights.is_empty() {
            let weights: Vec<String> = unit.weights.iter().map(|w| format!("{:.4}", w)).collect();
            writeln!(f, "      weights=[{}]", weights.join(", "))?;
        }
    }
    Ok(())
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_layer(f, "input", &self.input)?;
        write_layer(f, "hidden", &self.hidden)?;
        if let Some(context) = &self.context {
            write_layer(f, "context", context)?;
        }
        write_layer(f, "output", &self.output)?;
        write!(f, "epoch error: {:.6}", self.epoch_error)
    }
}
