use crate::utils::ZeroOut;

use itertools::multizip;
use rand::Rng;

/// Upper bound on the number of outgoing weights a single unit may carry.
///
/// Every layer size is checked against this at configuration time, so
/// `forward` and `backward` never index past a unit's weight vectors.
pub const MAX_FAN_OUT: usize = 50;

/// Lower and upper bounds for any weight after a training update.
pub const WEIGHT_BOUND: f64 = 10.0;

/// A single neuron's state.
///
/// Weights are stored on the *sending* unit, indexed by the position of the
/// receiving unit in the next layer.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Unit {
    /// Accumulated weighted input.
    pub net: f64,
    /// Output after squashing.
    pub activation: f64,
    /// Injected (output layer) or back-propagated (hidden layer) error.
    pub error: f64,
    /// Local gradient.
    pub delta: f64,
    /// Weights to the next layer.
    pub weights: Vec<f64>,
    /// Accumulated weight error derivatives, one per weight.
    pub weight_error_deriv: Vec<f64>,
    /// The last update applied to each weight, kept for momentum.
    pub delta_weights: Vec<f64>,
}

impl Unit {
    /// Creates a unit with `fan_out` weights drawn by `draw`.
    fn new<F>(fan_out: usize, mut draw: F) -> Self
    where
        F: FnMut() -> f64,
    {
        assert!(fan_out <= MAX_FAN_OUT);
        Unit {
            weights: (0..fan_out).map(|_| draw()).collect(),
            weight_error_deriv: vec![0.0; fan_out],
            delta_weights: vec![0.0; fan_out],
            ..Unit::default()
        }
    }

    pub fn fan_out(&self) -> usize {
        self.weights.len()
    }

    /// Turns the accumulated weight error derivatives into a momentum update
    /// and applies it, clamping every weight to `WEIGHT_BOUND`.
    ///
    /// Only weights in `targets` are touched.
    pub fn apply_gradient(
        &mut self,
        targets: std::ops::Range<usize>,
        learning_rate: f64,
        momentum: f64,
    ) {
        for (w, &wed, dw) in multizip((
            self.weights[targets.clone()].iter_mut(),
            &self.weight_error_deriv[targets.clone()],
            self.delta_weights[targets].iter_mut(),
        )) {
            *dw = learning_rate * wed + momentum * *dw;
            *w = clamp_weight(*w + *dw);
        }
    }

    /// Adds a uniformly drawn value in `[-bound, bound]` to every weight.
    pub fn perturb<R: Rng + ?Sized>(&mut self, rng: &mut R, bound: f64) {
        for w in &mut self.weights {
            *w = clamp_weight(*w + rng.random_range(-bound..=bound));
        }
    }
}

/// Clamps `weight` into `[-WEIGHT_BOUND, WEIGHT_BOUND]`.
fn clamp_weight(weight: f64) -> f64 {
    weight.clamp(-WEIGHT_BOUND, WEIGHT_BOUND)
}

/// An ordered sequence of units, optionally led by a bias unit at index 0.
///
/// A bias unit has its activation pinned to 1.0 and is never written by
/// `forward`; it does carry outgoing weights like any other unit.
#[derive(Clone, Debug, Serialize)]
pub struct Layer {
    units: Vec<Unit>,
    has_bias: bool,
}

impl Layer {
    /// Allocates a layer of `len` units, each with `fan_out` weights seeded
    /// by `draw`.
    ///
    /// Arguments:
    ///
    ///  * `len` - the total number of units, including the bias unit.
    ///  * `has_bias` - whether unit 0 is a bias unit.
    ///  * `fan_out` - the size of the next layer, i.e. weights per unit.
    pub fn new<F>(len: usize, has_bias: bool, fan_out: usize, mut draw: F) -> Self
    where
        F: FnMut() -> f64,
    {
        let mut units: Vec<Unit> = (0..len).map(|_| Unit::new(fan_out, &mut draw)).collect();
        if has_bias {
            if let Some(bias) = units.first_mut() {
                bias.activation = 1.0;
            }
        }
        Layer { units, has_bias }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn has_bias(&self) -> bool {
        self.has_bias
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn units_mut(&mut self) -> &mut [Unit] {
        &mut self.units
    }

    pub fn activations(&self) -> impl Iterator<Item = f64> + '_ {
        self.units.iter().map(|u| u.activation)
    }

    /// Resets `net` and `error` on every unit and clears every weight error
    /// derivative.
    pub fn clear_cycle_state(&mut self) {
        for unit in &mut self.units {
            unit.net.zero_out();
            unit.error.zero_out();
            unit.weight_error_deriv.zero_out();
        }
    }

    /// Returns every weight in the layer.
    pub fn weights(&self) -> impl Iterator<Item = f64> + '_ {
        self.units.iter().flat_map(|u| u.weights.iter().cloned())
    }
}

impl std::ops::Index<usize> for Layer {
    type Output = Unit;

    fn index(&self, i: usize) -> &Unit {
        &self.units[i]
    }
}

impl std::ops::IndexMut<usize> for Layer {
    fn index_mut(&mut self, i: usize) -> &mut Unit {
        &mut self.units[i]
    }
}
