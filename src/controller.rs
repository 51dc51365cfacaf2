//! The engine controller: a small state machine that owns the network and
//! drives it one transport cycle at a time.
//!
//! ```text
//! Unconfigured --configure--> Initialized --start--> Running --> Stopped
//!                                                       ^           |
//!                                                       +---start---+
//! ```

use crate::codec::{describe, PatternCodec};
use crate::config::{Config, ConfigError, Schedule};
use crate::network::Network;
use crate::transport::{Transport, TransportError};

use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// The velocity and steering output groups of the reference layout.
pub const DEFAULT_OUTPUT_GROUPS: [Range<usize>; 2] = [0..4, 4..7];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineState {
    Unconfigured,
    Initialized,
    Running,
    Stopped,
}

/// Whether a run trains the network or only queries it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Training,
    Inference,
}

/// Why a run left the `Running` state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// An epoch finished with its error below the threshold.
    Converged,
    /// A stop was requested through a `StopHandle`.
    Requested,
    /// The producer side of the transport went away.
    Disconnected,
    /// The run reached `Schedule::max_epochs`.
    EpochLimit,
}

/// What a single run did.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub mode: Mode,
    /// Completed cycles.
    pub cycles: u64,
    /// Completed epochs.
    pub epochs: u64,
    /// Accumulated error of the last completed epoch, if any.
    pub last_epoch_error: Option<f64>,
    pub reason: StopReason,
}

/// A cooperative stop flag shared with a running controller.
///
/// The flag is only looked at between cycles, so the cycle in flight always
/// completes. Every `start` clears it, so a request only ever ends the run
/// in progress.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("controller is already configured")]
    AlreadyConfigured,
    #[error("controller has not been configured")]
    NotConfigured,
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),
}

/// The network together with the codec sized for it.
#[derive(Debug)]
struct Engine {
    network: Network,
    codec: PatternCodec,
}

impl Engine {
    /// Runs one decode, forward, (backward,) publish cycle.
    fn cycle<T: Transport>(
        &mut self,
        transport: &mut T,
        mode: Mode,
        groups: &[Range<usize>],
    ) -> Result<(), TransportError> {
        let raw = transport.recv_input()?;
        trace!(report = %describe(&raw), "received input vector");
        let pattern = self.codec.decode(&raw);
        self.network.set_inputs(&pattern.inputs);
        self.network.forward();
        debug!(outputs = ?self.network.outputs(), "forward pass");

        match mode {
            Mode::Training => {
                let targets = pattern.target_activations();
                let errors = self.network.output_errors(&targets);
                self.network.accumulate_epoch_error(&targets);
                self.network.backward(&errors);
                self.network.end_of_cycle();
                transport.acknowledge()
            }
            Mode::Inference => {
                self.network.end_of_cycle();
                self.network.winner_take_all(groups);
                let decision = self.codec.encode(&self.network.decision_bits());
                trace!(report = %describe(&decision), "publishing decision");
                transport.send_output(decision)?;
                transport.wait_ack()
            }
        }
    }
}

/// Owns a network and a transport and runs cycles between them.
#[derive(Debug)]
pub struct Controller<T: Transport> {
    transport: T,
    state: EngineState,
    training_enabled: bool,
    schedule: Schedule,
    output_groups: Vec<Range<usize>>,
    stop: StopHandle,
    engine: Option<Engine>,
}

impl<T: Transport> Controller<T> {
    /// Creates an unconfigured controller on top of `transport`.
    pub fn new(transport: T) -> Self {
        Controller {
            transport,
            state: EngineState::Unconfigured,
            training_enabled: false,
            schedule: Schedule::default(),
            output_groups: DEFAULT_OUTPUT_GROUPS.to_vec(),
            stop: StopHandle::default(),
            engine: None,
        }
    }

    /// Validates `config` and allocates the network.
    ///
    /// A controller is configured exactly once; later calls are rejected
    /// and leave the existing network untouched.
    pub fn configure(&mut self, config: Config) -> Result<(), ControllerError> {
        if self.engine.is_some() {
            warn!("controller is already configured, ignoring new configuration");
            return Err(ControllerError::AlreadyConfigured);
        }
        if let Err(e) = config.validate() {
            warn!(error = %e, "rejected configuration");
            return Err(e.into());
        }

        let dims = config.dimensions();
        let seed = config.seed.unwrap_or_else(rand::random);
        info!(
            input_len = dims.input_len,
            hidden_len = dims.hidden_len,
            output_len = dims.output_len,
            recurrence = ?config.recurrence,
            training = config.training_enabled,
            seed,
            "configuring engine"
        );
        let rng = ChaCha12Rng::seed_from_u64(seed);
        self.engine = Some(Engine {
            network: Network::initialize(dims, config.recurrence, rng),
            codec: PatternCodec::for_dimensions(&dims),
        });
        self.training_enabled = config.training_enabled;
        self.schedule = config.schedule;
        self.state = EngineState::Initialized;
        Ok(())
    }

    /// Selects the mode of the next run. A run in progress is unaffected.
    pub fn set_training_enabled(&mut self, enabled: bool) {
        self.training_enabled = enabled;
    }

    pub fn training_enabled(&self) -> bool {
        self.training_enabled
    }

    /// Replaces the winner-take-all groups used in inference mode.
    pub fn set_output_groups(&mut self, groups: Vec<Range<usize>>) {
        self.output_groups = groups;
    }

    /// Runs cycles until the stop policy fires, a stop is requested or the
    /// transport disconnects.
    ///
    /// Blocks the calling thread for the whole run. Use `stop_handle` to
    /// end it from elsewhere.
    pub fn start(&mut self) -> Result<RunSummary, ControllerError> {
        let engine = match self.engine.as_mut() {
            Some(engine) => engine,
            None => {
                warn!("start requested before configure, ignoring");
                return Err(ControllerError::NotConfigured);
            }
        };

        let mode = if self.training_enabled {
            Mode::Training
        } else {
            Mode::Inference
        };
        let cycles_per_epoch = u64::from(self.schedule.cycles_per_epoch);
        let mut summary = RunSummary {
            mode,
            cycles: 0,
            epochs: 0,
            last_epoch_error: None,
            reason: StopReason::Requested,
        };
        self.stop.clear();
        self.state = EngineState::Running;
        info!(?mode, "engine running");

        let outcome = loop {
            if self.stop.is_requested() {
                break Ok(StopReason::Requested);
            }
            match engine.cycle(&mut self.transport, mode, &self.output_groups) {
                Ok(()) => {}
                Err(TransportError::Disconnected) => break Ok(StopReason::Disconnected),
                Err(e) => break Err(e),
            }
            summary.cycles += 1;

            if summary.cycles % cycles_per_epoch == 0 {
                summary.epochs += 1;
                let error = engine.network.epoch_error();
                info!(epoch = summary.epochs, error, "epoch complete");
                engine.network.reset_epoch_error();
                summary.last_epoch_error = Some(error);
                if error < self.schedule.error_threshold {
                    break Ok(StopReason::Converged);
                }
                if self.schedule.max_epochs == Some(summary.epochs) {
                    break Ok(StopReason::EpochLimit);
                }
            }
        };

        self.state = EngineState::Stopped;
        summary.reason = outcome?;
        info!(
            reason = ?summary.reason,
            cycles = summary.cycles,
            epochs = summary.epochs,
            "engine stopped"
        );
        Ok(summary)
    }

    /// Requests the current run to stop at the next cycle boundary.
    pub fn stop(&self) {
        info!("stop requested");
        self.stop.stop();
    }

    /// Returns a handle that can stop this controller from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Logs the state of every unit in the network.
    pub fn display(&self) -> Result<(), ControllerError> {
        match &self.engine {
            Some(engine) => {
                info!("network state\n{}", engine.network);
                Ok(())
            }
            None => {
                warn!("display requested before configure");
                Err(ControllerError::NotConfigured)
            }
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn network(&self) -> Option<&Network> {
        self.engine.as_ref().map(|engine| &engine.network)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{raw_from_word, word_from_raw, RawVector};
    use crate::scenarios::{canned_vectors, spawn_replay, CANNED};
    use crate::transport::{channel, Outbound};
    use std::collections::VecDeque;

    /// Serves a fixed list of inputs, then reports a disconnect.
    #[derive(Debug, Default)]
    struct ScriptedTransport {
        inputs: VecDeque<RawVector>,
        outputs: Vec<Outbound>,
        acks: usize,
        received: usize,
        stop_at: Option<(usize, StopHandle)>,
    }

    impl ScriptedTransport {
        fn new(inputs: &[RawVector]) -> Self {
            ScriptedTransport {
                inputs: inputs.iter().cloned().collect(),
                ..ScriptedTransport::default()
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn recv_input(&mut self) -> Result<RawVector, TransportError> {
            let raw = self.inputs.pop_front().ok_or(TransportError::Disconnected)?;
            self.received += 1;
            if let Some((at, handle)) = self.stop_at.take() {
                if at == self.received {
                    handle.stop();
                } else {
                    self.stop_at = Some((at, handle));
                }
            }
            Ok(raw)
        }

        fn send_output(&mut self, raw: RawVector) -> Result<(), TransportError> {
            self.outputs.push(Outbound::Decision(raw));
            Ok(())
        }

        fn acknowledge(&mut self) -> Result<(), TransportError> {
            self.outputs.push(Outbound::Ack);
            Ok(())
        }

        fn wait_ack(&mut self) -> Result<(), TransportError> {
            self.acks += 1;
            Ok(())
        }
    }

    fn scenarios(count: usize) -> Vec<RawVector> {
        canned_vectors().into_iter().take(count).collect()
    }

    fn config(training: bool, cycles_per_epoch: u32, threshold: f64) -> Config {
        let mut config = Config::new(25, 7, training);
        config.seed = Some(17);
        config.schedule.cycles_per_epoch = cycles_per_epoch;
        config.schedule.error_threshold = threshold;
        config
    }

    fn controller(inputs: &[RawVector], config: Config) -> Controller<ScriptedTransport> {
        let mut controller = Controller::new(ScriptedTransport::new(inputs));
        controller.configure(config).unwrap();
        controller
    }

    #[test]
    fn start_before_configure_is_rejected() {
        let mut controller = Controller::new(ScriptedTransport::new(&scenarios(3)));
        assert!(matches!(
            controller.start(),
            Err(ControllerError::NotConfigured)
        ));
        assert!(matches!(
            controller.display(),
            Err(ControllerError::NotConfigured)
        ));
        assert_eq!(controller.state(), EngineState::Unconfigured);
        assert_eq!(controller.transport().inputs.len(), 3);
    }

    #[test]
    fn configure_happens_once() {
        let mut controller = controller(&[], Config::default());
        assert_eq!(controller.state(), EngineState::Initialized);
        assert!(controller.training_enabled());

        let result = controller.configure(Config::new(9, 3, false));
        assert!(matches!(result, Err(ControllerError::AlreadyConfigured)));
        assert_eq!(controller.state(), EngineState::Initialized);
        assert!(controller.training_enabled());
        let network = controller.network().unwrap();
        assert_eq!(network.dimensions().input_len, 25);
        assert!(controller.display().is_ok());
    }

    #[test]
    fn oversized_configuration_is_rejected() {
        let mut controller = Controller::new(ScriptedTransport::new(&[]));
        let result = controller.configure(Config::new(25, 9, true));
        assert!(matches!(
            result,
            Err(ControllerError::Config(ConfigError::VectorWidth { bits: 33, .. }))
        ));
        assert_eq!(controller.state(), EngineState::Unconfigured);
        assert!(controller.network().is_none());

        // a rejected configuration does not use up the controller
        assert!(controller.configure(Config::default()).is_ok());
    }

    #[test]
    fn lenient_threshold_stops_after_one_epoch() {
        let mut controller = controller(&scenarios(10), config(true, 4, 1e9));
        let summary = controller.start().unwrap();
        assert_eq!(summary.mode, Mode::Training);
        assert_eq!(summary.reason, StopReason::Converged);
        assert_eq!(summary.cycles, 4);
        assert_eq!(summary.epochs, 1);
        assert!(summary.last_epoch_error.unwrap() > 0.0);
        assert_eq!(controller.state(), EngineState::Stopped);
        assert_eq!(controller.network().unwrap().epoch_error(), 0.0);

        let transport = controller.into_transport();
        assert_eq!(transport.inputs.len(), 6);
        assert_eq!(transport.outputs, vec![Outbound::Ack; 4]);
        assert_eq!(transport.acks, 0);
    }

    #[test]
    fn zero_threshold_runs_until_disconnect() {
        let mut controller = controller(&scenarios(10), config(true, 4, 0.0));
        let summary = controller.start().unwrap();
        assert_eq!(summary.reason, StopReason::Disconnected);
        assert_eq!(summary.cycles, 10);
        assert_eq!(summary.epochs, 2);
        // two cycles of the unfinished epoch are still accumulated
        assert!(controller.network().unwrap().epoch_error() > 0.0);
    }

    #[test]
    fn epoch_limit_ends_the_run() {
        let mut config = config(true, 2, 0.0);
        config.schedule.max_epochs = Some(3);
        let mut controller = controller(&scenarios(10), config);
        let summary = controller.start().unwrap();
        assert_eq!(summary.reason, StopReason::EpochLimit);
        assert_eq!(summary.cycles, 6);
        assert_eq!(summary.epochs, 3);
    }

    #[test]
    fn inference_publishes_one_decision_per_cycle() {
        let mut controller = controller(&scenarios(5), config(false, 3, 45.0));
        let summary = controller.start().unwrap();
        assert_eq!(summary.mode, Mode::Inference);
        // inference leaves the epoch error at zero
        assert_eq!(summary.reason, StopReason::Converged);
        assert_eq!(summary.cycles, 3);
        assert_eq!(summary.last_epoch_error, Some(0.0));

        let transport = controller.into_transport();
        assert_eq!(transport.acks, 3);
        assert_eq!(transport.outputs.len(), 3);
        for output in &transport.outputs {
            let word = match output {
                Outbound::Decision(raw) => word_from_raw(raw),
                Outbound::Ack => panic!("inference cycle posted an ack"),
            };
            assert_eq!(word & 0x80ff_ffff, 0);
            assert_ne!(word & 0x0f00_0000, 0);
            assert_ne!(word & 0x7000_0000, 0);
        }
    }

    #[test]
    fn one_cycle_adds_pre_update_error() {
        let raw = raw_from_word(CANNED[0]);
        let mut controller = controller(&[raw], config(true, 84, 45.0));

        let mut expected = controller.network().unwrap().clone();
        let pattern = PatternCodec::for_dimensions(&expected.dimensions()).decode(&raw);
        expected.set_inputs(&pattern.inputs);
        expected.forward();
        let targets = pattern.target_activations();
        let error: f64 = expected
            .outputs()
            .iter()
            .zip(&targets)
            .map(|(a, t)| (t - a).abs())
            .sum();

        let summary = controller.start().unwrap();
        assert_eq!(summary.cycles, 1);
        assert_eq!(summary.epochs, 0);
        let network = controller.network().unwrap();
        assert!((network.epoch_error() - error).abs() < 1e-12);
        assert!(!network.weights().eq(expected.weights()));
    }

    #[test]
    fn stop_request_ends_run_at_cycle_boundary() {
        let mut controller = controller(&scenarios(10), config(true, 84, 0.0));
        let handle = controller.stop_handle();
        controller.transport_mut().stop_at = Some((2, handle.clone()));

        let summary = controller.start().unwrap();
        assert_eq!(summary.reason, StopReason::Requested);
        assert_eq!(summary.cycles, 2);
        assert_eq!(controller.transport().outputs.len(), 2);
        assert!(handle.is_requested());

        // a stopped controller can be started again
        let summary = controller.start().unwrap();
        assert_eq!(summary.reason, StopReason::Disconnected);
        assert_eq!(summary.cycles, 8);
    }

    #[test]
    fn stop_between_runs_does_not_cancel_the_next_run() {
        let mut controller = controller(&scenarios(10), config(true, 4, 1e9));
        assert_eq!(controller.start().unwrap().cycles, 4);
        assert_eq!(controller.state(), EngineState::Stopped);

        controller.stop();
        let summary = controller.start().unwrap();
        assert_eq!(summary.reason, StopReason::Converged);
        assert_eq!(summary.cycles, 4);
        assert_eq!(controller.transport().inputs.len(), 2);
    }

    #[test]
    fn stop_before_first_start_is_discarded() {
        let (producer, transport) = channel();
        let replay = spawn_replay(producer, canned_vectors());
        let mut controller = Controller::new(transport);
        controller.configure(config(true, 84, 1e9)).unwrap();

        controller.stop();
        let summary = controller.start().unwrap();
        assert_eq!(summary.reason, StopReason::Converged);
        assert_eq!(summary.cycles, 84);
        drop(controller);
        assert_eq!(replay.join().unwrap().acks, 84);
    }

    #[test]
    fn mode_is_taken_at_start() {
        let mut controller = controller(&scenarios(6), config(true, 3, 1e9));
        assert_eq!(controller.start().unwrap().mode, Mode::Training);
        controller.set_training_enabled(false);
        assert_eq!(controller.start().unwrap().mode, Mode::Inference);

        let transport = controller.into_transport();
        assert_eq!(&transport.outputs[..3], &[Outbound::Ack; 3]);
        assert!(transport.outputs[3..]
            .iter()
            .all(|o| matches!(o, Outbound::Decision(_))));
    }

    #[test]
    fn trains_then_infers_over_channels() {
        let (producer, transport) = channel();
        let replay = spawn_replay(producer, canned_vectors());

        let mut config = config(true, 84, 0.0);
        config.schedule.max_epochs = Some(1);
        let mut controller = Controller::new(transport);
        controller.configure(config).unwrap();

        let training = controller.start().unwrap();
        assert_eq!(training.reason, StopReason::EpochLimit);
        assert_eq!(training.cycles, 84);

        controller.set_training_enabled(false);
        let inference = controller.start().unwrap();
        assert_eq!(inference.mode, Mode::Inference);
        assert_eq!(inference.cycles, 84);
        drop(controller);

        let stats = replay.join().unwrap();
        assert_eq!(stats.acks, 84);
        assert_eq!(stats.decisions.len(), 84);
        assert!(stats.sent >= 168);
    }
}
