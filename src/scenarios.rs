//! The canned steering scenarios and a producer that replays them.
//!
//! Each entry combines the sensed state (velocity, heading, goal heading,
//! obstacle fields) with the commands a trainer expects in that state.
//! Some states deliberately appear with both steering preferences.

use crate::codec::bits::*;
use crate::codec::{describe, raw_from_word, RawVector};
use crate::transport::{Outbound, Producer};

use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

/// Number of canned scenarios, i.e. one pass over the table.
pub const CANNED_LEN: usize = 84;

/// The canned training scenarios, as 32-bit fields.
#[rustfmt::skip]
pub const CANNED: [u32; CANNED_LEN] = [
    // Heading south, goal heading north, prefers left
    INPUT_GOAL_HEADING_N | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading south, goal heading north, prefers right
    INPUT_GOAL_HEADING_N | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading west, goal heading north
    INPUT_GOAL_HEADING_N | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading east, goal heading north
    INPUT_GOAL_HEADING_N | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading north, goal heading north
    INPUT_GOAL_HEADING_N | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_STRAIGHT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_N | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading north, goal heading south, prefers left
    INPUT_GOAL_HEADING_S | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading north, goal heading south, prefers right
    INPUT_GOAL_HEADING_S | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading east, goal heading south
    INPUT_GOAL_HEADING_S | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading west, goal heading south
    INPUT_GOAL_HEADING_S | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading south, goal heading south
    INPUT_GOAL_HEADING_S | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_STRAIGHT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_S | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading east, goal heading west, prefers right
    INPUT_GOAL_HEADING_W | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading east, goal heading west, prefers left
    INPUT_GOAL_HEADING_W | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading north, goal heading west
    INPUT_GOAL_HEADING_W | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading south, goal heading west
    INPUT_GOAL_HEADING_W | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading west, goal heading west
    INPUT_GOAL_HEADING_W | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_STRAIGHT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_W | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading west, goal heading east, prefers left
    INPUT_GOAL_HEADING_E | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading west, goal heading east, prefers right
    INPUT_GOAL_HEADING_E | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_W | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading north, goal heading east
    INPUT_GOAL_HEADING_E | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_N | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading south, goal heading east
    INPUT_GOAL_HEADING_E | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_S | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    // Heading east, goal heading east
    INPUT_GOAL_HEADING_E | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_STRAIGHT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_A | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_B | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_RIGHT,
    INPUT_GOAL_HEADING_E | INPUT_HEADING_E | INPUT_VELOCITY_FWD1 | INPUT_OBSTACLE_FIELD_C | OUTPUT_VELOCITY_FWD1 | OUTPUT_STEER_LEFT,
];

/// Returns the canned scenarios in wire form.
pub fn canned_vectors() -> Vec<RawVector> {
    CANNED.iter().map(|&word| raw_from_word(word)).collect()
}

/// What a replay producer observed before the controller went away.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Input vectors handed to the controller.
    pub sent: usize,
    /// Training cycles acknowledged.
    pub acks: usize,
    /// Decisions received during inference.
    pub decisions: Vec<RawVector>,
}

/// Feeds `vectors` to the controller in a loop, waiting for the outcome of
/// every cycle and confirming each decision.
///
/// Returns once the controller side of the transport has been dropped.
pub fn replay(producer: Producer, vectors: Vec<RawVector>) -> ReplayStats {
    let mut stats = ReplayStats::default();
    if vectors.is_empty() {
        return stats;
    }
    for raw in vectors.iter().cycle() {
        if producer.send_input(*raw).is_err() {
            break;
        }
        stats.sent += 1;
        trace!(report = %describe(raw), "sent input vector");
        match producer.recv_output() {
            Ok(Outbound::Ack) => stats.acks += 1,
            Ok(Outbound::Decision(decision)) => {
                debug!(report = %describe(&decision), "received decision");
                stats.decisions.push(decision);
                if producer.send_ack().is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    stats
}

/// Runs `replay` on its own thread.
pub fn spawn_replay(producer: Producer, vectors: Vec<RawVector>) -> JoinHandle<ReplayStats> {
    thread::spawn(move || replay(producer, vectors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Pattern, PatternCodec};
    use crate::network::Dimensions;

    fn decode_all() -> Vec<Pattern> {
        let codec = PatternCodec::for_dimensions(&Dimensions::new(25, 7));
        canned_vectors().iter().map(|raw| codec.decode(raw)).collect()
    }

    #[test]
    fn every_scenario_has_one_velocity_and_one_steering_target() {
        for (i, pattern) in decode_all().iter().enumerate() {
            let velocity = pattern.targets[..4].iter().filter(|&&t| t).count();
            let steering = pattern.targets[4..].iter().filter(|&&t| t).count();
            assert_eq!((velocity, steering), (1, 1), "scenario {}", i);
        }
    }

    #[test]
    fn every_scenario_senses_velocity_and_headings() {
        for word in CANNED.iter() {
            assert_ne!(word & 0x0000_000f, 0);
            assert_ne!(word & 0x0000_0ff0, 0);
            assert_ne!(word & 0x0000_f000, 0);
            assert_eq!(word & 0x8000_0000, 0);
        }
    }

    #[test]
    fn first_scenario_is_the_reference_case() {
        assert_eq!(
            CANNED[0],
            INPUT_HEADING_S
                | INPUT_GOAL_HEADING_N
                | INPUT_VELOCITY_FWD1
                | OUTPUT_VELOCITY_FWD1
                | OUTPUT_STEER_LEFT
        );
    }

    #[test]
    fn replay_stops_when_the_controller_goes_away() {
        let (producer, mut transport) = crate::transport::channel();
        let handle = spawn_replay(producer, canned_vectors());

        use crate::transport::Transport;
        assert_eq!(transport.recv_input(), Ok(canned_vectors()[0]));
        transport.acknowledge().unwrap();
        assert_eq!(transport.recv_input(), Ok(canned_vectors()[1]));
        transport.send_output([0, 0, 0, 0x14]).unwrap();
        transport.wait_ack().unwrap();
        drop(transport);

        let stats = handle.join().unwrap();
        assert_eq!(stats.acks, 1);
        assert_eq!(stats.decisions, vec![[0, 0, 0, 0x14]]);
        assert!(stats.sent >= 2);
    }
}
