mod common;

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use common::{test_config, Call, RecordingActuator};
use elf::devices::{HeadPose, MotionCommand, Point3, Pose};
use elf::kernel::motion::{MotionGate, MotionGateState, STARTLE_ANTENNAS};

fn glance() -> MotionCommand {
    MotionCommand::Glance {
        target: Point3 { x: 0.4, y: 0.1, z: 0.0 },
        duration: Duration::from_secs(1),
        wiggle_antennas: false,
    }
}

fn sample_pose() -> Pose {
    Pose {
        head: HeadPose { yaw: 0.3, pitch: -0.1, ..HeadPose::default() },
        antennas: [0.2, -0.2],
    }
}

#[test]
fn test_freeze_is_idempotent() {
    let actuator = RecordingActuator::new();
    *actuator.pose.lock().unwrap() = sample_pose();
    let mut gate = MotionGate::new(actuator.clone(), &test_config());

    gate.freeze();
    gate.freeze();

    assert_eq!(actuator.calls(), vec![Call::CurrentPose, Call::Hold(sample_pose())]);
    assert_eq!(
        gate.state(),
        &MotionGateState { frozen: true, held_pose: Some(sample_pose()) }
    );
}

#[test]
fn test_frozen_gate_drops_commands() {
    let actuator = RecordingActuator::new();
    let mut gate = MotionGate::new(actuator.clone(), &test_config());

    assert!(gate.issue(glance()));
    gate.freeze();
    actuator.clear();

    assert!(!gate.issue(glance()), "Frozen gate must swallow motion");
    assert!(actuator.calls().is_empty());

    gate.unfreeze();
    assert!(gate.issue(glance()));
    assert_eq!(actuator.glances(), 1);
}

#[test]
fn test_freeze_unfreeze_round_trip() {
    let actuator = RecordingActuator::new();
    let mut gate = MotionGate::new(actuator.clone(), &test_config());
    let before = gate.state().clone();

    gate.freeze();
    gate.unfreeze();
    assert_eq!(gate.state(), &before, "No held pose may leak past unfreeze");

    gate.unfreeze();
    assert_eq!(gate.state(), &before);
}

#[test]
fn test_held_pose_not_overwritten_while_frozen() {
    let actuator = RecordingActuator::new();
    *actuator.pose.lock().unwrap() = sample_pose();
    let mut gate = MotionGate::new(actuator.clone(), &test_config());

    gate.freeze();
    *actuator.pose.lock().unwrap() = Pose::default();
    gate.freeze();

    assert_eq!(gate.state().held_pose, Some(sample_pose()));
}

#[test]
fn test_pose_read_failure_still_freezes() {
    let actuator = RecordingActuator::new();
    actuator.fail_pose.store(true, Ordering::SeqCst);
    let mut gate = MotionGate::new(actuator.clone(), &test_config());

    gate.freeze();
    assert!(gate.is_frozen());
    assert_eq!(gate.state().held_pose, None);
    assert_eq!(actuator.holds(), 0, "No hold without a pose");

    // Later freezes do not retry the read.
    gate.freeze();
    assert_eq!(actuator.calls(), vec![Call::CurrentPose]);
    assert!(!gate.issue(glance()));
}

#[test]
fn test_actuator_fault_is_contained() {
    let actuator = RecordingActuator::new();
    actuator.fail_commands.store(true, Ordering::SeqCst);
    let mut gate = MotionGate::new(actuator.clone(), &test_config());

    assert!(!gate.issue(glance()), "Failed delivery reports false, never panics");
    assert!(!gate.is_frozen());
}

#[tokio::test]
async fn test_startle_gestures_then_freezes() {
    let mut config = test_config();
    config.startle_gesture_ms = 50;
    let actuator = RecordingActuator::new();
    let mut gate = MotionGate::new(actuator.clone(), &config);

    let started = Instant::now();
    gate.express_startle().await;
    assert!(started.elapsed() >= Duration::from_millis(50));

    let (left, right) = STARTLE_ANTENNAS;
    let calls = actuator.calls();
    assert_eq!(calls[0], Call::Command(MotionCommand::SetAntennas { left, right }));
    assert_eq!(calls[1], Call::CurrentPose);
    assert!(gate.is_frozen());

    // Already frozen: no second gesture.
    actuator.clear();
    gate.express_startle().await;
    assert!(actuator.calls().is_empty());
}
