pub mod devices;
pub mod kernel;

// Re-export specific items for convenient access
pub use kernel::config::{BehaviorConfig, DelayRange};
pub use kernel::controller::{BehaviorController, BehaviorState, ControllerHandle};
