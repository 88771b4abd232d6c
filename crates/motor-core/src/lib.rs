pub mod command;
#[cfg(feature = "simulation")]
pub mod device_sim;
pub mod link;
pub mod sample;
pub mod tags;
pub mod window;

pub use command::{Direction, GainField, MotorCommand, PidParameters, ValidationError};
#[cfg(feature = "simulation")]
pub use device_sim::{SimConfig, SimulatedDevice};
pub use link::{Link, LinkError, LinkState};
pub use sample::TelemetrySample;
pub use window::{SlidingWindow, WindowSnapshot, WindowStore, DEFAULT_WINDOW_CAPACITY};
