pub mod controller;
/// Adaptive and fixed-step time integration of one trial.
pub mod integrator;
/// Four-node thermal model of the room.
pub mod room;

pub use controller::{ControlConfig, CoolingController, SigmoidalController};
pub use integrator::{IntegrationMethod, Integrator, IntegratorConfig, Trajectory, TrialResult};
pub use room::{InitialTemperatures, PhysicalConfig, RoomModel, SystemState, ThermalModel};
