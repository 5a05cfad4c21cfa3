pub mod reservation;
pub mod sweeper;

pub use reservation::{ReservationService, ReserveRequest, StatsSnapshot};
pub use sweeper::{ExpirySweeper, SweepReport, SweeperSettings};
