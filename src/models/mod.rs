pub mod booking;
pub mod seat;

pub use booking::{Booking, BookingItem, BookingStatus, BookingSummary, CancelOutcome};
pub use seat::{ReleasedSeat, Seat, SeatStatus};
