mod bookings;
mod seats;

pub use bookings::PgBookingStore;
pub use seats::PgSeatStore;
