pub mod seat;
pub mod participant;
pub mod payment;
pub mod booking;

pub use seat::*;
pub use participant::*;
pub use payment::*;
pub use booking::*;
