pub mod classify;
pub mod clock;
pub mod feedback;
pub mod identity;
pub mod matching;
pub mod message;
pub mod notification;
pub mod payment;
pub mod trip;
