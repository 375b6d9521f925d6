mod time_ticket;
mod version_vector;
mod change_id;

pub use time_ticket::TimeTicket;
pub use version_vector::VersionVector;
pub use change_id::ChangeID;
