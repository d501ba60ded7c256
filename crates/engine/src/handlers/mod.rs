//! Message handlers registered into the bus consumer.
//!
//! Each handler owns the reaction to exactly one message kind: the two send
//! handlers forward progress reports to the session client, and the receive
//! handler applies granted items through the active engine. None of them
//! retry; a failed reaction is logged by the consumer and the message is
//! considered delivered.

mod checked_location;
mod goal;
mod receive_item;

pub use checked_location::SendCheckedLocationHandler;
pub use goal::SendGoalHandler;
pub use receive_item::ReceiveItemHandler;
