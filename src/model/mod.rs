mod subscription;
mod system_message;
mod table;

pub use subscription::{Channel, NewSubscription, Subscription};
pub use system_message::SystemMessage;
pub use table::Table;
