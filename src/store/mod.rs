pub mod action;
pub mod notification;
pub mod state;

pub use action::{Action, DerivationRequest, Effect, LoadedSchedule};
pub use notification::{Notification, NotificationLevel};
pub use state::Store;
