mod booking;
mod catalog;
mod homepage;
mod integration;
mod menu;
mod payment;
mod session;
mod transition;
mod user;

pub use booking::*;
pub use catalog::*;
pub use homepage::*;
pub use integration::*;
pub use menu::*;
pub use payment::*;
pub use session::*;
pub use transition::*;
pub use user::*;
