pub mod device;
pub mod user;

pub use device::{Device, NewDevice};
pub use user::{NewUser, PendingCode, User, UserRole};
