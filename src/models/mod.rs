pub mod budget;
pub mod campaign;
pub mod credentials;
pub mod enforcement;
pub mod user;

pub use budget::*;
pub use campaign::*;
pub use credentials::*;
pub use enforcement::*;
pub use user::*;
