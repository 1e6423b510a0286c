pub mod dummy;
pub use dummy::*;

pub mod validator;
pub use validator::*;
