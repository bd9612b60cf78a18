pub mod cookies;
pub mod password;
pub mod random;
pub mod session_token;

pub use cookies::*;
pub use password::*;
pub use random::*;
pub use session_token::*;
