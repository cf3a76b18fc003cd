mod health;
mod whoami;

pub use health::health_check;
pub use whoami::whoami;
