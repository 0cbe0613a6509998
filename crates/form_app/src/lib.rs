pub mod cli;
pub mod errors;
pub mod logging;
mod session;

pub use session::run;
