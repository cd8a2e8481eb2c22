pub mod bounded;
pub mod cfg;
pub mod cmd;
pub mod conn;
pub mod error;
mod histogram;
pub mod limit;
pub mod logging;
pub mod pool;
mod report;
pub mod runtime;
pub mod status;
#[cfg(test)]
mod testing;

pub use self::{
    error::Error,
    report::{Report, RunResult},
};
