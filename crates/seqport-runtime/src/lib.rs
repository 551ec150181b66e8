pub mod dispatcher;
pub mod evaluation;
pub mod pool;
pub mod request;
pub mod scheduler;
pub mod worker;

pub use dispatcher::*;
pub use evaluation::*;
pub use pool::*;
pub use request::*;
pub use scheduler::*;
pub use worker::*;
