mod machine;
mod pause;
mod request;
mod scheduler;

pub use machine::{Generation, PollMachine, PollState, Resume};
pub use pause::PauseGuard;
pub use request::{FetchFuture, PollRequest};
pub use scheduler::Poller;
