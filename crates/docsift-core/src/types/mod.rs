//! Core types shared by every docsift component.

mod method;
mod reason;
mod run;
mod unit;

pub use method::Method;
pub use reason::ReasonCode;
pub use run::{Run, RunState};
pub(crate) use unit::extension_of;
pub use unit::{Category, FileClass, InputUnit, PageRef, PassOutcome, Reliability, TextUnit};
