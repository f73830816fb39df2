#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod choice;
pub mod clock;
pub mod lenient;
pub mod question;
pub mod result;

pub use choice::Choice;
pub use question::{Question, RawExam, RawQuestion};
pub use result::{ExamResult, Tally};
