#![forbid(unsafe_code)]

pub mod answer;
pub mod audit;
pub mod catalog;
pub mod cli;
pub mod formats;
pub mod generate;
pub mod locate;
pub mod logging;
pub mod options;
pub mod question;
pub mod raw;
pub mod slug;
pub mod source;
pub mod verify;
pub mod writer;
