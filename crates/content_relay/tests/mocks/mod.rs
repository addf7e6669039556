#![allow(dead_code)]

pub mod captions;
pub mod completion;
pub mod fetcher;
pub mod verifier;
