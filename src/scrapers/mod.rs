pub mod base;
pub mod krx;
pub mod yahoo;
