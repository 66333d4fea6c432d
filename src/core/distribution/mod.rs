pub mod pipework;
pub mod pump;
