pub(crate) mod command;
pub(crate) mod compositor;
pub(crate) mod config;
