pub(crate) mod blend;
pub(crate) mod composite;
pub(crate) mod cpu;
