pub(crate) mod manager;
