pub(crate) mod model;
pub(crate) mod particles;
pub(crate) mod shape;
