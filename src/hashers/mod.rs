pub(crate) mod argon;
