pub(crate) mod gcs;
#[cfg(test)]
pub(crate) mod memory;
