pub mod image_codec;
pub mod sqlite_identity_store;
