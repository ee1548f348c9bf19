pub mod embedding_verifier;
pub mod histogram_verifier;
