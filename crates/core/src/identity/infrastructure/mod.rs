pub mod in_memory_signature_store;
pub mod json_signature_store;
