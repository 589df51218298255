pub mod ai_service;
pub mod content_store;
pub mod doc_edit_service;
pub mod doc_sync_service;
pub mod op_engine;
