pub mod ai;
pub mod diagnostics;
pub mod doc_operation;
pub mod documents;
pub mod health;
pub mod rooms;

pub use ai::*;
pub use diagnostics::*;
pub use doc_operation::*;
pub use documents::*;
pub use health::*;
pub use rooms::*;
