pub mod chunking;
pub mod ledger;
pub mod merge;
pub mod narration;
pub mod synthesis;
pub mod tts;
