pub mod folder_session;
pub mod openai_session;
pub mod polly_session;
pub mod synthesis_session;

pub use folder_session::{wait_for_new_file, FolderSession, FolderSessionFactory};
pub use openai_session::{OpenAiSession, OpenAiSessionFactory};
pub use polly_session::{PollySession, PollySessionFactory};
pub use synthesis_session::{ArtifactHandle, SessionError, SessionFactory, SynthesisSession};
