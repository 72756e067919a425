//! Boundary to the external UI-session framework.
//!
//! The framework owns authentication prompts, the settings panel, and the
//! rendering of messages; this trait is the narrow set of primitives the
//! session core needs from it. One implementation exists per live connection
//! and the framework serializes message submission, so methods take
//! `&mut self` and no internal locking is needed.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ChatSurface: Send {
    /// The resumption handle carried by the UI layer, if any.
    fn thread_id(&self) -> Option<String>;

    /// Force the UI thread identity. Called once when a new conversation is
    /// created so the thread id and the conversation id stay equal.
    fn set_thread_id(&mut self, id: String);

    /// Display a standalone notice (greeting, configuration error).
    async fn send_notice(&mut self, text: &str) -> Result<()>;

    /// Append one incremental fragment to the reply being displayed.
    async fn stream_token(&mut self, token: &str) -> Result<()>;

    /// Rename the displayed thread.
    async fn rename_thread(&mut self, title: &str) -> Result<()>;
}
