//! Print agent abstraction
//!
//! The console never drives printers itself. A local agent process owns the
//! printers and asks the console for a signature whenever it needs to trust
//! a job (silent printing).

use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared::signing::SignRequest;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// One unit of print data handed to the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintData {
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
    pub data: String,
}

impl PrintData {
    /// A self-contained HTML document
    pub fn html(document: impl Into<String>) -> Self {
        Self {
            kind: "html".to_string(),
            format: "plain".to_string(),
            data: document.into(),
        }
    }
}

/// Answers the agent's trust questions
#[async_trait]
pub trait SecurityProvider: Send + Sync {
    /// PEM certificate presented to the agent, `None` when signing is off
    fn certificate(&self) -> Option<String>;

    /// Sign an agent challenge, returning the base64 signature
    async fn sign(&self, challenge: &SignRequest) -> PrintResult<String>;
}

/// Local print agent
#[async_trait]
pub trait PrintAgent: Send + Sync {
    /// Open the session (no-op when already active)
    async fn connect(&self) -> PrintResult<()>;

    fn is_active(&self) -> bool;

    /// Names of the printers the agent can see
    async fn find_printers(&self) -> PrintResult<Vec<String>>;

    /// Submit jobs to the named printer
    async fn print(&self, printer: &str, jobs: &[PrintData]) -> PrintResult<()>;
}

/// A submitted job as recorded by [`MemoryPrintAgent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedJob {
    pub printer: String,
    pub data: Vec<PrintData>,
}

/// In-process agent for tests and demos
///
/// Records every job and can be switched offline. When a security provider
/// is attached, [`MemoryPrintAgent::challenge`] plays the agent side of the
/// signing handshake.
#[derive(Default)]
pub struct MemoryPrintAgent {
    printers: Vec<String>,
    jobs: Mutex<Vec<SubmittedJob>>,
    active: AtomicBool,
    offline: AtomicBool,
    connects: AtomicUsize,
    security: Option<Arc<dyn SecurityProvider>>,
}

impl MemoryPrintAgent {
    pub fn new<I, S>(printers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            printers: printers.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_security(mut self, provider: Arc<dyn SecurityProvider>) -> Self {
        self.security = Some(provider);
        self
    }

    /// Simulate the agent process going away
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
        if offline {
            self.active.store(false, Ordering::SeqCst);
        }
    }

    pub fn jobs(&self) -> Vec<SubmittedJob> {
        self.jobs.lock().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Ask the attached provider to sign, as the real agent would
    pub async fn challenge(&self, challenge: &SignRequest) -> PrintResult<String> {
        let provider = self
            .security
            .as_ref()
            .ok_or_else(|| PrintError::SigningDisabled("No security provider".into()))?;
        provider.sign(challenge).await
    }

    fn ensure_online(&self) -> PrintResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PrintError::Connection("Print agent is not running".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PrintAgent for MemoryPrintAgent {
    async fn connect(&self) -> PrintResult<()> {
        self.ensure_online()?;
        if !self.active.swap(true, Ordering::SeqCst) {
            self.connects.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn find_printers(&self) -> PrintResult<Vec<String>> {
        self.ensure_online()?;
        Ok(self.printers.clone())
    }

    async fn print(&self, printer: &str, jobs: &[PrintData]) -> PrintResult<()> {
        self.ensure_online()?;
        if !self.is_active() {
            return Err(PrintError::Agent("Not connected".into()));
        }
        if !self.printers.iter().any(|p| p == printer) {
            return Err(PrintError::Agent(format!("Unknown printer: {printer}")));
        }
        self.jobs.lock().push(SubmittedJob {
            printer: printer.to_string(),
            data: jobs.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_data_wire_shape() {
        let data = PrintData::html("<html></html>");
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            serde_json::json!({"type": "html", "format": "plain", "data": "<html></html>"})
        );
    }

    #[tokio::test]
    async fn test_memory_agent_records_jobs() {
        let agent = MemoryPrintAgent::new(["Receipt"]);
        assert!(!agent.is_active());
        agent.connect().await.unwrap();
        agent.connect().await.unwrap();
        assert_eq!(agent.connect_count(), 1);

        agent
            .print("Receipt", &[PrintData::html("x")])
            .await
            .unwrap();
        assert!(agent.print("Label", &[]).await.is_err());
        assert_eq!(agent.jobs().len(), 1);
    }

    #[tokio::test]
    async fn test_offline_agent_refuses() {
        let agent = MemoryPrintAgent::new(["Receipt"]);
        agent.set_offline(true);
        assert!(matches!(
            agent.connect().await,
            Err(PrintError::Connection(_))
        ));
        assert!(agent.find_printers().await.is_err());
    }
}
