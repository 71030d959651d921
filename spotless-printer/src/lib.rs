//! Silent receipt printing
//!
//! - [`agent`]: print agent abstraction and an in-memory agent
//! - [`ws_agent`]: websocket client for the local print agent
//! - [`bridge`]: signing bridge answering the agent's trust challenges
//! - [`authority`]: remote and local signature authorities
//! - [`receipt`]: HTML receipt rendering
//! - [`service`]: receipt print service

pub mod agent;
pub mod authority;
pub mod bridge;
pub mod error;
pub mod receipt;
pub mod service;
pub mod ws_agent;

pub use agent::{MemoryPrintAgent, PrintAgent, PrintData, SecurityProvider, SubmittedJob};
pub use authority::{
    LocalAuthority, RemoteAuthority, SessionTokens, SignatureAuthority, StaticToken,
};
pub use bridge::{
    CertificateSource, DEFAULT_SIGN_TIMEOUT, HttpCertificateSource, SigningBridge,
    StaticCertificateSource, TrustState,
};
pub use error::{PrintError, PrintResult};
pub use receipt::{HtmlReceipt, RECEIPT_WIDTH_PX, ReceiptContext, ReceiptRenderer, wrap_document};
pub use service::{DEFAULT_PRINTER, PrintConfig, PrintOutcome, ReceiptPrinter};
pub use ws_agent::{DEFAULT_AGENT_URL, WsPrintAgent};
