//! Receipt print service

use crate::agent::{PrintAgent, PrintData};
use crate::error::PrintResult;
use crate::receipt::{HtmlReceipt, ReceiptContext, ReceiptRenderer};
use shared::models::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Printer used when neither an override nor the store names one
pub const DEFAULT_PRINTER: &str = "Receipt";

/// Printer selection
#[derive(Debug, Clone)]
pub struct PrintConfig {
    /// store id -> printer name, set on this workstation
    pub printer_overrides: HashMap<String, String>,
    pub default_printer: String,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            printer_overrides: HashMap::new(),
            default_printer: DEFAULT_PRINTER.to_string(),
        }
    }
}

impl PrintConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_printer_override(
        mut self,
        store_id: impl Into<String>,
        printer: impl Into<String>,
    ) -> Self {
        self.printer_overrides.insert(store_id.into(), printer.into());
        self
    }

    pub fn with_default_printer(mut self, printer: impl Into<String>) -> Self {
        self.default_printer = printer.into();
        self
    }

    /// Override, then the store's printer, then the default
    pub fn resolve_printer(&self, store: &Store) -> String {
        let non_blank = |s: &&String| !s.trim().is_empty();
        self.printer_overrides
            .get(&store.id)
            .filter(non_blank)
            .or(store.printer_name.as_ref().filter(non_blank))
            .unwrap_or(&self.default_printer)
            .clone()
    }
}

/// What happened to a receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintOutcome {
    Printed { printer: String },
    /// Silent printing is turned off for the store
    Skipped,
}

pub struct ReceiptPrinter {
    agent: Arc<dyn PrintAgent>,
    renderer: Arc<dyn ReceiptRenderer>,
    config: PrintConfig,
}

impl ReceiptPrinter {
    pub fn new(agent: Arc<dyn PrintAgent>) -> Self {
        Self {
            agent,
            renderer: Arc::new(HtmlReceipt),
            config: PrintConfig::default(),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ReceiptRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_config(mut self, config: PrintConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PrintConfig {
        &self.config
    }

    /// Print the customer receipt for an order
    #[instrument(skip(self, ctx), fields(order = %ctx.order.order_number, store = %ctx.store.id))]
    pub async fn print_receipt(&self, ctx: &ReceiptContext<'_>) -> PrintResult<PrintOutcome> {
        if !ctx.store.print_enabled {
            info!("Silent printing disabled for store, skipping");
            return Ok(PrintOutcome::Skipped);
        }

        self.agent.connect().await?;

        let printer = self.config.resolve_printer(ctx.store);
        let document = self.renderer.render(ctx);
        self.agent
            .print(&printer, &[PrintData::html(document)])
            .await?;

        info!(%printer, "Receipt sent to print agent");
        Ok(PrintOutcome::Printed { printer })
    }

    /// Printers the agent can see; empty when the agent is unreachable
    pub async fn list_printers(&self) -> Vec<String> {
        let result = async {
            self.agent.connect().await?;
            self.agent.find_printers().await
        }
        .await;

        match result {
            Ok(printers) => printers,
            Err(e) => {
                warn!(error = %e, "Failed to list printers");
                Vec::new()
            }
        }
    }
}
