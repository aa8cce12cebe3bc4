//! Print dispatch types

use crab_printer::{CutMode, PayloadEncoding};
use serde::{Deserialize, Serialize};
use shared::models::{JobStatus, PrintJobSummary};

/// Who the receipt is printed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    /// Kitchen ticket: no prices unless requested, never totals
    Kitchen,
    /// Customer receipt: line totals, subtotal and payment summary
    Customer,
}

impl Audience {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Audience::Kitchen => "kitchen",
            Audience::Customer => "customer",
        }
    }

    /// Title printed when the request carries no header
    pub const fn default_header(&self) -> &'static str {
        match self {
            Audience::Kitchen => "KITCHEN ORDER",
            Audience::Customer => "RECEIPT",
        }
    }
}

/// Item modifier, either a plain note or a priced option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Modifier {
    Plain(String),
    Priced {
        name: String,
        /// Per-unit surcharge in minor units (may be negative)
        #[serde(default)]
        price_delta: i64,
    },
}

impl Modifier {
    pub fn name(&self) -> &str {
        match self {
            Modifier::Plain(name) => name,
            Modifier::Priced { name, .. } => name,
        }
    }

    pub fn price_delta(&self) -> i64 {
        match self {
            Modifier::Plain(_) => 0,
            Modifier::Priced { price_delta, .. } => *price_delta,
        }
    }
}

/// One item to print (transient, never persisted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: u32,
    /// Price per unit in minor units (cents)
    #[serde(default)]
    pub unit_price: i64,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    pub category_id: String,
    #[serde(default)]
    pub category_name: Option<String>,
}

impl ReceiptLine {
    /// Price of one unit including modifier deltas
    pub fn unit_total(&self) -> i64 {
        self.modifiers
            .iter()
            .fold(self.unit_price, |acc, m| acc.saturating_add(m.price_delta()))
    }

    /// `quantity × (unit_price + Σ price_delta)`
    pub fn line_total(&self) -> i64 {
        self.unit_total().saturating_mul(i64::from(self.quantity))
    }
}

/// Payment block of a customer receipt, all amounts in minor units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub method: String,
    #[serde(default)]
    pub tip: i64,
    pub amount_tendered: i64,
    #[serde(default)]
    pub change_given: i64,
}

/// Structured receipt handed to the composer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptRequest {
    pub audience: Audience,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub subheader: Option<String>,
    #[serde(default)]
    pub lines: Vec<ReceiptLine>,
    /// Kitchen tickets only: print item prices
    #[serde(default)]
    pub show_prices: bool,
    #[serde(default)]
    pub payment: Option<PaymentSummary>,
    #[serde(default)]
    pub cut: Option<CutMode>,
    /// Overrides the configured feed before the cut
    #[serde(default)]
    pub feed_lines: Option<u8>,
    #[serde(default)]
    pub footer: Option<String>,
}

impl ReceiptRequest {
    pub fn new(audience: Audience, lines: Vec<ReceiptLine>) -> Self {
        Self {
            audience,
            header: None,
            subheader: None,
            lines,
            show_prices: false,
            payment: None,
            cut: None,
            feed_lines: None,
            footer: None,
        }
    }
}

/// Compose-and-enqueue request body (`POST /print-jobs/receipt`)
#[derive(Debug, Clone, Deserialize)]
pub struct ComposeRequest {
    pub printer_id: Option<String>,
    #[serde(default)]
    pub order_reference: Option<String>,
    pub receipt: ReceiptRequest,
}

/// Correlation and encoding metadata stored next to a payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobMetadata {
    pub encoding: PayloadEncoding,
    pub order_reference: Option<String>,
    pub receipt_kind: Option<String>,
}

/// Print job as stored in the job store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJob {
    pub id: String,
    pub printer_id: String,
    /// Stored bytes, encoded when `encoding` says so
    pub payload: Vec<u8>,
    pub content_type: String,
    pub status: JobStatus,
    pub encoding: PayloadEncoding,
    pub order_reference: Option<String>,
    pub receipt_kind: Option<String>,
    pub created_at: i64,
    pub delivered_at: Option<i64>,
}

impl PrintJob {
    /// Listing view without the payload
    pub fn summary(&self) -> PrintJobSummary {
        PrintJobSummary {
            id: self.id.clone(),
            printer_id: self.printer_id.clone(),
            content_type: self.content_type.clone(),
            status: self.status,
            encoding: self.encoding.as_str().to_string(),
            order_reference: self.order_reference.clone(),
            receipt_kind: self.receipt_kind.clone(),
            created_at: self.created_at,
            delivered_at: self.delivered_at,
            payload_bytes: self.payload.len() as i64,
        }
    }
}

/// Result of a conditional QUEUED → DELIVERED transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// This call performed the transition
    Delivered,
    /// Another caller got there first; nothing changed
    AlreadyDelivered,
    /// No job with that id
    NotFound,
}

/// Job count for one printer and status
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StatusCount {
    pub printer_id: String,
    pub status: JobStatus,
    pub count: i64,
}
