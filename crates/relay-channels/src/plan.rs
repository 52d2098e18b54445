use relay_core::config::{DispatchConfig, ReplyStyle};

use crate::chunk::{split_chunks, LINE_TEXT_MAX_CHARS};
use crate::types::DispatchPlan;

/// Lays a composed reply out as the sequence of chat messages to send.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    style: ReplyStyle,
    lead: String,
    tail: String,
    max_chars: usize,
}

impl PlanBuilder {
    pub fn new(style: ReplyStyle, lead: impl Into<String>, tail: impl Into<String>) -> Self {
        Self {
            style,
            lead: lead.into(),
            tail: tail.into(),
            max_chars: LINE_TEXT_MAX_CHARS,
        }
    }

    pub fn from_config(cfg: &DispatchConfig) -> Self {
        Self::new(cfg.style, cfg.lead.clone(), cfg.tail.clone())
    }

    /// Override the per-message character cap.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Build the plan for `reply`. `None` when there is nothing to send.
    ///
    /// `single` → the reply (chunked). `sequence` → lead, reply chunks, tail;
    /// a blank lead or tail is left out.
    pub fn build(&self, reply: &str) -> Option<DispatchPlan> {
        let body = split_chunks(reply, self.max_chars);

        match self.style {
            ReplyStyle::Single => DispatchPlan::new(body),
            ReplyStyle::Sequence => {
                let lead = non_blank(&self.lead);
                let tail = non_blank(&self.tail);
                DispatchPlan::new(lead.into_iter().chain(body).chain(tail))
            }
        }
    }
}

fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}
