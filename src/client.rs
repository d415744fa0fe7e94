//! Command-line counterpart of the browser page: posts one message to the
//! stream endpoint and writes the de-marked reply as it arrives.

use std::io::Write;

use anyhow::{bail, Context};
use futures::stream::StreamExt;
use serde_json::json;

use crate::relay::markers::{MarkerStripper, MarkersSeen};
use crate::text::Utf8Decoder;

/// Summary of one streamed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskOutcome {
    /// De-marked reply text.
    pub text: String,
    /// Markers observed on the wire.
    pub markers: MarkersSeen,
}

impl AskOutcome {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Send `message` to `url` and copy the reply to `out` chunk by chunk.
pub async fn ask(url: &str, message: &str, out: &mut impl Write) -> anyhow::Result<AskOutcome> {
    let response = reqwest::Client::new()
        .post(url)
        .json(&json!({ "message": message }))
        .send()
        .await
        .with_context(|| format!("failed to reach {url}"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let reason = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("error").to_string()
        } else {
            body.trim().to_string()
        };
        bail!("server answered {status}: {reason}");
    }

    let mut utf8 = Utf8Decoder::new();
    let mut stripper = MarkerStripper::new();
    let mut text = String::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.context("reply stream interrupted")?;
        let cleaned = stripper.push(&utf8.decode(&chunk));
        emit(out, &mut text, &cleaned)?;
    }
    let tail = stripper.push(&utf8.finish());
    emit(out, &mut text, &tail)?;
    let tail = stripper.finish();
    emit(out, &mut text, &tail)?;

    Ok(AskOutcome {
        text,
        markers: stripper.seen(),
    })
}

fn emit(out: &mut impl Write, text: &mut String, cleaned: &str) -> anyhow::Result<()> {
    if cleaned.is_empty() {
        return Ok(());
    }
    out.write_all(cleaned.as_bytes())?;
    out.flush()?;
    text.push_str(cleaned);
    Ok(())
}
