//! Newline-delimited JSON bridge over any async reader and writer.
//!
//! Each input line is a [`HostRequest`]; each output line is either an
//! [`AnalysisResult`] or a [`HostError`]. A bad line never stops the loop.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

use crate::context::UserContext;
use crate::engine::EmotionAnalyzer;
use crate::error::{MeloError, Result};

/// One analysis request.
///
/// A missing or `null` message is analyzed as empty text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub context: Option<UserContext>,
}

/// Reply line for a request that could not be handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostError {
    pub error: String,
    /// 1-based input line number.
    pub line: usize,
}

/// Serve requests from `reader` until EOF, writing one reply per request.
///
/// Blank lines are skipped. Lines that are not UTF-8 or not a valid request
/// get a [`HostError`] reply. Returns the number of requests answered
/// (including error replies).
///
/// # Errors
///
/// Returns [`MeloError::Io`] if reading or writing fails.
pub async fn serve_lines<A, R, W>(analyzer: &A, reader: R, writer: W) -> Result<usize>
where
    A: EmotionAnalyzer + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = reader;
    let mut writer = writer;
    let mut buf = Vec::new();
    let mut line_no = 0;
    let mut answered = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        line_no += 1;

        let json = match parse_request(&buf) {
            Ok(None) => continue,
            Ok(Some(request)) => {
                let message = request.message.as_deref().unwrap_or("");
                let result = analyzer.analyze(message, request.context.as_ref()).await;
                serde_json::to_string(&result)
            }
            Err(reason) => {
                tracing::warn!(line = line_no, error = %reason, "failed to parse request line");
                serde_json::to_string(&HostError {
                    error: format!("invalid request: {reason}"),
                    line: line_no,
                })
            }
        }
        .map_err(|e| MeloError::Io(std::io::Error::other(e)))?;

        write_line(&mut writer, &json).await?;
        answered += 1;
    }

    tracing::info!(answered, "input closed");
    Ok(answered)
}

/// Serve requests from stdin to stdout.
///
/// # Errors
///
/// Returns [`MeloError::Io`] if stdin or stdout fail.
pub async fn run_stdio<A>(analyzer: &A) -> Result<usize>
where
    A: EmotionAnalyzer + ?Sized,
{
    let reader = BufReader::new(tokio::io::stdin());
    let writer = BufWriter::new(tokio::io::stdout());
    serve_lines(analyzer, reader, writer).await
}

/// Decode one raw line. `Ok(None)` means the line was blank.
fn parse_request(raw: &[u8]) -> std::result::Result<Option<HostRequest>, String> {
    let text = std::str::from_utf8(raw).map_err(|e| format!("line is not UTF-8: {e}"))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|e| e.to_string())
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, json: &str) -> Result<()> {
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::engine::{AnalysisResult, EmotionResponseEngine};

    async fn run(input: &str) -> (usize, Vec<String>) {
        run_bytes(input.as_bytes()).await
    }

    async fn run_bytes(input: &[u8]) -> (usize, Vec<String>) {
        let engine = EmotionResponseEngine::builtin();
        let mut out = Vec::new();
        let answered = serve_lines(&engine, input, &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        (answered, text.lines().map(String::from).collect())
    }

    #[tokio::test]
    async fn answers_each_request_in_order() {
        let input = concat!(
            r#"{"message": "I'm so happy"}"#,
            "\n",
            r#"{"message": "I want to die"}"#,
            "\n"
        );
        let (answered, lines) = run(input).await;
        assert_eq!(answered, 2);

        let first: AnalysisResult = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first.emotion, "Happiness");
        let second: AnalysisResult = serde_json::from_str(&lines[1]).unwrap();
        assert!(second.needs_escalation);
    }

    #[tokio::test]
    async fn context_is_passed_through() {
        let input =
            r#"{"message": "so sad", "context": {"has_history": true, "message_count": 30}}"#;
        let (_, lines) = run(input).await;
        let result: AnalysisResult = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(
            result.response,
            "I know sadness visits you often. You're stronger than you think."
        );
    }

    #[tokio::test]
    async fn malformed_line_gets_error_and_loop_continues() {
        let input = "not json\n\n{\"message\": \"\"}\n";
        let (answered, lines) = run(input).await;
        assert_eq!(answered, 2);

        let error: HostError = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(error.line, 1);
        assert!(error.error.starts_with("invalid request"));

        let neutral: AnalysisResult = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(neutral.emotion, "Neutral");
    }

    #[tokio::test]
    async fn invalid_utf8_line_gets_error_and_loop_continues() {
        let mut input = b"{\"message\": \"\xff\xfe sad\"}\n".to_vec();
        input.extend_from_slice(b"{\"message\": \"I am so sad\"}\n");
        let (answered, lines) = run_bytes(&input).await;
        assert_eq!(answered, 2);

        let error: HostError = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(error.line, 1);
        assert!(error.error.contains("UTF-8"));

        let sad: AnalysisResult = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(sad.emotion, "Sadness");
    }

    #[tokio::test]
    async fn null_or_missing_message_is_neutral() {
        let input = "{\"message\": null}\n{}\n{\"context\": {\"has_history\": true}}\n";
        let (answered, lines) = run(input).await;
        assert_eq!(answered, 3);
        for line in &lines {
            let result: AnalysisResult = serde_json::from_str(line).unwrap();
            assert_eq!(result.emotion, "Neutral");
            assert_eq!(result.confidence, 0.5);
        }
    }

    #[tokio::test]
    async fn final_line_without_newline_is_answered() {
        let (answered, lines) = run(r#"{"message": "I'm so happy"}"#).await;
        assert_eq!(answered, 1);
        let result: AnalysisResult = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(result.emotion, "Happiness");
    }
}
