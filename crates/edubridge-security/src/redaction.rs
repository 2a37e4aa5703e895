use tracing_subscriber::fmt::MakeWriter;

/// A writer that redacts provider credentials from log output.
///
/// Backend error bodies are logged verbatim by the dispatcher, and some providers
/// echo the offending key back in their 401 responses.
pub struct RedactingWriter<W> {
    inner: W,
}

impl RedactingWriter<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self {
            inner: std::io::stderr(),
        }
    }
}

impl<W: std::io::Write> std::io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let original = String::from_utf8_lossy(buf);
        let redacted = redact_secrets(&original);
        self.inner.write_all(redacted.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl<'a> MakeWriter<'a> for RedactingWriter<std::io::Stderr> {
    type Writer = RedactingWriter<std::io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: std::io::stderr(),
        }
    }
}

/// Replace known API key patterns with `[REDACTED]`.
pub fn redact_secrets(input: &str) -> String {
    static PATTERNS: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
        regex::Regex::new(
            r"(?x)
              sk-ant-api\S{10,}    # Anthropic API keys
            | sk-or-\S{10,}        # OpenRouter keys
            | sk-\S{20,}           # OpenAI-style keys
            | gsk_[A-Za-z0-9]{20,} # Groq keys
            | hf_[A-Za-z0-9]{20,}  # HuggingFace tokens
            | Bearer\s+[A-Za-z0-9_\-\.]{20,}
            ",
        )
        .expect("redaction regex should compile")
    });

    PATTERNS.replace_all(input, "[REDACTED]").into_owned()
}
