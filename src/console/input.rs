use anyhow::Result;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};

/// Buffered stdin kept for the whole session so piped input is not dropped.
pub struct LineReader {
    reader: BufReader<Stdin>,
}

impl LineReader {
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
        }
    }

    /// Print the prompt and read one trimmed line. EOF yields `/quit`.
    pub async fn prompt_user(&mut self, prompt_text: &str) -> Result<String> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt_text.as_bytes()).await?;
        stdout.flush().await?;

        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            return Ok("/quit".to_string());
        }
        Ok(line.trim().to_string())
    }
}

pub fn is_quit_command(input_text: &str) -> bool {
    matches!(input_text.trim(), "/quit" | "/exit")
}

/// A console line split into a capability name and its JSON arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub capability: String,
    pub args: Value,
}

/// Parse `<capability> <argument>`.
///
/// The argument is either a JSON object passed through unchanged, or plain
/// text bound to the capability's first required parameter (`param`).
pub fn parse_invocation(line: &str, param_for: impl Fn(&str) -> Option<String>) -> Option<Invocation> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let args = if rest.starts_with('{') {
        serde_json::from_str(rest).ok()?
    } else if rest.is_empty() {
        json!({})
    } else {
        match param_for(name) {
            Some(param) => {
                let mut map = serde_json::Map::new();
                map.insert(param, Value::String(rest.to_string()));
                Value::Object(map)
            }
            None => json!({}),
        }
    };

    Some(Invocation {
        capability: name.to_string(),
        args,
    })
}
