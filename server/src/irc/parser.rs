use thiserror::Error;

/// One line of the wire protocol, IRC framed.
///
/// Wire format: `[:prefix] COMMAND [params...] [:trailing]`
///
/// Examples:
///   `NICK alice`
///   `CREATE lounge +i`
///   `PRIVMSG lounge :hello there`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty message")]
    Empty,
    #[error("missing command")]
    MissingCommand,
}

impl IrcMessage {
    /// Build a message with a source prefix.
    pub fn prefixed(prefix: &str, command: &str, params: Vec<String>) -> Self {
        Self {
            prefix: Some(prefix.to_string()),
            command: command.to_string(),
            params,
        }
    }

    /// Parse a single line. Trailing CR/LF is ignored and the command is
    /// upper-cased.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut rest = line.trim_end_matches(['\r', '\n']).trim_start();
        if rest.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut prefix = None;
        if let Some(stripped) = rest.strip_prefix(':') {
            let (p, tail) = stripped
                .split_once(' ')
                .ok_or(ParseError::MissingCommand)?;
            prefix = Some(p.to_string());
            rest = tail.trim_start();
        }

        let (command, mut rest) = match rest.split_once(' ') {
            Some((cmd, tail)) => (cmd, tail.trim_start()),
            None => (rest, ""),
        };
        if command.is_empty() {
            return Err(ParseError::MissingCommand);
        }

        let mut params = Vec::new();
        while !rest.is_empty() {
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, tail)) => {
                    params.push(param.to_string());
                    rest = tail.trim_start();
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Ok(IrcMessage {
            prefix,
            command: command.to_uppercase(),
            params,
        })
    }

    /// Serialize back to a wire line (no CR/LF).
    pub fn format(&self) -> String {
        let mut out = String::with_capacity(128);

        if let Some(prefix) = &self.prefix {
            out.push(':');
            out.push_str(prefix);
            out.push(' ');
        }
        out.push_str(&self.command);

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            // User content must not be able to smuggle in a second line.
            let param = param.replace(['\r', '\n'], " ");
            out.push(' ');
            if i == last && (param.is_empty() || param.contains(' ') || param.starts_with(':')) {
                out.push(':');
            }
            out.push_str(&param);
        }

        out
    }
}
