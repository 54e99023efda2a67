//! IRC line parsing

/// One parsed protocol line: `[@tags] [:prefix] COMMAND params... [:trailing]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        // IRCv3 tags are not used
        if rest.starts_with('@') {
            rest = rest.split_once(' ').map(|(_, r)| r)?.trim_start();
        }

        let prefix = if let Some(stripped) = rest.strip_prefix(':') {
            let (prefix, r) = stripped.split_once(' ')?;
            rest = r.trim_start();
            Some(prefix.to_string())
        } else {
            None
        };

        let (command, mut rest) = match rest.split_once(' ') {
            Some((command, r)) => (command, r),
            None => (rest, ""),
        };
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, r)) => {
                    params.push(param.to_string());
                    rest = r;
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Some(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Nickname part of a `nick!user@host` prefix
    pub fn source_nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .and_then(|p| p.split('!').next())
            .filter(|n| !n.is_empty())
    }

    pub fn param(&self, index: usize) -> &str {
        self.params.get(index).map(String::as_str).unwrap_or("")
    }
}

/// Strip line breaks so a text can never smuggle a second command
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect()
}
