//! Command template expansion.
//!
//! Model commands are user-authored strings such as
//! `llama-server -m model.gguf --port ${PORT} -c ${CTX}`. Expansion replaces
//! the recognized placeholders and leaves everything else alone, including
//! `$`-sequences we do not know about.

use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

/// `${NAME}` or bare `$NAME`. The bare form consumes the whole identifier so
/// `$PORTS` is never read as `$PORT` followed by `S`.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("placeholder pattern is valid")
});

/// Runtime values substituted into a command template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    pub port: u16,
    pub ctx: u32,
    pub host: &'a str,
}

impl TemplateVars<'_> {
    fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "PORT" => Some(self.port.to_string()),
            "CTX" => Some(self.ctx.to_string()),
            "HOST" => Some(self.host.to_string()),
            _ => None,
        }
    }
}

/// An expanded command line and its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedCommand {
    /// The expanded command string (for logging and the start response).
    pub command: String,
    /// `command` split into program and arguments.
    pub argv: Vec<String>,
}

/// Expand placeholders in `template` and split the result into arguments.
pub fn expand_command(template: &str, vars: &TemplateVars<'_>) -> ExpandedCommand {
    let command = PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            vars.lookup(name)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned();
    let argv = split_args(&command);
    ExpandedCommand { command, argv }
}

/// Split a command line using shell word rules.
///
/// Quotes group words (`--alias "my model"`). A line with unbalanced quotes
/// is split on whitespace instead of being rejected.
pub fn split_args(command: &str) -> Vec<String> {
    match shell_words::split(command) {
        Ok(words) => words,
        Err(e) => {
            debug!(error = %e, "Command is not valid shell syntax, splitting on whitespace");
            command.split_whitespace().map(str::to_string).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVars<'static> {
        TemplateVars {
            port: 11500,
            ctx: 8192,
            host: "127.0.0.1",
        }
    }

    #[test]
    fn test_expands_port_and_ctx() {
        let out = expand_command("llama-server --port ${PORT} -c ${CTX}", &vars());
        assert_eq!(out.command, "llama-server --port 11500 -c 8192");
        assert_eq!(out.argv, vec!["llama-server", "--port", "11500", "-c", "8192"]);
    }

    #[test]
    fn test_template_without_placeholders_is_unchanged() {
        let template = "llama-server -m /models/qwen.gguf --port 8080";
        let out = expand_command(template, &vars());
        assert_eq!(out.command, template);
    }

    #[test]
    fn test_unknown_placeholders_pass_through() {
        let out = expand_command("run ${MODEL_DIR}/x.gguf $HOME --port ${PORT}", &vars());
        assert_eq!(out.command, "run ${MODEL_DIR}/x.gguf $HOME --port 11500");
    }

    #[test]
    fn test_bare_placeholders_and_host() {
        let out = expand_command("srv --host $HOST --port $PORT -c $CTX", &vars());
        assert_eq!(out.command, "srv --host 127.0.0.1 --port 11500 -c 8192");
    }

    #[test]
    fn test_bare_placeholder_needs_whole_identifier() {
        let out = expand_command("echo $PORTS ${PORT}x", &vars());
        assert_eq!(out.command, "echo $PORTS 11500x");
    }

    #[test]
    fn test_lone_dollar_is_kept() {
        let out = expand_command("echo $ 5$ ${", &vars());
        assert_eq!(out.command, "echo $ 5$ ${");
    }

    #[test]
    fn test_quoted_arguments_are_grouped() {
        let args = split_args(r#"llama-server --alias "my model" -m '/a b/c.gguf'"#);
        assert_eq!(
            args,
            vec!["llama-server", "--alias", "my model", "-m", "/a b/c.gguf"]
        );
    }

    #[test]
    fn test_unbalanced_quotes_fall_back_to_whitespace() {
        let args = split_args(r#"llama-server --alias "broken"#);
        assert_eq!(args, vec!["llama-server", "--alias", "\"broken"]);
    }
}
