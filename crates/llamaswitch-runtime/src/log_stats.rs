//! Performance counters parsed from llama-server output.
//!
//! llama-server prints a timing block after every request:
//!
//! ```text
//! prompt eval time =       4.67 ms /    11 tokens (    0.42 ms per token,  2355.46 tokens per second)
//!        eval time =     492.12 ms /     9 tokens (   54.68 ms per token,    18.29 tokens per second)
//! slot      release: id  3 | task 10 | stop processing: n_tokens = 73, truncated = 0
//! ```
//!
//! These lines are available even when the server runs without `--metrics`.

use llamaswitch_core::SessionStats;
use regex::Regex;
use std::sync::LazyLock;

static PROMPT_EVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"prompt eval time\s*=\s*[\d.]+\s*ms\s*/\s*(\d+)\s*tokens\s*\(\s*[\d.]+\s*ms per token,\s*([\d.]+)\s*tokens per second\)",
    )
    .expect("prompt eval pattern is valid")
});

// Must not match the prompt line, hence the explicit start/whitespace anchor
// and the prompt pattern being tried first.
static EVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|\s)eval time\s*=\s*[\d.]+\s*ms\s*/\s*(\d+)\s*tokens\s*\(\s*[\d.]+\s*ms per token,\s*([\d.]+)\s*tokens per second\)",
    )
    .expect("eval pattern is valid")
});

static RELEASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"stop processing: n_tokens = (\d+)").expect("release pattern is valid")
});

/// A counter update extracted from one output line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogStat {
    /// Prompt processing throughput.
    PromptSpeed(f64),
    /// A finished generation: tokens produced and throughput.
    Generation { tokens: u64, speed: f64 },
    /// Context tokens held by the slot when the request finished.
    ContextUsed(u64),
}

impl LogStat {
    /// Parse one line of server output.
    pub fn parse(line: &str) -> Option<Self> {
        if let Some(caps) = PROMPT_EVAL.captures(line) {
            return caps[2].parse().ok().map(Self::PromptSpeed);
        }
        if let Some(caps) = EVAL.captures(line) {
            let tokens = caps[1].parse().ok()?;
            let speed = caps[2].parse().ok()?;
            return Some(Self::Generation { tokens, speed });
        }
        RELEASE
            .captures(line)
            .and_then(|caps| caps[1].parse().ok())
            .map(Self::ContextUsed)
    }

    /// Apply the update to a session's stats.
    pub fn apply(self, stats: &mut SessionStats, ctx_limit: u32) {
        match self {
            Self::PromptSpeed(speed) => stats.prompt_speed = speed,
            Self::Generation { tokens, speed } => {
                stats.gen_speed = speed;
                stats.total_tokens += tokens;
            }
            Self::ContextUsed(used) => {
                stats.ctx_used = used;
                stats.ctx_limit = u64::from(ctx_limit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROMPT: &str = "prompt eval time =       4.67 ms /    11 tokens (    0.42 ms per token,  2355.46 tokens per second)";
    const EVAL_LINE: &str = "       eval time =     492.12 ms /     9 tokens (   54.68 ms per token,    18.29 tokens per second)";
    const RELEASE_LINE: &str =
        "slot      release: id  3 | task 10 | stop processing: n_tokens = 73, truncated = 0";

    #[test]
    fn test_prompt_line_is_not_counted_as_generation() {
        assert_eq!(LogStat::parse(PROMPT), Some(LogStat::PromptSpeed(2355.46)));
    }

    #[test]
    fn test_eval_line() {
        assert_eq!(
            LogStat::parse(EVAL_LINE),
            Some(LogStat::Generation {
                tokens: 9,
                speed: 18.29
            })
        );
    }

    #[test]
    fn test_release_line() {
        assert_eq!(LogStat::parse(RELEASE_LINE), Some(LogStat::ContextUsed(73)));
    }

    #[test]
    fn test_unrelated_lines() {
        assert_eq!(LogStat::parse("main: server is listening on 127.0.0.1:8080"), None);
        assert_eq!(LogStat::parse(""), None);
    }

    #[test]
    fn test_apply_accumulates_generated_tokens() {
        let mut stats = SessionStats::default();
        for line in [PROMPT, EVAL_LINE, EVAL_LINE, RELEASE_LINE] {
            LogStat::parse(line).unwrap().apply(&mut stats, 8192);
        }
        assert_eq!(stats.total_tokens, 18);
        assert_eq!(stats.gen_speed, 18.29);
        assert_eq!(stats.prompt_speed, 2355.46);
        assert_eq!(stats.ctx_used, 73);
        assert_eq!(stats.ctx_limit, 8192);
    }
}
