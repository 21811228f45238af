use crate::analysis::component::{CommandMeta, ComponentKind, Metadata};
use crate::analysis::discovery::{KindStrategy, ScanContext};
use crate::error::Result;
use crate::parser::PhpClass;
use once_cell::sync::Lazy;
use regex::Regex;

const COMMAND_BASE: &str = "Illuminate\\Console\\Command";

static SIGNATURE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\s*([^}]+?)\s*\}").expect("valid signature regex"));

/// Artisan console commands
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandStrategy;

impl KindStrategy for CommandStrategy {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Command
    }

    fn qualifies(&self, class: &PhpClass, ctx: &ScanContext<'_>) -> bool {
        class.is_concrete() && ctx.index.extends_any(class, &[COMMAND_BASE])
    }

    fn extract(&self, class: &PhpClass, _source: &str, ctx: &ScanContext<'_>) -> Result<Metadata> {
        let attributes = ctx.attributes.describe(class)?;
        let (arguments, options) = attributes
            .signature
            .as_deref()
            .map(parse_signature)
            .unwrap_or_default();

        Ok(Metadata::Command(CommandMeta {
            signature: attributes.signature,
            name: attributes.command_name,
            description: attributes.description,
            aliases: attributes.aliases.unwrap_or_default(),
            arguments,
            options,
        }))
    }

    fn analyzes_flow(&self) -> bool {
        true
    }
}

/// Argument and option names from `name {user} {--queue=} {--F|force}`
pub fn parse_signature(signature: &str) -> (Vec<String>, Vec<String>) {
    let mut arguments = Vec::new();
    let mut options = Vec::new();

    for cap in SIGNATURE_TOKEN_RE.captures_iter(signature) {
        let token = cap[1].split(':').next().unwrap_or("").trim();
        match token.strip_prefix("--") {
            Some(option) => {
                let option = option.rsplit('|').next().unwrap_or(option);
                let name = option.split('=').next().unwrap_or(option).trim_end_matches('*');
                options.push(name.trim().to_string());
            }
            None => {
                let name = token
                    .split('=')
                    .next()
                    .unwrap_or(token)
                    .trim_end_matches(['?', '*']);
                arguments.push(name.trim().to_string());
            }
        }
    }

    (arguments, options)
}
