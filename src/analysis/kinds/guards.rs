use super::{conventional_model, method_names};
use crate::analysis::component::{ComponentKind, Metadata, PolicyMeta, RuleMeta};
use crate::analysis::discovery::{KindStrategy, ScanContext};
use crate::error::Result;
use crate::parser::lexer::unquote;
use crate::parser::{short_name, PhpClass};
use once_cell::sync::Lazy;
use regex::Regex;

const RULE_CONTRACTS: [&str; 6] = [
    "ValidationRule",
    "Rule",
    "InvokableRule",
    "ImplicitRule",
    "DataAwareRule",
    "ValidatorAwareRule",
];

const QUOTED: &str = r#"('(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*")"#;

static RETURN_STRING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"return\s+{}\s*;", QUOTED)).expect("valid return string regex")
});

static FAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\$fail\s*\(\s*{}", QUOTED)).expect("valid fail regex")
});

/// Authorization policies, by naming rule
#[derive(Debug, Default, Clone, Copy)]
pub struct PolicyStrategy;

impl KindStrategy for PolicyStrategy {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Policy
    }

    fn qualifies(&self, class: &PhpClass, ctx: &ScanContext<'_>) -> bool {
        class.is_concrete() && ctx.config.heuristics.policy.matches(&class.name, method_names(class))
    }

    fn extract(&self, class: &PhpClass, _source: &str, ctx: &ScanContext<'_>) -> Result<Metadata> {
        let model = ctx
            .providers
            .model_for_policy(&class.fq_name())
            .or_else(|| conventional_model(class, "Policy", &ctx.config.scan.models_namespace));

        Ok(Metadata::Policy(PolicyMeta {
            model,
            abilities: class
                .public_methods()
                .filter(|m| m.name != "before" && m.name != "after")
                .map(|m| m.name.clone())
                .collect(),
            has_before: class.has_method("before"),
        }))
    }
}

/// Validation rule objects, by naming rule
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleStrategy;

impl KindStrategy for RuleStrategy {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Rule
    }

    fn qualifies(&self, class: &PhpClass, ctx: &ScanContext<'_>) -> bool {
        class.is_concrete() && ctx.config.heuristics.rule.matches(&class.name, method_names(class))
    }

    fn extract(&self, class: &PhpClass, _source: &str, ctx: &ScanContext<'_>) -> Result<Metadata> {
        let contract = ctx
            .index
            .all_interfaces(class)
            .into_iter()
            .find(|i| RULE_CONTRACTS.contains(&short_name(i)));

        // message() for classic rules, $fail(...) for closures
        let message = class
            .method("message")
            .and_then(|m| RETURN_STRING_RE.captures(m.body_text()))
            .and_then(|cap| unquote(&cap[1]))
            .or_else(|| {
                ["validate", "__invoke"]
                    .iter()
                    .filter_map(|name| class.method(name))
                    .find_map(|m| FAIL_RE.captures(m.body_text()).and_then(|cap| unquote(&cap[1])))
            });

        Ok(Metadata::Rule(RuleMeta {
            contract,
            invokable: class.has_method("__invoke"),
            message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::kinds::testing::{find, App};

    #[test]
    fn test_policy_metadata() {
        let app = App::new()
            .file(
                "app/Policies/OrderPolicy.php",
                r#"<?php
namespace App\Policies;

use App\Models\Order;
use App\Models\User;

class OrderPolicy
{
    public function before(User $user, string $ability): ?bool { return null; }
    public function view(User $user, Order $order): bool { return true; }
    public function update(User $user, Order $order): bool { return $user->id === $order->user_id; }
}
"#,
            )
            .file(
                "app/Policies/TeamPolicy.php",
                "<?php\nnamespace App\\Policies;\nclass TeamPolicy { public function view($user, $team) { return true; } }\n",
            )
            .file(
                "app/Policies/PolicyRegistry.php",
                "<?php\nnamespace App\\Policies;\nclass PolicyRegistry { public function view() {} }\n",
            )
            .file(
                "app/Providers/AuthServiceProvider.php",
                r#"<?php
namespace App\Providers;

use App\Models\Organization;
use App\Policies\TeamPolicy;

class AuthServiceProvider
{
    protected $policies = [
        Organization::class => TeamPolicy::class,
    ];
}
"#,
            );

        let result = app.scan(PolicyStrategy);
        assert_eq!(result.count, 2);
        match &find(&result, "OrderPolicy").metadata {
            Metadata::Policy(meta) => {
                assert_eq!(meta.model.as_deref(), Some("App\\Models\\Order"));
                assert_eq!(meta.abilities, vec!["view", "update"]);
                assert!(meta.has_before);
            }
            other => panic!("unexpected metadata {:?}", other),
        }
        match &find(&result, "TeamPolicy").metadata {
            Metadata::Policy(meta) => {
                assert_eq!(meta.model.as_deref(), Some("App\\Models\\Organization"));
                assert!(!meta.has_before);
            }
            other => panic!("unexpected metadata {:?}", other),
        }
    }

    #[test]
    fn test_rule_metadata() {
        let app = App::new()
            .file(
                "app/Rules/Uppercase.php",
                r#"<?php
namespace App\Rules;

use Closure;
use Illuminate\Contracts\Validation\ValidationRule;

class Uppercase implements ValidationRule
{
    public function validate(string $attribute, mixed $value, Closure $fail): void
    {
        if (strtoupper($value) !== $value) {
            $fail('The :attribute must be uppercase.');
        }
    }
}
"#,
            )
            .file(
                "app/Rules/LegacyRule.php",
                r#"<?php
namespace App\Rules;

use Illuminate\Contracts\Validation\Rule;

class LegacyRule implements Rule
{
    public function passes($attribute, $value) { return true; }
    public function message() { return "Legacy check failed."; }
}
"#,
            )
            .file(
                "app/Rules/Support/Formatter.php",
                "<?php\nnamespace App\\Rules\\Support;\nclass Formatter { public function format() {} }\n",
            );

        let result = app.scan(RuleStrategy);
        assert_eq!(result.count, 2);
        match &find(&result, "Uppercase").metadata {
            Metadata::Rule(meta) => {
                assert_eq!(
                    meta.contract.as_deref(),
                    Some("Illuminate\\Contracts\\Validation\\ValidationRule")
                );
                assert!(!meta.invokable);
                assert_eq!(meta.message.as_deref(), Some("The :attribute must be uppercase."));
            }
            other => panic!("unexpected metadata {:?}", other),
        }
        match &find(&result, "LegacyRule").metadata {
            Metadata::Rule(meta) => {
                assert_eq!(meta.message.as_deref(), Some("Legacy check failed."));
            }
            other => panic!("unexpected metadata {:?}", other),
        }
    }
}
