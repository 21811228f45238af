use super::dependencies;
use crate::analysis::component::{ActionMeta, ComponentKind, Metadata, ServiceMeta};
use crate::analysis::discovery::{KindStrategy, ScanContext};
use crate::error::Result;
use crate::parser::PhpClass;

const ENTRY_POINTS: [&str; 4] = ["__invoke", "handle", "execute", "run"];

/// Service classes
#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceStrategy;

impl KindStrategy for ServiceStrategy {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Service
    }

    fn qualifies(&self, class: &PhpClass, _ctx: &ScanContext<'_>) -> bool {
        class.is_concrete()
    }

    fn extract(&self, class: &PhpClass, _source: &str, _ctx: &ScanContext<'_>) -> Result<Metadata> {
        Ok(Metadata::Service(ServiceMeta {
            methods: class.public_methods().map(|m| m.name.clone()).collect(),
            dependencies: dependencies(class),
        }))
    }

    fn analyzes_flow(&self) -> bool {
        true
    }
}

/// Single-purpose action classes
#[derive(Debug, Default, Clone, Copy)]
pub struct ActionStrategy;

impl KindStrategy for ActionStrategy {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Action
    }

    fn qualifies(&self, class: &PhpClass, _ctx: &ScanContext<'_>) -> bool {
        class.is_concrete() && entry_point(class).is_some()
    }

    fn extract(&self, class: &PhpClass, _source: &str, _ctx: &ScanContext<'_>) -> Result<Metadata> {
        Ok(Metadata::Action(ActionMeta {
            entry_point: entry_point(class),
            dependencies: dependencies(class),
        }))
    }

    fn analyzes_flow(&self) -> bool {
        true
    }
}

/// The conventional entry method, else the first public method
fn entry_point(class: &PhpClass) -> Option<String> {
    ENTRY_POINTS
        .iter()
        .find(|name| class.has_method(name))
        .map(|name| name.to_string())
        .or_else(|| class.public_methods().next().map(|m| m.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::kinds::testing::{find, App};

    #[test]
    fn test_service_metadata() {
        let app = App::new()
            .file(
                "app/Services/PaymentService.php",
                r#"<?php
namespace App\Services;

use App\Models\Payment;
use Illuminate\Support\Facades\DB;

class PaymentService
{
    public function __construct(private Gateway $gateway, private string $currency = 'EUR') {}

    public function charge(int $amount): Payment
    {
        return DB::transaction(fn () => Payment::create(['amount' => $amount]));
    }

    public function refund(Payment $payment): void {}

    private function log(): void {}
}
"#,
            )
            .file(
                "app/Services/Contracts/Gateway.php",
                "<?php\nnamespace App\\Services\\Contracts;\ninterface Gateway { public function pay(); }\n",
            );

        let result = app.scan(ServiceStrategy);
        assert_eq!(result.count, 1);
        let service = find(&result, "PaymentService");
        match &service.metadata {
            Metadata::Service(meta) => {
                assert_eq!(meta.methods, vec!["charge", "refund"]);
                assert_eq!(meta.dependencies, vec!["App\\Services\\Gateway"]);
            }
            other => panic!("unexpected metadata {:?}", other),
        }
        let flow = service.flow.as_ref().unwrap();
        assert_eq!(flow.dependencies.models, vec!["App\\Models\\Payment"]);
        assert!(flow.dependencies.facades.iter().any(|f| f.name == "DB" && f.category == "database"));
    }

    #[test]
    fn test_action_entry_points() {
        let app = App::new()
            .file(
                "app/Actions/CreateInvoice.php",
                "<?php\nnamespace App\\Actions;\nclass CreateInvoice { public function execute(array $data) {} public function helper() {} }\n",
            )
            .file(
                "app/Actions/PublishPost.php",
                "<?php\nnamespace App\\Actions;\nclass PublishPost { public function __invoke() {} }\n",
            )
            .file(
                "app/Actions/Empty.php",
                "<?php\nnamespace App\\Actions;\nclass NothingPublic { private function hidden() {} }\n",
            );

        let result = app.scan(ActionStrategy);
        assert_eq!(result.count, 2);
        match &find(&result, "CreateInvoice").metadata {
            Metadata::Action(meta) => assert_eq!(meta.entry_point.as_deref(), Some("execute")),
            other => panic!("unexpected metadata {:?}", other),
        }
        match &find(&result, "PublishPost").metadata {
            Metadata::Action(meta) => assert_eq!(meta.entry_point.as_deref(), Some("__invoke")),
            other => panic!("unexpected metadata {:?}", other),
        }
    }
}
