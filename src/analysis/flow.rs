// Flow analyzer
//
// Detects cross-component calls by matching idiomatic call shapes in
// source text: job dispatches, fired events, sent notifications, rendered
// views, redirects and class dependencies. Results are heuristic; nothing
// here fails on unusual input, unmatched text simply contributes nothing.

use crate::analysis::component::Confidence;
use crate::config::FlowConfig;
use crate::parser::lexer::strip_comments;
use crate::parser::{parse_imports, resolve_import, short_name, UseImport};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const NAME: &str = r"\\?[A-Za-z_][\w\\]*";

/// Left edge of a static access: not a variable, a longer name or `->`
const STATIC_EDGE: &str = r"(?:^|[^$\w\\>]|=>)";

static DISPATCH_CLASS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\bdispatch(Now|Sync)?\s*\(\s*({})::class", NAME))
        .expect("valid dispatch regex")
});

static DISPATCH_NEW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\bdispatch(Now|Sync)?\s*\(\s*new\s+({})", NAME))
        .expect("valid dispatch regex")
});

static STATIC_DISPATCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?m){}({})::dispatch(Now|Sync|If|Unless)?\s*\(", STATIC_EDGE, NAME))
        .expect("valid static dispatch regex")
});

static EVENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\bevent\s*\(\s*(?:new\s+({0})|({0})::class)",
        NAME
    ))
    .expect("valid event regex")
});

static NOTIFY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"->notify(?:Now)?\s*\(\s*new\s+({})", NAME)).expect("valid notify regex")
});

static NOTIFICATION_SEND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"Notification::send(?:Now)?\s*\([^;]*?new\s+({})",
        NAME
    ))
    .expect("valid notification regex")
});

static NEW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\bnew\s+({})", NAME)).expect("valid new regex"));

static STATIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?m){}({})::", STATIC_EDGE, NAME)).expect("valid static access regex"));

static VIEW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:\bview|View::make)\s*\(\s*['"]([^'"]+)['"]"#).expect("valid view regex")
});

static REDIRECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:redirect\s*\(\s*\)\s*->\s*route|\bto_route|Redirect::route)\s*\(\s*['"]([^'"]+)['"]|\bredirect\s*\(\s*['"]([^'"]+)['"]"#,
    )
    .expect("valid redirect regex")
});

/// Kind of detected collaboration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    DispatchesJob,
    FiresEvent,
    SendsNotification,
    DependsOn,
    UsesFacade,
    RendersView,
    RedirectsTo,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::DispatchesJob => "dispatches-job",
            RelationKind::FiresEvent => "fires-event",
            RelationKind::SendsNotification => "sends-notification",
            RelationKind::DependsOn => "depends-on",
            RelationKind::UsesFacade => "uses-facade",
            RelationKind::RendersView => "renders-view",
            RelationKind::RedirectsTo => "redirects-to",
        }
    }
}

/// One directed collaboration between a component and a target name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub source: String,
    /// Detected identifier, not guaranteed to name a real class
    pub target: String,
    pub relation: RelationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_async: Option<bool>,
}

/// A dispatched job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDispatch {
    pub job: String,
    pub is_async: bool,
}

/// A facade call with its configured category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacadeUse {
    pub name: String,
    pub category: String,
}

/// Referenced classes, bucketed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    pub models: Vec<String>,
    pub services: Vec<String>,
    pub facades: Vec<FacadeUse>,
    pub other: Vec<String>,
}

impl Dependencies {
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
            && self.services.is_empty()
            && self.facades.is_empty()
            && self.other.is_empty()
    }

    /// Every class name across buckets (facades by short name)
    pub fn names(&self) -> Vec<String> {
        self.models
            .iter()
            .chain(&self.services)
            .cloned()
            .chain(self.facades.iter().map(|f| f.name.clone()))
            .chain(self.other.iter().cloned())
            .collect()
    }
}

/// Everything detected in one piece of source text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowReport {
    pub jobs: Vec<JobDispatch>,
    pub events: Vec<String>,
    pub notifications: Vec<String>,
    pub dependencies: Dependencies,
    pub views: Vec<String>,
    pub redirects: Vec<String>,
    pub confidence: Confidence,
}

impl FlowReport {
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
            && self.events.is_empty()
            && self.notifications.is_empty()
            && self.dependencies.is_empty()
            && self.views.is_empty()
            && self.redirects.is_empty()
    }

    pub fn job_names(&self) -> Vec<String> {
        self.jobs.iter().map(|j| j.job.clone()).collect()
    }

    /// Flatten into edges leaving `source`
    pub fn edges(&self, source: &str) -> Vec<FlowEdge> {
        let edge = |target: &str, relation: RelationKind, is_async: Option<bool>| FlowEdge {
            source: source.to_string(),
            target: target.to_string(),
            relation,
            is_async,
        };

        let mut edges = Vec::new();
        for job in &self.jobs {
            edges.push(edge(&job.job, RelationKind::DispatchesJob, Some(job.is_async)));
        }
        for event in &self.events {
            edges.push(edge(event, RelationKind::FiresEvent, None));
        }
        for notification in &self.notifications {
            edges.push(edge(notification, RelationKind::SendsNotification, None));
        }
        let deps = &self.dependencies;
        for name in deps.models.iter().chain(&deps.services).chain(&deps.other) {
            edges.push(edge(name, RelationKind::DependsOn, None));
        }
        for facade in &deps.facades {
            edges.push(edge(&facade.name, RelationKind::UsesFacade, None));
        }
        for view in &self.views {
            edges.push(edge(view, RelationKind::RendersView, None));
        }
        for target in &self.redirects {
            edges.push(edge(target, RelationKind::RedirectsTo, None));
        }
        edges
    }
}

/// Pattern-based collaboration detector
#[derive(Debug, Clone)]
pub struct FlowAnalyzer {
    config: FlowConfig,
}

impl FlowAnalyzer {
    pub fn new(config: FlowConfig) -> Self {
        Self { config }
    }

    /// Analyze a whole file, resolving names through its own imports
    pub fn analyze(&self, source: &str) -> FlowReport {
        let imports = parse_imports(source);
        self.analyze_with_imports(source, &imports)
    }

    /// Analyze a fragment (e.g. one method body) with the imports of its file
    pub fn analyze_with_imports(&self, text: &str, imports: &[UseImport]) -> FlowReport {
        let text = strip_comments(text);
        let resolve = |raw: &str| resolve_name(raw, imports);
        let mut report = FlowReport::default();

        for cap in DISPATCH_CLASS_RE.captures_iter(&text) {
            push_job(&mut report.jobs, resolve(&cap[2]), cap.get(1).is_none());
        }
        for cap in DISPATCH_NEW_RE.captures_iter(&text) {
            push_job(&mut report.jobs, resolve(&cap[2]), cap.get(1).is_none());
        }

        for cap in EVENT_RE.captures_iter(&text) {
            if let Some(name) = cap.get(1).or_else(|| cap.get(2)) {
                push_unique(&mut report.events, resolve(name.as_str()));
            }
        }

        for cap in STATIC_DISPATCH_RE.captures_iter(&text) {
            let raw = &cap[1];
            if self.is_facade(raw) || self.is_ignored(raw) {
                continue;
            }
            let name = resolve(raw);
            if name.contains("\\Events\\") {
                push_unique(&mut report.events, name);
            } else {
                let sync = matches!(cap.get(2).map(|m| m.as_str()), Some("Now") | Some("Sync"));
                push_job(&mut report.jobs, name, !sync);
            }
        }

        for cap in NOTIFY_RE
            .captures_iter(&text)
            .chain(NOTIFICATION_SEND_RE.captures_iter(&text))
        {
            push_unique(&mut report.notifications, resolve(&cap[1]));
        }

        for cap in VIEW_RE.captures_iter(&text) {
            push_unique(&mut report.views, cap[1].to_string());
        }
        for cap in REDIRECT_RE.captures_iter(&text) {
            if let Some(target) = cap.get(1).or_else(|| cap.get(2)) {
                push_unique(&mut report.redirects, target.as_str().to_string());
            }
        }

        let mut seen = Vec::new();
        for cap in NEW_RE.captures_iter(&text).chain(STATIC_RE.captures_iter(&text)) {
            let raw = cap[1].to_string();
            if self.is_ignored(&raw) || seen.contains(&raw) {
                continue;
            }
            seen.push(raw);
        }
        for raw in seen {
            self.bucket(&mut report.dependencies, &raw, resolve(&raw));
        }

        report
    }

    fn bucket(&self, deps: &mut Dependencies, raw: &str, resolved: String) {
        let short = short_name(raw.trim_start_matches('\\'));
        if let Some(category) = self.config.facades.get(short) {
            if !deps.facades.iter().any(|f| f.name == short) {
                deps.facades.push(FacadeUse {
                    name: short.to_string(),
                    category: category.clone(),
                });
            }
            return;
        }

        let bucket = if self
            .config
            .model_markers
            .iter()
            .any(|m| resolved.contains(m.as_str()))
        {
            &mut deps.models
        } else if self
            .config
            .service_markers
            .iter()
            .any(|m| resolved.contains(m.as_str()))
        {
            &mut deps.services
        } else {
            &mut deps.other
        };
        push_unique(bucket, resolved);
    }

    fn is_facade(&self, raw: &str) -> bool {
        self.config
            .facades
            .contains_key(short_name(raw.trim_start_matches('\\')))
    }

    fn is_ignored(&self, raw: &str) -> bool {
        self.config
            .ignored
            .iter()
            .any(|name| name.eq_ignore_ascii_case(raw))
    }
}

impl Default for FlowAnalyzer {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

/// Resolve through imports when possible, otherwise keep the name as written
fn resolve_name(raw: &str, imports: &[UseImport]) -> String {
    resolve_import(raw, imports).unwrap_or_else(|| raw.to_string())
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// A job seen both ways is reported once, async if any dispatch was async
fn push_job(jobs: &mut Vec<JobDispatch>, job: String, is_async: bool) {
    match jobs.iter_mut().find(|j| j.job == job) {
        Some(existing) => existing.is_async |= is_async,
        None => jobs.push(JobDispatch { job, is_async }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(source: &str) -> FlowReport {
        FlowAnalyzer::default().analyze(source)
    }

    #[test]
    fn test_dispatch_class_is_async() {
        let report = analyze("dispatch(SomeJob::class);");
        assert_eq!(
            report.jobs,
            vec![JobDispatch {
                job: "SomeJob".to_string(),
                is_async: true
            }]
        );
    }

    #[test]
    fn test_dispatch_now_is_sync() {
        let report = analyze("dispatchNow(SomeJob::class);");
        assert_eq!(report.jobs.len(), 1);
        assert!(!report.jobs[0].is_async);

        let report = analyze("$this->dispatchSync(new ImportCsv($file));");
        assert_eq!(report.jobs[0].job, "ImportCsv");
        assert!(!report.jobs[0].is_async);
    }

    #[test]
    fn test_dispatch_new_resolves_import() {
        let report = analyze(
            "<?php\nuse App\\Jobs\\SendWelcomeEmail;\nclass X { function a() { dispatch(new SendWelcomeEmail($user)); } }",
        );
        assert_eq!(report.jobs[0].job, "App\\Jobs\\SendWelcomeEmail");
        assert!(report.jobs[0].is_async);
    }

    #[test]
    fn test_static_dispatch() {
        let report = analyze(
            "use App\\Jobs\\Reindex;\nuse App\\Events\\OrderShipped;\nReindex::dispatchSync($id);\nOrderShipped::dispatch($order);\nBus::dispatch($batch);",
        );
        assert_eq!(report.jobs.len(), 1);
        assert_eq!(report.jobs[0].job, "App\\Jobs\\Reindex");
        assert!(!report.jobs[0].is_async);
        assert_eq!(report.events, vec!["App\\Events\\OrderShipped"]);
    }

    #[test]
    fn test_event_both_shapes() {
        let report = analyze("event(SomeEvent::class); event(new OtherEvent($x)); event(SomeEvent::class);");
        assert_eq!(report.events, vec!["SomeEvent", "OtherEvent"]);
    }

    #[test]
    fn test_notifications() {
        let report = analyze(
            "$user->notify(new InvoicePaid($invoice));\nNotification::send($users, new InvoicePaid($invoice));\nNotification::send($admins, new Alert());",
        );
        assert_eq!(report.notifications, vec!["InvoicePaid", "Alert"]);
    }

    #[test]
    fn test_dependency_buckets() {
        let source = r#"<?php
use App\Models\Order;
use App\Services\PaymentGateway;
use Illuminate\Support\Facades\DB;
use Carbon\Carbon;

class Checkout {
    public function run() {
        $order = Order::find(1);
        $gateway = new PaymentGateway();
        DB::transaction(fn () => null);
        Log::info('x');
        $now = Carbon::now();
        self::helper();
        static::other();
        $model::query()->get();
        $this->repository::class;
    }
}
"#;
        let report = analyze(source);
        let deps = &report.dependencies;
        assert_eq!(deps.models, vec!["App\\Models\\Order"]);
        assert_eq!(deps.services, vec!["App\\Services\\PaymentGateway"]);
        let facades: Vec<&str> = deps.facades.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(facades, vec!["DB", "Log"]);
        assert_eq!(deps.facades[0].category, "database");
        assert_eq!(deps.other, vec!["Carbon\\Carbon"]);
    }

    #[test]
    fn test_variable_static_access_is_ignored() {
        let report = analyze("<?php\nfunction a($model, $job) { $job::dispatch(); return $model::query()->get(); }\n");
        assert!(report.jobs.is_empty());
        assert!(report.dependencies.other.is_empty());
        assert!(report.dependencies.models.is_empty());
    }

    #[test]
    fn test_views_and_redirects() {
        let report = analyze(
            "return view('orders.show', compact('order'));\nreturn redirect()->route('orders.index');\nreturn to_route('home');\nreturn redirect('/login');",
        );
        assert_eq!(report.views, vec!["orders.show"]);
        assert_eq!(report.redirects, vec!["orders.index", "home", "/login"]);
    }

    #[test]
    fn test_comments_ignored() {
        let report = analyze("// dispatch(Ghost::class);\n/* event(new Ghost) */");
        assert!(report.is_empty());
    }

    #[test]
    fn test_malformed_source_does_not_fail() {
        let report = analyze("dispatch(( new ::class event( ->notify(");
        assert!(report.jobs.is_empty());
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_edges() {
        let report = analyze("dispatch(new A); event(B::class); view('home');");
        let edges = report.edges("App\\Http\\Controllers\\HomeController");
        let relations: Vec<RelationKind> = edges.iter().map(|e| e.relation).collect();
        assert!(relations.contains(&RelationKind::DispatchesJob));
        assert!(relations.contains(&RelationKind::FiresEvent));
        assert!(relations.contains(&RelationKind::RendersView));
        assert_eq!(edges[0].is_async, Some(true));
        assert_eq!(
            serde_json::to_value(RelationKind::DispatchesJob).unwrap(),
            "dispatches-job"
        );
    }

    #[test]
    fn test_custom_facade_table() {
        let mut config = FlowConfig::default();
        config.facades.insert("Stripe".to_string(), "payments".to_string());
        let report = FlowAnalyzer::new(config).analyze("Stripe::charge(100);");
        assert_eq!(report.dependencies.facades[0].category, "payments");
    }
}
