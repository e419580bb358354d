//! Prometheus metrics registry for meal distribution.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and hand it to
//! the [`MealDesk`](crate::distribution::MealDesk).
//!
//! The CLI prints the registry in Prometheus text exposition format when run
//! with `--metrics`.

use prometheus::{Counter, CounterVec, Opts, Registry};

use crate::eligibility::types::{MealType, ValidationCode};

/// All application-level Prometheus metrics.
pub struct AppMetrics {
    /// Eligibility evaluations, labelled by resulting code.
    pub evaluations_total: CounterVec,
    /// Meals handed out, labelled by meal type.
    pub meals_distributed_total: CounterVec,
    /// Distribution attempts refused, labelled by code.
    pub rejected_distributions_total: CounterVec,
    /// Successful attendance check-ins.
    pub check_ins_total: Counter,
    /// Audit entries appended.
    pub audit_entries_total: Counter,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

impl AppMetrics {
    /// Create and register all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let evaluations_total = CounterVec::new(
            Opts::new(
                "edutrak_evaluations_total",
                "Meal eligibility evaluations by validation code",
            ),
            &["code"],
        )?;

        let meals_distributed_total = CounterVec::new(
            Opts::new(
                "edutrak_meals_distributed_total",
                "Meals distributed by meal type",
            ),
            &["meal_type"],
        )?;

        let rejected_distributions_total = CounterVec::new(
            Opts::new(
                "edutrak_rejected_distributions_total",
                "Refused distribution attempts by validation code",
            ),
            &["code"],
        )?;

        let check_ins_total = Counter::with_opts(Opts::new(
            "edutrak_check_ins_total",
            "Attendance check-ins recorded",
        ))?;

        let audit_entries_total = Counter::with_opts(Opts::new(
            "edutrak_audit_entries_total",
            "Distribution audit entries appended",
        ))?;

        registry.register(Box::new(evaluations_total.clone()))?;
        registry.register(Box::new(meals_distributed_total.clone()))?;
        registry.register(Box::new(rejected_distributions_total.clone()))?;
        registry.register(Box::new(check_ins_total.clone()))?;
        registry.register(Box::new(audit_entries_total.clone()))?;

        Ok(Self {
            evaluations_total,
            meals_distributed_total,
            rejected_distributions_total,
            check_ins_total,
            audit_entries_total,
            registry,
        })
    }

    pub fn observe_evaluation(&self, code: ValidationCode) {
        self.evaluations_total
            .with_label_values(&[code.as_str()])
            .inc();
    }

    pub fn observe_distribution(&self, meal_type: MealType) {
        self.meals_distributed_total
            .with_label_values(&[meal_type.as_str()])
            .inc();
        self.audit_entries_total.inc();
    }

    pub fn observe_rejection(&self, code: ValidationCode) {
        self.rejected_distributions_total
            .with_label_values(&[code.as_str()])
            .inc();
    }

    /// Render all metrics as Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}
