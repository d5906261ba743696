//! Benchmarks for output validation.

use cdsflow::core::ModuleDescriptor;
use cdsflow::process::ProcessOutput;
use cdsflow::stages::StageOutcome;
use cdsflow::validation::{archive_content_expectations, OutputValidator};
use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fmt::Write;

fn listing(classes: usize) -> String {
    let mut out = String::from("Base archive is valid\nDynamic archive is valid\n");
    for i in 0..classes {
        let _ = writeln!(out, "{i:>6}: java.lang.Generated{i} boot_loader");
    }
    out.push_str("     0: mypackage.Main app_loader\n");
    out.push_str("     1: mypackage.Another unregistered_loader\n");
    out
}

fn validator_benchmark(c: &mut Criterion) {
    let module = ModuleDescriptor::new("mymodule", "mypackage.Main", "mymodule.jar")
        .with_class("mypackage.Another");
    let expectations = archive_content_expectations(&module);
    let validator = OutputValidator::new();
    let outcome = StageOutcome::from_output(
        "validate-dynamic",
        ProcessOutput::success(listing(5_000)),
        Utc::now(),
        0,
    );

    c.bench_function("validate_archive_listing", |b| {
        b.iter(|| validator.validate(black_box(&outcome), black_box(&expectations)))
    });
}

criterion_group!(benches, validator_benchmark);
criterion_main!(benches);
