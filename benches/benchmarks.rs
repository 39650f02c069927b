use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::PathBuf;

use serde_json::{json, Value};

use pe::assertion::{check_all, Assertion};
use pe::template::{Template, Variables};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn sample_variables() -> Variables {
    let mut vars = Variables::new();
    vars.insert("name".to_string(), Value::String("Ada".to_string()));
    vars.insert("team".to_string(), Value::String("Core".to_string()));
    vars.insert("vip".to_string(), Value::String("yes".to_string()));
    vars.insert("country".to_string(), Value::String("France".to_string()));
    vars
}

fn bench_inline_render(c: &mut Criterion) {
    let vars = sample_variables();
    let source = "Hello {{name}} from {{country}}! \\{{literal}} \
                  #if vip == \"yes\" then VIP #else regular #endif";

    c.bench_function("render_inline", |b| {
        b.iter(|| {
            let out = Template::new(black_box(source), &vars).process().unwrap();
            black_box(out)
        });
    });
}

fn bench_render_with_includes(c: &mut Criterion) {
    let vars = sample_variables();
    let dir = fixture_path("templates");
    let source = std::fs::read_to_string(dir.join("greeting.txt")).unwrap();

    c.bench_function("render_with_includes", |b| {
        b.iter(|| {
            let out = Template::new(source.as_str(), &vars)
                .with_base_dir(&dir)
                .process()
                .unwrap();
            black_box(out)
        });
    });
}

fn bench_nested_conditionals(c: &mut Criterion) {
    let vars = sample_variables();
    let mut source = String::new();
    for _ in 0..8 {
        source.push_str("#if vip then [{{name}} ");
    }
    for _ in 0..8 {
        source.push_str("] #endif");
    }

    c.bench_function("render_nested_conditionals", |b| {
        b.iter(|| {
            let out = Template::new(black_box(source.as_str()), &vars)
                .process()
                .unwrap();
            black_box(out)
        });
    });
}

fn bench_assertions(c: &mut Criterion) {
    let output = r#"{"country": "France", "capital": "Paris"}"#;
    let assertions = vec![
        Assertion::new("contains", "Paris"),
        Assertion::new("regex", r#""capital":\s*"\w+""#),
        Assertion::new("length", ">10,<200"),
        Assertion::new("json", json!({"type": "object", "required": ["capital"]})),
    ];

    c.bench_function("check_assertions", |b| {
        b.iter(|| {
            let results = check_all(black_box(output), &assertions);
            black_box(results)
        });
    });
}

criterion_group!(
    benches,
    bench_inline_render,
    bench_render_with_includes,
    bench_nested_conditionals,
    bench_assertions,
);
criterion_main!(benches);
