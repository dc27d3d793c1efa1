use annotext_config::Settings;
use annotext_engine::{AnnotatedDocument, create_builder};
use criterion::{Criterion, criterion_group, criterion_main};
mod common;

fn bench_builders(c: &mut Criterion) {
    let mut group = c.benchmark_group("annotate");
    group.sample_size(10);

    let settings = Settings::default();
    let inputs = [
        ("latex", common::generate_latex_content(200)),
        ("markdown", common::generate_markdown_content(200)),
        ("restructuredtext", common::generate_rst_content(200)),
        ("html", common::generate_html_content(200)),
        ("rust", common::generate_rust_content(200)),
    ];

    for (code_language_id, content) in &inputs {
        let builder = create_builder(code_language_id, &settings);
        group.bench_function(*code_language_id, |b| {
            b.iter(|| {
                let text = builder.annotate(std::hint::black_box(content));
                std::hint::black_box(text)
            });
        });
    }

    group.finish();
}

fn bench_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("document");
    group.sample_size(10);

    let settings = Settings::default();
    let content = common::generate_latex_content(200);
    group.bench_function("latex_fragmentize_and_annotate", |b| {
        b.iter(|| {
            let document = AnnotatedDocument::new(std::hint::black_box(&content), "latex", &settings);
            std::hint::black_box(document)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_builders, bench_document);
criterion_main!(benches);
