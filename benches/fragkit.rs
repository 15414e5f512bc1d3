//! FragKit fragment parsing benchmarks
//!
//! Run with: cargo bench -p fragkit-bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fragkit_bench::{generate_fragment, generate_malformed};
use fragkit_dom::{Document, DocumentFragment, SaveOptions};
use fragkit_html::tokenizer;

fn fragment_parsing_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("fragment_parsing");

    for (label, size) in [("small", 10), ("medium", 100), ("large", 1000)] {
        let html = generate_fragment(size);
        group.throughput(Throughput::Bytes(html.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", label), &html, |b, html| {
            b.iter(|| DocumentFragment::parse(html, None, None))
        });
    }

    let malformed = generate_malformed(100);
    group.throughput(Throughput::Bytes(malformed.len() as u64));
    group.bench_with_input(BenchmarkId::new("recover", "malformed"), &malformed, |b, html| {
        b.iter(|| DocumentFragment::parse(html, None, None))
    });

    group.finish();
}

fn context_parsing_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("context_parsing");
    let document = match Document::parse_html("<html><body><div id='ctx'></div></body></html>") {
        Ok(document) => document,
        Err(_) => return,
    };
    let Some(context) = document.get_element_by_id("ctx") else {
        return;
    };

    let html = generate_fragment(100);
    group.throughput(Throughput::Bytes(html.len() as u64));
    group.bench_with_input(BenchmarkId::new("parse", "div"), &html, |b, html| {
        b.iter(|| DocumentFragment::new(&document, html, Some(&context), None))
    });

    group.finish();
}

fn tokenizer_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenizer");

    let html = generate_fragment(1000);
    group.throughput(Throughput::Bytes(html.len() as u64));
    group.bench_with_input(BenchmarkId::new("tokenize", "large"), &html, |b, html| {
        b.iter(|| tokenizer::tokenize(html))
    });

    group.finish();
}

fn serialization_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    let html = generate_fragment(1000);
    let Ok(fragment) = DocumentFragment::parse(&html, None, None) else {
        return;
    };
    group.throughput(Throughput::Bytes(html.len() as u64));
    for (label, options) in [
        ("html", SaveOptions::html()),
        ("xhtml", SaveOptions::xhtml()),
        ("xml", SaveOptions::xml()),
        ("latin1", SaveOptions::html().with_encoding("ISO-8859-1")),
    ] {
        group.bench_with_input(BenchmarkId::new("serialize", label), &options, |b, options| {
            b.iter(|| fragment.serialize(options))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    fragment_parsing_benchmarks,
    context_parsing_benchmarks,
    tokenizer_benchmarks,
    serialization_benchmarks,
);
criterion_main!(benches);
