//! Benchmarks for template rendering and keyed list reconciliation.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use filament_core::{each, html, LiveValue, Node, RenderResult, Signal, SourceExt};

fn row(item: LiveValue<(usize, String)>) -> RenderResult {
    html!("<li>", item.map(|(_, label): &(usize, String)| label.clone()), "</li>")
}

fn items(n: usize, tag: &str) -> Vec<(usize, String)> {
    (0..n).map(|i| (i, format!("{tag} {i}"))).collect()
}

/// Benchmark rendering a cached template with a few bindings
fn bench_render(c: &mut Criterion) {
    let title = Signal::new("title".to_string());
    c.bench_function("render_cached_template", |b| {
        b.iter(|| {
            let view = html!("<section title=", title.clone(), "><h1>", title.clone(), "</h1></section>");
            view.unmount();
        });
    });
}

/// Benchmark updating every row's value under stable keys
fn bench_update_in_place(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_update_in_place");

    for n in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let source = Signal::new(items(n, "a"));
            let view = html!("<ul>", each(source.clone(), |(id, _): &(usize, String)| *id, row), "</ul>");
            view.mount(&Node::element("main"));
            let (first, second) = (items(n, "a"), items(n, "b"));
            let mut flip = false;

            b.iter(|| {
                flip = !flip;
                source.set(if flip { second.clone() } else { first.clone() });
            });
            view.unmount();
        });
    }

    group.finish();
}

/// Benchmark reversing the list (every row moves)
fn bench_reverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_reverse");

    for n in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let source = Signal::new(items(n, "row"));
            let view = html!("<ul>", each(source.clone(), |(id, _): &(usize, String)| *id, row), "</ul>");
            view.mount(&Node::element("main"));
            let forward = items(n, "row");
            let mut backward = forward.clone();
            backward.reverse();
            let mut flip = false;

            b.iter(|| {
                flip = !flip;
                source.set(if flip { backward.clone() } else { forward.clone() });
            });
            view.unmount();
        });
    }

    group.finish();
}

/// Benchmark replacing every key (full teardown and rebuild)
fn bench_replace_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_replace_all");

    for n in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let source = Signal::new(items(n, "row"));
            let view = html!("<ul>", each(source.clone(), |(id, _): &(usize, String)| *id, row), "</ul>");
            view.mount(&Node::element("main"));
            let shifted: Vec<_> = (n..2 * n).map(|i| (i, format!("row {i}"))).collect();
            let original = items(n, "row");
            let mut flip = false;

            b.iter(|| {
                flip = !flip;
                source.set(if flip { shifted.clone() } else { original.clone() });
            });
            view.unmount();
        });
    }

    group.finish();
}

criterion_group!(benches, bench_render, bench_update_in_place, bench_reverse, bench_replace_all);
criterion_main!(benches);
