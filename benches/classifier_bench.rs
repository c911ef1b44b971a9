//! Domain classification benchmarks.
//!
//! Every proxied request runs one classification, so lookups against a
//! list the size of GFWList must stay cheap.

use std::collections::HashSet;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use smart_proxy::classify::{parse_list, DomainClassifier};
use smart_proxy::{InterfaceNames, Router};

const LIST_SIZE: usize = 6000;

fn large_list() -> String {
    let mut text = String::from("[AutoProxy 0.2.9]\n! Benchmark list\n");
    for i in 0..LIST_SIZE {
        match i % 4 {
            0 => text.push_str(&format!("||site{}.com\n", i)),
            1 => text.push_str(&format!(".cdn{}.net\n", i)),
            2 => text.push_str(&format!("|http://host{}.org/path\n", i)),
            _ => text.push_str(&format!("@@||allowed{}.io\n", i)),
        }
    }
    text
}

fn classifier() -> DomainClassifier {
    let classifier = DomainClassifier::new();
    classifier.replace_blocklist(parse_list(&large_list()));
    classifier.set_domain_lists(["corp.example"], ["extra.example"]);
    classifier
}

fn bench_parse_list(c: &mut Criterion) {
    let text = large_list();

    let mut group = c.benchmark_group("parse_list");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("gfwlist_6000_rules", |b| {
        b.iter(|| black_box(parse_list(black_box(&text))))
    });
    group.finish();
}

fn bench_is_blocklisted(c: &mut Criterion) {
    let classifier = classifier();
    let hosts = [
        ("exact", "site0.com"),
        ("subdomain", "a.b.c.cdn1.net"),
        ("miss", "www.unlisted.example.org"),
        ("extra", "api.extra.example"),
    ];

    let mut group = c.benchmark_group("is_blocklisted");
    for (name, host) in hosts {
        group.bench_with_input(BenchmarkId::from_parameter(name), host, |b, host| {
            b.iter(|| black_box(classifier.is_blocklisted(host)))
        });
    }
    group.finish();
}

fn bench_route(c: &mut Criterion) {
    let router = Router::new(
        Arc::new(classifier()),
        InterfaceNames {
            default: "en0".into(),
            blocklist: "utun4".into(),
            company: "utun7".into(),
        },
    );

    c.bench_function("route_mixed", |b| {
        b.iter(|| {
            black_box(router.route("192.168.1.1"));
            black_box(router.route("git.corp.example"));
            black_box(router.route("www.site4.com"));
            black_box(router.route("www.unlisted.example.org"));
        })
    });
}

fn bench_replace_blocklist(c: &mut Criterion) {
    let classifier = DomainClassifier::new();
    let domains: HashSet<String> = parse_list(&large_list());

    c.bench_function("replace_blocklist", |b| {
        b.iter(|| black_box(classifier.replace_blocklist(domains.clone())))
    });
}

criterion_group!(
    benches,
    bench_parse_list,
    bench_is_blocklisted,
    bench_route,
    bench_replace_blocklist,
);
criterion_main!(benches);
