//! Benchmarks for interaction lookup

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http::{HeaderMap, StatusCode};
use tempfile::TempDir;

use rewind::cassette::Cassette;
use rewind::hooks::Hooks;
use rewind::matchers::MatcherRegistry;
use rewind::serializers::SerializerRegistry;
use rewind::{CassetteOptions, OptionOverrides, RecordMode, Request, Response, Result};

fn echo(request: &Request) -> Result<Response> {
    Ok(Response::new(
        StatusCode::OK,
        request.url.clone(),
        HeaderMap::new(),
        "{\"ok\":true}",
    ))
}

fn request(index: usize) -> Request {
    Request::get(format!("https://api.example.com/items/{index}?page={index}&sort=asc"))
        .with_header("accept", "application/json")
        .unwrap()
}

/// A cassette holding `size` interactions, replayable without limit
fn populated_cassette(dir: &TempDir, size: usize, matchers: &[&str]) -> Cassette {
    let overrides = OptionOverrides::default()
        .record_mode(RecordMode::NewEpisodes)
        .allow_playback_repeats(true)
        .match_requests_on(matchers.iter().copied());

    let mut cassette = Cassette::load(
        "bench",
        dir.path(),
        CassetteOptions::default().merged(&overrides),
        &MatcherRegistry::default(),
        &SerializerRegistry::default(),
        Hooks::new(),
    )
    .unwrap();

    let mut transport = echo;
    for index in 0..size {
        cassette.play(&request(index), &mut transport).unwrap();
    }
    cassette
}

fn bench_find_last(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_last_match");

    for size in [10, 100, 1000] {
        let temp_dir = TempDir::new().unwrap();
        let mut cassette = populated_cassette(&temp_dir, size, &["method", "uri"]);
        let last = request(size - 1);

        group.bench_with_input(BenchmarkId::from_parameter(size), &last, |b, last| {
            b.iter(|| {
                black_box(cassette.find_match(black_box(last)).is_some());
            });
        });
    }

    group.finish();
}

fn bench_matcher_sets(c: &mut Criterion) {
    let mut group = c.benchmark_group("matcher_sets");
    let sets: [&[&str]; 3] = [
        &["method", "path"],
        &["method", "uri"],
        &["method", "uri", "headers", "body"],
    ];

    for matchers in sets {
        let temp_dir = TempDir::new().unwrap();
        let mut cassette = populated_cassette(&temp_dir, 100, matchers);
        let last = request(99);

        group.bench_function(matchers.join("+"), |b| {
            b.iter(|| {
                black_box(cassette.find_match(black_box(&last)).is_some());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_find_last, bench_matcher_sets);
criterion_main!(benches);
