use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use stravalink::services::strava::RemoteActivity;
use stravalink::services::sync::normalize;

fn page(size: u64) -> Vec<RemoteActivity> {
    (0..size)
        .map(|id| RemoteActivity {
            id: 10_000_000 + id,
            name: Some(format!("Activity {}", id)),
            activity_type: Some("Ride".to_string()),
            sport_type: Some("Ride".to_string()),
            start_date: Some("2026-03-01T07:30:00Z".to_string()),
            distance: Some(12_345.6 + id as f64),
            moving_time: Some(3_600),
            average_speed: Some(6.17),
        })
        .collect()
}

fn benchmark_normalize(c: &mut Criterion) {
    // Strava's largest page
    let full_page = page(200);

    // Same page as it arrives over the wire
    let wire = serde_json::to_string(&full_page).expect("Failed to serialize page");

    let mut group = c.benchmark_group("normalize_activities");

    group.bench_function("normalize_page_200", |b| {
        b.iter(|| {
            black_box(&full_page)
                .iter()
                .map(normalize)
                .collect::<Vec<_>>()
        })
    });

    group.bench_function("parse_and_normalize_page_200", |b| {
        b.iter(|| {
            let parsed: Vec<RemoteActivity> =
                serde_json::from_str(black_box(&wire)).expect("Failed to parse page");
            parsed.iter().map(normalize).collect::<Vec<_>>()
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_normalize);
criterion_main!(benches);
