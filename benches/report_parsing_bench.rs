//! Parsing throughput: validation and extraction per inbound report.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tilewatch::report::{extract_color_counts, extract_location, is_valid_report};

const SUMMARY_REPORT: &str =
    "You climbed to the highest point in the RG 12#3 Total: 5 👥 🇲🇴: 3 🇻🇦: 2";

const PARTICIPANT_REPORT: &str = "You looked to the [GY 2#1]\n\
    👥Team: 4\n\
    🇲🇴Alpha 🏅3 👣12\n\
    🇲🇴Bravo 🏅1 👣9\n\
    🇻🇦Charlie 🏅0 👣4\n\
    🇪🇺Delta 🏅2 👣7";

fn bench_report_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_parsing");
    group.throughput(Throughput::Elements(1));

    group.bench_function("validate_summary_report", |b| {
        b.iter(|| black_box(is_valid_report(black_box(SUMMARY_REPORT))))
    });
    group.bench_function("validate_chatter", |b| {
        b.iter(|| black_box(is_valid_report(black_box("anyone seen Y41 lately?"))))
    });
    group.bench_function("extract_summary_report", |b| {
        b.iter(|| {
            let message = black_box(SUMMARY_REPORT);
            black_box((extract_location(message), extract_color_counts(message)))
        })
    });
    // no summary line, so counts come from the occurrence fallback
    group.bench_function("extract_participant_report", |b| {
        b.iter(|| {
            let message = black_box(PARTICIPANT_REPORT);
            black_box((extract_location(message), extract_color_counts(message)))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_report_parsing);
criterion_main!(benches);
