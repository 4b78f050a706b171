//! Benchmarks for the scene cache

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use interact_state::SceneCache;
use interact_test::button_scene;
use interact_wire::{ParticipantRecord, SceneRecord};
use serde_json::json;

fn scenes(count: usize, controls: usize) -> Vec<SceneRecord> {
    (0..count)
        .map(|s| {
            let ids: Vec<String> = (0..controls).map(|c| format!("s{s}-c{c}")).collect();
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            serde_json::from_value(button_scene(&format!("scene-{s}"), &ids)).unwrap()
        })
        .collect()
}

fn participant(i: usize) -> ParticipantRecord {
    serde_json::from_value(json!({"sessionID": format!("p{i}"), "username": format!("user{i}")})).unwrap()
}

fn bench_replace_scenes(c: &mut Criterion) {
    let records = scenes(8, 32);
    c.bench_function("replace_scenes_8x32", |b| {
        b.iter_batched(
            || (SceneCache::new(), records.clone()),
            |(mut cache, records)| {
                cache.replace_scenes(records);
                cache
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_control_lookup(c: &mut Criterion) {
    let mut cache = SceneCache::new();
    cache.replace_scenes(scenes(8, 32));

    c.bench_function("control_lookup", |b| {
        b.iter(|| cache.control(black_box("s5-c17")).unwrap().kind.len())
    });
}

fn bench_participant_churn(c: &mut Criterion) {
    let records: Vec<ParticipantRecord> = (0..256).map(participant).collect();

    c.bench_function("participant_join_leave_256", |b| {
        b.iter_batched(
            || (SceneCache::new(), records.clone()),
            |(mut cache, records)| {
                for record in records {
                    let id = record.id.clone();
                    cache.participant_join(record);
                    black_box(cache.participant_leave(&id));
                }
                cache
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_replace_scenes, bench_control_lookup, bench_participant_churn);
criterion_main!(benches);
